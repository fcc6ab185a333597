#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;

pub const CHAT_PATH: &str = "/chat";
pub const DOCUMENT_ID_PARAM: &str = "docId";
pub const FILE_PARAM: &str = "file";

/// The document a conversation is bound to. `document_id` is the opaque
/// upstream identifier, and may be missing when a chat link was opened without
/// one, in which case no query can be sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentIdentity {
    document_id: Option<String>,
    display_name: String,
}

impl DocumentIdentity {
    pub fn new(document_id: &str, display_name: &str) -> DocumentIdentity {
        let mut identity = DocumentIdentity::unscoped(display_name);
        if !document_id.trim().is_empty() {
            identity.document_id = Some(document_id.to_string());
        }

        return identity;
    }

    pub fn unscoped(display_name: &str) -> DocumentIdentity {
        return DocumentIdentity {
            document_id: None,
            display_name: display_name.to_string(),
        };
    }

    pub fn document_id(&self) -> Option<&str> {
        return self.document_id.as_deref();
    }

    pub fn display_name(&self) -> &str {
        return &self.display_name;
    }

    pub fn is_scoped(&self) -> bool {
        return self.document_id.is_some();
    }

    /// Link to the chat view for this document, e.g.
    /// `/chat?docId=doc_abc123&file=Report%20%28final%29.pdf`.
    pub fn navigation_target(&self) -> String {
        let document_id = self.document_id.as_deref().unwrap_or_default();

        return format!(
            "{CHAT_PATH}?{DOCUMENT_ID_PARAM}={}&{FILE_PARAM}={}",
            urlencoding::encode(document_id),
            urlencoding::encode(&self.display_name)
        );
    }
}
