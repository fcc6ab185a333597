#[cfg(test)]
#[path = "identity_resolver_test.rs"]
mod tests;

use url::form_urlencoded;

use crate::domain::models::DocumentIdentity;
use crate::domain::models::DOCUMENT_ID_PARAM;
use crate::domain::models::FILE_PARAM;

pub struct IdentityResolver {}

impl IdentityResolver {
    /// Reads the document identity out of a chat link. Accepts a full URL, a
    /// path with a query string, or the bare query string. Never fails: a link
    /// without `docId` resolves to an unscoped identity.
    pub fn resolve(target: &str) -> DocumentIdentity {
        let query = match target.split_once('?') {
            Some((_, query)) => query,
            None => target,
        };
        let query = query.split('#').next().unwrap_or_default();

        let mut document_id = String::new();
        let mut display_name = String::new();
        for (key, value) in form_urlencoded::parse(query.trim().as_bytes()) {
            if key == DOCUMENT_ID_PARAM && document_id.is_empty() {
                document_id = value.to_string();
            } else if key == FILE_PARAM && display_name.is_empty() {
                display_name = value.to_string();
            }
        }

        return DocumentIdentity::new(&document_id, &display_name);
    }
}
