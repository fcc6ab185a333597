#[cfg(test)]
#[path = "upload_validator_test.rs"]
mod tests;

use crate::domain::models::UploadCandidate;
use crate::domain::models::UploadError;

pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: [&str; 5] = [
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/tiff",
    "image/bmp",
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineFamily {
    Safari,
    Other,
}

impl EngineFamily {
    /// Safari-family engines advertise `Safari` without a `Chrome` or
    /// `Android` token ahead of it. Chromium based browsers carry both.
    pub fn from_user_agent(user_agent: &str) -> EngineFamily {
        let lowered = user_agent.to_lowercase();
        if let Some(idx) = lowered.find("safari") {
            let prefix = &lowered[..idx];
            if !prefix.contains("chrome") && !prefix.contains("android") {
                return EngineFamily::Safari;
            }
        }

        return EngineFamily::Other;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SelectionGesture {
    FilePicker,
    DragAndDrop,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedFile {
    pub candidate: UploadCandidate,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub accepted: Vec<UploadCandidate>,
    pub rejected: Vec<RejectedFile>,
}

impl ValidationOutcome {
    /// Sessions are bound to a single document, only the first accepted file
    /// is ever uploaded.
    pub fn first(&self) -> Option<&UploadCandidate> {
        return self.accepted.first();
    }

    pub fn warning(&self) -> Option<String> {
        if self.rejected.is_empty() {
            return None;
        }

        return Some(UploadError::NoValidFiles.to_string());
    }
}

pub struct UploadValidator {
    engine: EngineFamily,
}

impl UploadValidator {
    pub fn new(engine: EngineFamily) -> UploadValidator {
        return UploadValidator { engine };
    }

    pub fn is_allowed(candidate: &UploadCandidate) -> bool {
        return ALLOWED_MIME_TYPES.contains(&candidate.mime_type())
            && candidate.size_bytes() <= MAX_UPLOAD_BYTES;
    }

    fn rejection_reason(candidate: &UploadCandidate) -> String {
        if !ALLOWED_MIME_TYPES.contains(&candidate.mime_type()) {
            return format!("{} is not a supported file type", candidate.mime_type());
        }

        return format!(
            "{} bytes is over the {MAX_UPLOAD_BYTES} byte limit",
            candidate.size_bytes()
        );
    }

    pub fn validate(
        &self,
        gesture: SelectionGesture,
        candidates: Vec<UploadCandidate>,
    ) -> Result<ValidationOutcome, UploadError> {
        if self.engine == EngineFamily::Safari && gesture == SelectionGesture::DragAndDrop {
            return Err(UploadError::PlatformLimitation);
        }

        let mut outcome = ValidationOutcome::default();
        for candidate in candidates {
            if UploadValidator::is_allowed(&candidate) {
                outcome.accepted.push(candidate);
                continue;
            }

            let reason = UploadValidator::rejection_reason(&candidate);
            tracing::debug!(name = candidate.name(), reason, "Rejected upload candidate");
            outcome.rejected.push(RejectedFile { candidate, reason });
        }

        return Ok(outcome);
    }
}
