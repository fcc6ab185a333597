use std::path::Path;
use std::path::PathBuf;

use tokio::fs;

use super::UploadError;

/// A file selected for upload. The bytes stay on disk until the candidate has
/// passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadCandidate {
    name: String,
    mime_type: String,
    size_bytes: u64,
    path: PathBuf,
}

impl UploadCandidate {
    pub fn new(name: &str, mime_type: &str, size_bytes: u64, path: PathBuf) -> UploadCandidate {
        return UploadCandidate {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes,
            path,
        };
    }

    /// Inspects a local file. The MIME type is derived from the file
    /// extension, the same way a browser file input reports it.
    pub async fn from_path(path: &Path) -> Result<UploadCandidate, UploadError> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|source| {
                return UploadError::Read {
                    path: path.to_path_buf(),
                    source,
                };
            })?;

        let name = path
            .file_name()
            .map(|name| return name.to_string_lossy().to_string())
            .unwrap_or_else(|| return path.to_string_lossy().to_string());
        let mime_type = mime_guess::from_path(path).first_or_octet_stream();

        return Ok(UploadCandidate::new(
            &name,
            mime_type.essence_str(),
            metadata.len(),
            path.to_path_buf(),
        ));
    }

    pub fn name(&self) -> &str {
        return &self.name;
    }

    pub fn mime_type(&self) -> &str {
        return &self.mime_type;
    }

    pub fn size_bytes(&self) -> u64 {
        return self.size_bytes;
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>, UploadError> {
        return fs::read(&self.path).await.map_err(|source| {
            return UploadError::Read {
                path: self.path.to_path_buf(),
                source,
            };
        });
    }
}
