use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Map;
use test_utils::temp_document;

use super::run;
use crate::domain::models::Gateway;
use crate::domain::models::GatewayError;
use crate::domain::models::GatewayRef;
use crate::domain::models::QueryAnswer;
use crate::domain::models::UploadCandidate;
use crate::domain::models::UploadError;
use crate::domain::models::UploadReceipt;
use crate::domain::services::EngineFamily;
use crate::domain::services::IdentityResolver;
use crate::domain::services::SelectionGesture;

#[derive(Default)]
struct RecordingGateway {
    uploads: Mutex<Vec<(String, String, usize)>>,
}

#[async_trait]
impl Gateway for RecordingGateway {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<(), GatewayError> {
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn upload(
        &self,
        candidate: &UploadCandidate,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, GatewayError> {
        self.uploads.lock().unwrap().push((
            candidate.name().to_string(),
            candidate.mime_type().to_string(),
            bytes.len(),
        ));
        return Ok(UploadReceipt {
            file_id: "doc_abc123".to_string(),
            extra: Map::new(),
        });
    }

    #[allow(clippy::implicit_return)]
    async fn query(&self, _file_id: &str, _user_query: &str) -> Result<QueryAnswer, GatewayError> {
        return Err(GatewayError::Unscoped);
    }
}

#[tokio::test]
async fn it_uploads_and_links_to_chat() -> Result<()> {
    owo_colors::set_override(false);
    let (_dir, path) = temp_document("Report (final).pdf", 1024)?;
    let recorder = Arc::new(RecordingGateway::default());
    let gateway: GatewayRef = recorder.clone();

    let mut out: Vec<u8> = vec![];
    let target = run(
        &[path],
        SelectionGesture::FilePicker,
        EngineFamily::Other,
        &gateway,
        &mut out,
    )
    .await?;

    assert_eq!(target, "/chat?docId=doc_abc123&file=Report%20%28final%29.pdf");
    assert_eq!(
        recorder.uploads.lock().unwrap().clone(),
        vec![(
            "Report (final).pdf".to_string(),
            "application/pdf".to_string(),
            1024
        )]
    );

    let identity = IdentityResolver::resolve(&target);
    assert_eq!(identity.document_id(), Some("doc_abc123"));
    assert_eq!(identity.display_name(), "Report (final).pdf");

    insta::assert_snapshot!(String::from_utf8(out)?, @r###"
    Uploaded Report (final).pdf. Chat with it using:

      docchat chat '/chat?docId=doc_abc123&file=Report%20%28final%29.pdf'
    "###);

    return Ok(());
}

#[tokio::test]
async fn it_uploads_only_the_first_accepted_file() -> Result<()> {
    owo_colors::set_override(false);
    let (_notes_dir, notes) = temp_document("notes.txt", 64)?;
    let (_a_dir, a) = temp_document("a.pdf", 64)?;
    let (_b_dir, b) = temp_document("b.png", 64)?;
    let recorder = Arc::new(RecordingGateway::default());
    let gateway: GatewayRef = recorder.clone();

    let mut out: Vec<u8> = vec![];
    run(
        &[notes, a, b],
        SelectionGesture::FilePicker,
        EngineFamily::Other,
        &gateway,
        &mut out,
    )
    .await?;

    let uploads = recorder.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "a.pdf");

    let printed = String::from_utf8(out)?;
    assert!(printed.starts_with(
        "Only PDF or image files (PNG, JPEG, TIFF, BMP) under 5MB are allowed.\n"
    ));
    assert!(printed.contains("only a.pdf will be uploaded"));

    return Ok(());
}

#[tokio::test]
async fn it_stops_when_nothing_is_accepted() -> Result<()> {
    let (_dir, path) = temp_document("notes.txt", 64)?;
    let recorder = Arc::new(RecordingGateway::default());
    let gateway: GatewayRef = recorder.clone();

    let mut out: Vec<u8> = vec![];
    let res = run(
        &[path],
        SelectionGesture::FilePicker,
        EngineFamily::Other,
        &gateway,
        &mut out,
    )
    .await;

    let err = res.err().unwrap();
    assert!(matches!(
        err.downcast_ref::<UploadError>(),
        Some(UploadError::NoValidFiles)
    ));
    assert!(recorder.uploads.lock().unwrap().is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_refuses_drag_and_drop_on_safari() -> Result<()> {
    let (_dir, path) = temp_document("a.pdf", 64)?;
    let gateway: GatewayRef = Arc::new(RecordingGateway::default());

    let mut out: Vec<u8> = vec![];
    let res = run(
        &[path],
        SelectionGesture::DragAndDrop,
        EngineFamily::Safari,
        &gateway,
        &mut out,
    )
    .await;

    assert_eq!(
        res.err().map(|err| return err.to_string()),
        Some("Safari does not support drag & drop. Please use the file picker.".to_string())
    );

    return Ok(());
}

#[tokio::test]
async fn it_skips_unreadable_files() -> Result<()> {
    owo_colors::set_override(false);
    let (_dir, path) = temp_document("a.pdf", 64)?;
    let recorder = Arc::new(RecordingGateway::default());
    let gateway: GatewayRef = recorder.clone();

    let mut out: Vec<u8> = vec![];
    let target = run(
        &[PathBuf::from("./test/does-not-exist.pdf"), path],
        SelectionGesture::FilePicker,
        EngineFamily::Other,
        &gateway,
        &mut out,
    )
    .await?;

    assert_eq!(target, "/chat?docId=doc_abc123&file=a.pdf");
    let uploads = recorder.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "a.pdf");

    let printed = String::from_utf8(out)?;
    assert!(printed.starts_with("Failed to read ./test/does-not-exist.pdf"));
    assert!(printed.contains(
        "Only PDF or image files (PNG, JPEG, TIFF, BMP) under 5MB are allowed.\n"
    ));

    return Ok(());
}

#[tokio::test]
async fn it_stops_when_no_file_is_readable() -> Result<()> {
    let recorder = Arc::new(RecordingGateway::default());
    let gateway: GatewayRef = recorder.clone();

    let mut out: Vec<u8> = vec![];
    let res = run(
        &[PathBuf::from("./test/does-not-exist.pdf")],
        SelectionGesture::FilePicker,
        EngineFamily::Other,
        &gateway,
        &mut out,
    )
    .await;

    let err = res.err().unwrap();
    assert!(matches!(
        err.downcast_ref::<UploadError>(),
        Some(UploadError::NoValidFiles)
    ));
    assert!(recorder.uploads.lock().unwrap().is_empty());

    return Ok(());
}
