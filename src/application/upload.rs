#[cfg(test)]
#[path = "upload_test.rs"]
mod tests;

use std::io;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use owo_colors::OwoColorize;
use owo_colors::Stream;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::DocumentIdentity;
use crate::domain::models::GatewayRef;
use crate::domain::models::UploadCandidate;
use crate::domain::models::UploadError;
use crate::domain::services::EngineFamily;
use crate::domain::services::RejectedFile;
use crate::domain::services::SelectionGesture;
use crate::domain::services::UploadValidator;

/// Validates the selection, uploads the first accepted file and returns the
/// chat link for it. Files that cannot be read are skipped like rejected ones.
pub async fn run<W: Write>(
    files: &[PathBuf],
    gesture: SelectionGesture,
    engine: EngineFamily,
    gateway: &GatewayRef,
    out: &mut W,
) -> Result<String> {
    let mut candidates = vec![];
    let mut unreadable = vec![];
    for path in files {
        match UploadCandidate::from_path(path).await {
            Ok(candidate) => candidates.push(candidate),
            Err(err) => {
                let name = path
                    .file_name()
                    .map(|name| return name.to_string_lossy().to_string())
                    .unwrap_or_else(|| return path.to_string_lossy().to_string());
                writeln!(
                    out,
                    "{}",
                    err.to_string()
                        .if_supports_color(Stream::Stdout, |text| return text.yellow())
                )?;
                unreadable.push(RejectedFile {
                    candidate: UploadCandidate::new(&name, "", 0, path.to_path_buf()),
                    reason: err.to_string(),
                });
            }
        }
    }

    let mut outcome = UploadValidator::new(engine).validate(gesture, candidates)?;
    outcome.rejected.extend(unreadable);
    for rejected in outcome.rejected.iter() {
        tracing::info!(
            name = rejected.candidate.name(),
            reason = rejected.reason.as_str(),
            "Skipping file"
        );
    }
    if let Some(warning) = outcome.warning() {
        writeln!(
            out,
            "{}",
            warning.if_supports_color(Stream::Stdout, |text| return text.yellow())
        )?;
    }

    let candidate = outcome.first().ok_or(UploadError::NoValidFiles)?;
    if outcome.accepted.len() > 1 {
        writeln!(
            out,
            "A conversation covers a single document, only {} will be uploaded.",
            candidate.name()
        )?;
    }

    let bytes = candidate.read_bytes().await?;
    let receipt = gateway.upload(candidate, bytes).await?;
    let target = DocumentIdentity::new(&receipt.file_id, candidate.name()).navigation_target();

    writeln!(
        out,
        "Uploaded {}. Chat with it using:\n\n  docchat chat '{target}'",
        candidate
            .name()
            .if_supports_color(Stream::Stdout, |text| return text.green())
    )?;

    return Ok(target);
}

pub async fn start(
    files: &[PathBuf],
    gesture: SelectionGesture,
    gateway: &GatewayRef,
) -> Result<String> {
    let engine = EngineFamily::from_user_agent(&Config::get(ConfigKey::UserAgent));
    return run(files, gesture, engine, gateway, &mut io::stdout()).await;
}
