//! Delivery archive creation

use crate::error::DeliveryError;
use crate::types::{DeliveryPackage, MashupArtifact, file_name_or};
use std::io::Write;
use std::path::Path;
use tracing::debug;
use zip::CompressionMethod;
use zip::write::FileOptions;

/// Wrap `artifact` in a single-entry deflate zip at `archive_path`
///
/// The entry is named after the artifact's file name. Runs on the blocking pool.
pub async fn package_artifact(
    artifact: &MashupArtifact,
    archive_path: &Path,
) -> Result<DeliveryPackage, DeliveryError> {
    let source = artifact.path.clone();
    let archive = archive_path.to_path_buf();
    let entry_name = file_name_or(&source, "mashup.mp3");

    let task = {
        let (source, entry_name) = (source.clone(), entry_name.clone());
        tokio::task::spawn_blocking(move || write_single_entry_zip(&source, &archive, &entry_name))
    };
    let reason = match task.await {
        Ok(Ok(())) => None,
        Ok(Err(reason)) => Some(reason),
        Err(e) => Some(format!("archive task failed: {}", e)),
    };
    if let Some(reason) = reason {
        return Err(DeliveryError::Package {
            path: source,
            reason,
        });
    }

    debug!(archive = ?archive_path, entry = %entry_name, "packaged mashup");
    Ok(DeliveryPackage {
        path: archive_path.to_path_buf(),
        entry_name,
    })
}

fn write_single_entry_zip(source: &Path, archive: &Path, entry_name: &str) -> Result<(), String> {
    let mut input =
        std::fs::File::open(source).map_err(|e| format!("failed to open artifact: {}", e))?;
    let output = std::fs::File::create(archive)
        .map_err(|e| format!("failed to create {}: {}", archive.display(), e))?;

    let mut zip = zip::ZipWriter::new(output);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(entry_name, options)
        .map_err(|e| format!("failed to start zip entry: {}", e))?;
    std::io::copy(&mut input, &mut zip).map_err(|e| format!("failed to write zip entry: {}", e))?;
    zip.finish()
        .map_err(|e| format!("failed to finish archive: {}", e))?
        .flush()
        .map_err(|e| format!("failed to flush archive: {}", e))?;
    Ok(())
}
