use std::path::{Component, Path, PathBuf};

use actix_web::web;
use tracing::{debug, warn};

use crate::error::AppError;

/// Resolve a stored attachment path inside `root`. Only plain relative paths
/// are accepted.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf, AppError> {
    let candidate = Path::new(relative);
    let plain = !relative.trim().is_empty()
        && candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !plain {
        return Err(AppError::field(
            "attachment_path",
            "The attachment path must be relative to the attachment directory",
        ));
    }
    Ok(root.join(candidate))
}

/// Remove the file behind a record's attachment, if it has one.
/// Returns whether a file was deleted. A missing file is not an error.
pub async fn remove_attachment(root: &Path, relative: Option<&str>) -> Result<bool, AppError> {
    let Some(relative) = relative else {
        return Ok(false);
    };
    let path = resolve(root, relative)?;

    let removed = web::block(move || match std::fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Attachment already gone");
            Ok(false)
        }
        Err(e) => Err(e),
    })
    .await
    .map_err(|e| AppError::internal(format!("attachment removal cancelled: {e}")))?
    .map_err(|e| AppError::internal(format!("attachment removal failed: {e}")))?;

    debug!(relative, removed, "Attachment cleanup");
    Ok(removed)
}

/// Cleanup after the owning row is already gone. Failures are logged and
/// reported as "nothing removed" so the delete itself still succeeds.
pub async fn discard_attachment(root: &Path, relative: Option<&str>) -> bool {
    match remove_attachment(root, relative).await {
        Ok(removed) => removed,
        Err(e) => {
            warn!(relative, error = %e, "Attachment left behind after delete");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_escaping_paths() {
        let root = Path::new("/srv/attachments");
        assert!(resolve(root, "training/7/cert.pdf").is_ok());
        assert!(resolve(root, "../etc/passwd").is_err());
        assert!(resolve(root, "/etc/passwd").is_err());
        assert!(resolve(root, "").is_err());
    }

    #[actix_web::test]
    async fn removes_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("court")).unwrap();
        let file = dir.path().join("court/subpoena.pdf");
        std::fs::write(&file, b"%PDF").unwrap();

        let removed = remove_attachment(dir.path(), Some("court/subpoena.pdf"))
            .await
            .unwrap();
        assert!(removed);
        assert!(!file.exists());
    }

    #[actix_web::test]
    async fn missing_file_or_path_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_attachment(dir.path(), None).await.unwrap());
        assert!(!remove_attachment(dir.path(), Some("gone.pdf")).await.unwrap());
    }

    #[actix_web::test]
    async fn failed_cleanup_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be unlinked.
        std::fs::create_dir_all(dir.path().join("training/cert.pdf")).unwrap();

        assert!(remove_attachment(dir.path(), Some("training/cert.pdf")).await.is_err());
        assert!(!discard_attachment(dir.path(), Some("training/cert.pdf")).await);
        assert!(!discard_attachment(dir.path(), Some("../escape.pdf")).await);
        assert!(dir.path().join("training/cert.pdf").is_dir());
    }
}
