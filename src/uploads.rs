//! Bill image storage: a fixed directory of uploaded blobs with generated,
//! collision-resistant names. At most one file is accepted per submission,
//! gated by a declared-content-type allow-list and a size ceiling before
//! anything is written to disk.

use std::path::{Path, PathBuf};

use actix_multipart::Field;
use chrono::Utc;
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::purchase_order::BillAttachment;

pub const MAX_BILL_BYTES: usize = 30 * 1024 * 1024;
pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/gif"];

/// The multipart field name the file part must arrive under.
pub const BILL_FIELD: &str = "billUpload";

fn validate_content_type(mimetype: &str) -> Result<(), AppError> {
    if ALLOWED_MIME_TYPES.contains(&mimetype) {
        Ok(())
    } else {
        Err(AppError::UnsupportedMediaType(mimetype.to_string()))
    }
}

/// `<creation millis>-<random suffix>` plus the original extension, so
/// concurrent uploads of identically-named files never collide on disk.
fn storage_filename(created_at_millis: i64, original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!(
        "{}-{}{}",
        created_at_millis,
        Uuid::new_v4().simple(),
        extension
    )
}

/// Handle on the blob directory. Cloned into each worker; holds no open
/// resources.
#[derive(Debug, Clone)]
pub struct BillStore {
    dir: PathBuf,
}

impl BillStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Drain a multipart file field and store it. The ceiling is enforced
    /// while reading, so an oversized upload is rejected without touching
    /// disk; the content-type check happens before the first chunk is read.
    pub async fn receive(
        &self,
        field: &mut Field,
        original_filename: &str,
        mimetype: &str,
    ) -> Result<BillAttachment, AppError> {
        validate_content_type(mimetype)?;
        let mut data: Vec<u8> = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
        {
            if data.len() + chunk.len() > MAX_BILL_BYTES {
                return Err(AppError::PayloadTooLarge((data.len() + chunk.len()) as u64));
            }
            data.extend_from_slice(&chunk);
        }
        self.store(original_filename, mimetype, &data).await
    }

    /// Validate and write an already-buffered upload, returning the metadata
    /// that gets embedded in the purchase order.
    pub async fn store(
        &self,
        original_filename: &str,
        mimetype: &str,
        data: &[u8],
    ) -> Result<BillAttachment, AppError> {
        validate_content_type(mimetype)?;
        if data.len() > MAX_BILL_BYTES {
            return Err(AppError::PayloadTooLarge(data.len() as u64));
        }

        let filename = storage_filename(Utc::now().timestamp_millis(), original_filename);
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store upload: {e}")))?;

        Ok(BillAttachment {
            filename,
            path: path.display().to_string(),
            size: data.len() as i64,
            mimetype: mimetype.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_aliases_and_png_and_gif_are_allowed() {
        for mimetype in ALLOWED_MIME_TYPES {
            assert!(validate_content_type(mimetype).is_ok(), "rejected {mimetype}");
        }
    }

    #[test]
    fn non_image_content_types_are_rejected() {
        for mimetype in ["text/plain", "application/pdf", "image/svg+xml", ""] {
            let err = validate_content_type(mimetype).unwrap_err();
            assert!(matches!(err, AppError::UnsupportedMediaType(_)));
        }
    }

    #[test]
    fn generated_names_keep_the_extension_and_differ() {
        let a = storage_filename(1_700_000_000_000, "bill.png");
        let b = storage_filename(1_700_000_000_000, "bill.png");
        assert!(a.starts_with("1700000000000-"));
        assert!(a.ends_with(".png"));
        assert_ne!(a, b);
    }

    #[test]
    fn extensionless_uploads_get_no_extension() {
        let name = storage_filename(1_700_000_000_000, "bill");
        assert!(!name.contains('.'));
    }

    #[tokio::test]
    async fn store_writes_the_blob_and_returns_its_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = BillStore::new(dir.path());
        let data = b"fake png bytes";

        let bill = store.store("receipt.png", "image/png", data).await.unwrap();

        assert!(bill.filename.ends_with(".png"));
        assert_eq!(bill.size, data.len() as i64);
        assert_eq!(bill.mimetype, "image/png");
        let on_disk = std::fs::read(dir.path().join(&bill.filename)).unwrap();
        assert_eq!(on_disk, data);
    }

    #[tokio::test]
    async fn store_rejects_disallowed_types_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = BillStore::new(dir.path());

        let err = store.store("notes.txt", "text/plain", b"hello").await.unwrap_err();

        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn store_rejects_oversized_uploads_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = BillStore::new(dir.path());
        let data = vec![0u8; MAX_BILL_BYTES + 1];

        let err = store.store("big.png", "image/png", &data).await.unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn a_file_exactly_at_the_ceiling_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = BillStore::new(dir.path());
        let data = vec![0u8; MAX_BILL_BYTES];

        let bill = store.store("max.gif", "image/gif", &data).await.unwrap();
        assert_eq!(bill.size, MAX_BILL_BYTES as i64);
    }
}
