// Scoped temporary files for uploaded images
// Files are removed when the guard is dropped, on every exit path.

use crate::models::pose::{ExtractResult, PoseError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// An uploaded image persisted to disk for the duration of one request
pub struct TempUpload {
    file: NamedTempFile,
}

impl TempUpload {
    /// Write `bytes` to `<dir>/<prefix>_<timestamp>_<random>_<filename>`
    pub fn create(dir: &Path, prefix: &str, filename: &str, bytes: &[u8]) -> ExtractResult<Self> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}_{}_", prefix, stamp))
            .suffix(&format!("_{}", sanitize_filename(filename)))
            .tempfile_in(dir)?;

        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self { file })
    }

    /// [`create`](Self::create) on the blocking pool
    pub async fn persist<B>(dir: PathBuf, prefix: &'static str, filename: String, bytes: B) -> ExtractResult<Self>
    where
        B: AsRef<[u8]> + Send + 'static,
    {
        tokio::task::spawn_blocking(move || Self::create(&dir, prefix, &filename, bytes.as_ref()))
            .await
            .map_err(|e| PoseError::Io(std::io::Error::other(e.to_string())))?
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Empty output file reserved for a rendered overlay, removed on drop
pub fn reserve_output(dir: &Path, prefix: &str, extension: &str) -> ExtractResult<NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix(&format!("{}_", prefix))
        .suffix(&format!(".{}", extension))
        .tempfile_in(dir)?;
    Ok(file)
}

/// Keep only the final path component and a conservative character set
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\pic 1.png"), "pic_1.png");
        assert_eq!(sanitize_filename(".."), "upload");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn test_temp_upload_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let upload = TempUpload::create(dir.path(), "temp", "pose.jpg", b"bytes").unwrap();
        let path = upload.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"bytes");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("temp_"));
        assert!(name.ends_with("_pose.jpg"));

        drop(upload);
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_upload_removed_on_early_return() {
        fn failing_step(dir: &Path) -> ExtractResult<()> {
            let _upload = TempUpload::create(dir, "temp", "a.png", b"x")?;
            Err(PoseError::Decode("corrupt".to_string()))
        }

        let dir = tempfile::tempdir().unwrap();
        assert!(failing_step(dir.path()).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_persist_writes_off_the_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let payload = vec![7u8; 64 * 1024];
        let upload = TempUpload::persist(dir.path().to_path_buf(), "temp", "big.png".to_string(), payload)
            .await
            .unwrap();

        assert_eq!(std::fs::metadata(upload.path()).unwrap().len(), 64 * 1024);
        drop(upload);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_persist_missing_directory() {
        let err = TempUpload::persist(PathBuf::from("/nonexistent/uploads"), "temp", "a.png".to_string(), b"x".to_vec())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), "io");
    }

    #[test]
    fn test_reserve_output_extension() {
        let dir = tempfile::tempdir().unwrap();
        let output = reserve_output(dir.path(), "pose_visualization", "jpg").unwrap();
        assert!(output.path().to_string_lossy().ends_with(".jpg"));
    }
}
