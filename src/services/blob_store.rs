//! BlobStore — flat on-disk storage for uploaded file contents.
//!
//! Blobs live directly under `base_path` as `<uuid>_<original filename>`.
//! The storage key is the only handle callers ever get; it is never joined
//! onto the base path without being checked first.

use super::{DocumentError, DocumentResult};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const FALLBACK_FILENAME: &str = "file";

/// Result of a successful `store`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: String,
    pub size_bytes: i64,
}

#[derive(Clone, Debug)]
pub struct BlobStore {
    /// Directory that holds every blob.
    pub base_path: PathBuf,
}

impl BlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Stream `stream` into a fresh blob named after `original_filename`.
    ///
    /// - Writes to a `.tmp-<uuid>` file first, fsyncs, then renames onto the key.
    /// - Any existing file at the key is replaced.
    /// - The temp file is removed on every error path.
    pub async fn store<S>(&self, original_filename: &str, stream: S) -> DocumentResult<StoredBlob>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        fs::create_dir_all(&self.base_path).await?;

        let key = generate_key(original_filename);
        let file_path = self.base_path.join(&key);
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(DocumentError::Io(err));
                }
            };
            size_bytes += chunk.len() as i64;
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(DocumentError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(DocumentError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(DocumentError::Io(err));
        }
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(DocumentError::Io(err));
            }
        }

        debug!("stored blob {} ({} bytes)", key, size_bytes);
        Ok(StoredBlob { key, size_bytes })
    }

    /// Open a blob for reading from the start.
    ///
    /// Returns NotFound if the key does not resolve to an existing file.
    pub async fn open(&self, key: &str) -> DocumentResult<File> {
        let path = self.resolve(key).ok_or(DocumentError::NotFound)?;
        File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                DocumentError::NotFound
            } else {
                DocumentError::Io(err)
            }
        })
    }

    /// Remove a blob. Returns `false` when there was nothing to remove.
    pub async fn delete(&self, key: &str) -> DocumentResult<bool> {
        let Some(path) = self.resolve(key) else {
            return Ok(false);
        };
        match fs::remove_file(&path).await {
            Ok(_) => {
                debug!("removed blob {}", path.display());
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("blob {} already missing", path.display());
                Ok(false)
            }
            Err(err) => Err(DocumentError::Io(err)),
        }
    }

    /// Best-effort write/read/delete of a scratch file under `base_path`.
    pub async fn probe(&self) -> io::Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz").await?;
        let read = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        if read? != b"readyz" {
            return Err(io::Error::other("file content mismatch"));
        }
        Ok(())
    }

    /// Map a key onto a path inside `base_path`, rejecting anything that
    /// could escape the directory.
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        if key.is_empty()
            || key.contains("..")
            || key.contains('/')
            || key.contains('\\')
            || key.bytes().any(|b| b.is_ascii_control())
        {
            return None;
        }
        Some(self.base_path.join(key))
    }
}

/// `<uuid>_<sanitized filename>`.
pub fn generate_key(original_filename: &str) -> String {
    format!("{}_{}", Uuid::new_v4(), sanitize_filename(original_filename))
}

/// Keep the last path component of a client-supplied filename and strip
/// control characters.
fn sanitize_filename(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>();

    let trimmed = last.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return FALLBACK_FILENAME.to_string();
    }
    let mut cleaned = trimmed.to_string();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn setup_store() -> (TempDir, BlobStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path().join("uploads"));
        (temp_dir, store)
    }

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = io::Result<Bytes>> {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    async fn read_all(store: &BlobStore, key: &str) -> Vec<u8> {
        let mut file = store.open(key).await.unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn store_creates_directory_and_writes_all_chunks() {
        let (_temp_dir, store) = setup_store();
        assert!(!store.base_path.exists());

        let blob = store
            .store("report.pdf", chunks(&["%PDF-1.4", "\nbody"]))
            .await
            .unwrap();

        assert!(store.base_path.is_dir());
        assert!(blob.key.ends_with("_report.pdf"));
        assert_eq!(blob.size_bytes, 13);
        assert_eq!(read_all(&store, &blob.key).await, b"%PDF-1.4\nbody");
    }

    #[tokio::test]
    async fn store_generates_unique_keys() {
        let (_temp_dir, store) = setup_store();
        let a = store.store("same.txt", chunks(&["a"])).await.unwrap();
        let b = store.store("same.txt", chunks(&["b"])).await.unwrap();

        assert_ne!(a.key, b.key);
        assert_eq!(read_all(&store, &a.key).await, b"a");
        assert_eq!(read_all(&store, &b.key).await, b"b");
    }

    #[tokio::test]
    async fn store_cleans_up_temp_file_on_stream_error() {
        let (_temp_dir, store) = setup_store();
        let stream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::other("client went away")),
        ]);

        let result = store.store("broken.bin", stream).await;
        assert!(matches!(result, Err(DocumentError::Io(_))));

        let leftovers = std::fs::read_dir(&store.base_path).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn open_missing_is_not_found() {
        let (_temp_dir, store) = setup_store();
        let result = store.open("nope_missing.txt").await;
        assert!(matches!(result, Err(DocumentError::NotFound)));
    }

    #[tokio::test]
    async fn open_rejects_traversal_keys() {
        let (temp_dir, store) = setup_store();
        std::fs::write(temp_dir.path().join("secret.txt"), b"secret").unwrap();

        let result = store.open("../secret.txt").await;
        assert!(matches!(result, Err(DocumentError::NotFound)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_temp_dir, store) = setup_store();
        let blob = store.store("gone.txt", chunks(&["x"])).await.unwrap();

        assert!(store.delete(&blob.key).await.unwrap());
        assert!(!store.delete(&blob.key).await.unwrap());
        assert!(matches!(
            store.open(&blob.key).await,
            Err(DocumentError::NotFound)
        ));
    }

    #[tokio::test]
    async fn probe_leaves_no_files_behind() {
        let (_temp_dir, store) = setup_store();
        store.probe().await.unwrap();
        assert_eq!(std::fs::read_dir(&store.base_path).unwrap().count(), 0);
    }

    #[test]
    fn sanitize_filename_keeps_last_component() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\notes.txt"), "notes.txt");
        assert_eq!(sanitize_filename("bad\nname.txt"), "badname.txt");
        assert_eq!(sanitize_filename("a..b.txt"), "a.b.txt");
        assert_eq!(sanitize_filename("a...b.txt"), "a.b.txt");
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename(".."), "file");
        assert_eq!(sanitize_filename("dir/"), "file");
    }

    #[test]
    fn generated_keys_resolve_inside_base_path() {
        let store = BlobStore::new("/srv/uploads");
        let key = generate_key("../../escape.sh");
        let path = store.resolve(&key).unwrap();
        assert_eq!(path.parent(), Some(Path::new("/srv/uploads")));
    }
}
