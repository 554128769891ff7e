use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::{BTreeMap, HashSet},
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use uuid::Uuid;

/// Public URL prefix under which stored files are served.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Extensions (and MIME subtypes) accepted for uploads.
const ALLOWED_IMAGE_TYPES: [&str; 4] = ["jpeg", "jpg", "png", "webp"];

// 1. StorageService Contract
/// StorageService
///
/// Flat-namespace file store for uploaded images. Filenames passed in are plain names;
/// callers validate them with [`is_safe_filename`] first.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the backing location if needed. Called once at startup.
    async fn ensure_ready(&self) -> io::Result<()>;

    async fn save(&self, filename: &str, bytes: &[u8]) -> io::Result<()>;

    /// Every stored filename, sorted.
    async fn list(&self) -> io::Result<Vec<String>>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, filename: &str) -> io::Result<bool>;
}

/// StorageState
///
/// The shared handle stored in `AppState`.
pub type StorageState = Arc<dyn StorageService>;

// 2. The Real Implementation (uploads directory)
/// LocalDiskStorage
///
/// Stores files directly inside one directory on the local filesystem.
#[derive(Clone, Debug)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StorageService for LocalDiskStorage {
    async fn ensure_ready(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    async fn save(&self, filename: &str, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::write(self.root.join(filename), bytes).await
    }

    /// Regular files only; hidden files such as `.gitkeep` are not considered uploads.
    async fn list(&self) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn delete(&self, filename: &str) -> io::Result<bool> {
        match tokio::fs::remove_file(self.root.join(filename)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// In-memory store used by handler and router tests.
#[derive(Default)]
pub struct MockStorageService {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Pre-populates the store.
    pub fn with_files<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        {
            let mut files = mock.lock();
            for name in names {
                files.insert(name.into(), Vec::new());
            }
        }
        mock
    }

    pub fn contents(&self, filename: &str) -> Option<Vec<u8>> {
        self.lock().get(filename).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> io::Result<()> {
        if self.should_fail {
            return Err(io::Error::other("Mock Storage Error: Simulation requested"));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_ready(&self) -> io::Result<()> {
        self.check()
    }

    async fn save(&self, filename: &str, bytes: &[u8]) -> io::Result<()> {
        self.check()?;
        self.lock().insert(filename.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn list(&self) -> io::Result<Vec<String>> {
        self.check()?;
        Ok(self.lock().keys().cloned().collect())
    }

    async fn delete(&self, filename: &str) -> io::Result<bool> {
        self.check()?;
        Ok(self.lock().remove(filename).is_some())
    }
}

// --- Filename rules ---

/// is_safe_filename
///
/// A single visible path component: no separators, no NUL, no leading dot. Hidden
/// files are neither listed nor deletable.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\', '\0'])
}

/// allowed_image_extension
///
/// Both the original filename's extension and the declared MIME type must name one of
/// jpeg/jpg/png/webp. Returns the lowercased extension to store under.
pub fn allowed_image_extension(original_name: &str, content_type: &str) -> Option<String> {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();

    let content_type = content_type.to_ascii_lowercase();
    let ext_ok = ALLOWED_IMAGE_TYPES.contains(&ext.as_str());
    let mime_ok = ALLOWED_IMAGE_TYPES.iter().any(|t| content_type.contains(t));

    (ext_ok && mime_ok).then_some(ext)
}

/// generate_upload_name
///
/// `<field>-<unix millis>-<8 hex>.<ext>`; the random suffix keeps same-millisecond
/// uploads apart.
pub fn generate_upload_name(field: &str, ext: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}.{}",
        field,
        Utc::now().timestamp_millis(),
        &suffix[..8],
        ext
    )
}

/// The relative path returned to clients and stored in `blogs.image`.
pub fn public_path(filename: &str) -> String {
    format!("{PUBLIC_PREFIX}/{filename}")
}

/// find_orphans
///
/// Files whose name equals the basename of no referenced path. Order of `files` is kept.
pub fn find_orphans(files: &[String], referenced: &[String]) -> Vec<String> {
    let in_use: HashSet<&str> = referenced
        .iter()
        .filter_map(|path| Path::new(path).file_name().and_then(|n| n.to_str()))
        .collect();

    files
        .iter()
        .filter(|file| !in_use.contains(file.as_str()))
        .cloned()
        .collect()
}
