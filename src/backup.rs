use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};

use crate::business::Business;
use crate::error::{Error, Result};

const ARTIFACT_EXTENSION: &str = "png";

/// One business backup file under a storage root, plus the directory its
/// contract artifacts go to.
pub struct BackupStore {
    root: PathBuf,
    slug: String,
    business: Option<Business>,
}

impl BackupStore {
    /// Opens the backup for `name` under `root`, loading it when it exists.
    ///
    /// # Errors
    /// * `Storage` if `root` is not an existing directory.
    /// * `Serialization` if the backup file is not a valid business record.
    pub fn open(root: impl AsRef<Path>, name: &str) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::storage(&root, "backup directory does not exist"));
        }
        let base = name.strip_suffix(".json").unwrap_or(name);
        let slug = slugify(base);
        if slug.is_empty() {
            return Err(Error::Validation(format!("business name '{name}' has no usable characters")));
        }

        let mut store = BackupStore { root, slug, business: None };
        let path = store.file_path();
        if path.exists() {
            let text = fs::read_to_string(&path).map_err(|e| Error::storage(&path, e.to_string()))?;
            store.business = Some(Business::from_json(&text)?);
            tracing::debug!(path = %path.display(), "backup loaded");
        }
        Ok(store)
    }

    pub fn file_path(&self) -> PathBuf {
        self.root.join(format!("{}.json", self.slug))
    }

    pub fn contracts_path(&self) -> PathBuf {
        self.root.join(format!("{}-contracts", self.slug))
    }

    pub fn exists(&self) -> bool {
        self.file_path().exists()
    }

    pub fn business(&self) -> Option<&Business> {
        self.business.as_ref()
    }

    pub fn business_mut(&mut self) -> Option<&mut Business> {
        self.business.as_mut()
    }

    pub fn set_business(&mut self, business: Business) {
        self.business = Some(business);
    }

    /// Writes the business as pretty JSON, replacing any previous backup.
    pub fn save(&self) -> Result<PathBuf> {
        let business = self
            .business
            .as_ref()
            .ok_or_else(|| Error::Configuration("digital business misconfiguration".into()))?;
        let json = business.to_json()?;

        let path = self.file_path();
        let tmp = path.with_extension("json.tmp");
        write_private(&tmp, json.as_bytes())?;
        fs::rename(&tmp, &path).map_err(|e| Error::storage(&path, e.to_string()))?;
        tracing::debug!(path = %path.display(), "backup saved");
        Ok(path)
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.contracts_path().join(format!("{name}.{ARTIFACT_EXTENSION}"))
    }

    /// Stores a base64 image (optionally a `data:` URL) as `<name>.png`.
    /// An artifact that is already on disk is left untouched.
    pub fn save_artifact(&self, name: &str, data: &str) -> Result<PathBuf> {
        let path = self.artifact_path(name);
        if path.exists() {
            tracing::debug!(path = %path.display(), "artifact already present");
            return Ok(path);
        }
        let bytes = B64
            .decode(strip_data_url(data).trim())
            .map_err(|e| Error::Validation(format!("artifact '{name}' is not valid base64: {e}")))?;

        let dir = self.contracts_path();
        fs::create_dir_all(&dir).map_err(|e| Error::storage(&dir, e.to_string()))?;
        fs::write(&path, bytes).map_err(|e| Error::storage(&path, e.to_string()))?;
        Ok(path)
    }
}

fn strip_data_url(data: &str) -> &str {
    if let Some(rest) = data.strip_prefix("data:image/") {
        if let Some((_, payload)) = rest.split_once(";base64,") {
            return payload;
        }
    }
    data
}

fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(|e| Error::storage(path, e.to_string()))?;
    file.write_all(bytes).map_err(|e| Error::storage(path, e.to_string()))?;
    file.sync_all().map_err(|e| Error::storage(path, e.to_string()))?;
    Ok(())
}

/// Lowercases `text`, keeps ASCII alphanumerics, `.` and `_`, and folds every
/// other run into a single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}
