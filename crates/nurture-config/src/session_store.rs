// ── On-disk session store ──
//
// JSON file holding the record of the last successful login. Writes go
// through a sibling temp file and a rename so a crash never leaves a
// half-written session behind.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use nurture_core::{CoreError, PersistedIdentity, SessionStore};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform data directory (`session.json`).
    pub fn at_default_path() -> Self {
        Self::new(crate::session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.tmp_path();
        {
            let mut file = open_private(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

fn storage_err(path: &Path, err: impl std::fmt::Display) -> CoreError {
    CoreError::Storage {
        message: format!("{}: {err}", path.display()),
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<PersistedIdentity>, CoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_err(&self.path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| storage_err(&self.path, e))
    }

    fn persist(&self, record: &PersistedIdentity) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec_pretty(record).map_err(|e| storage_err(&self.path, e))?;
        self.write_atomic(&bytes)
            .map_err(|e| storage_err(&self.path, e))?;
        debug!(path = %self.path.display(), user = %record.id, "session persisted");
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err(&self.path, e)),
        }
    }
}
