//! Credential store for the session bearer token.
//!
//! DESIGN
//! ======
//! Two traits split the store by role. `CredentialSource` is read-only and is
//! what the request authorizer sees; `CredentialStore` adds `set`/`clear` and
//! is held only by the session controller, which keeps a single writer.
//!
//! `FileCredentialStore` reads its file once at construction and then serves
//! reads from memory, so a read issued before any network call completes never
//! races a lazy load. Writes go through a temp file and a rename.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

// =============================================================================
// CREDENTIAL
// =============================================================================

/// Opaque bearer token proving an authenticated session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCredential(String);

impl SessionCredential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// Tokens must not end up in logs.
impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCredential(<redacted>)")
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("credential file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// =============================================================================
// TRAITS
// =============================================================================

/// Read side of the store.
pub trait CredentialSource: Send + Sync {
    fn get(&self) -> Option<SessionCredential>;

    fn is_present(&self) -> bool {
        self.get().is_some()
    }
}

/// Write side of the store.
pub trait CredentialStore: CredentialSource {
    /// Persist `credential`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be written.
    fn set(&self, credential: SessionCredential) -> Result<(), StoreError>;

    /// Remove the stored credential. Clearing an empty store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be removed.
    fn clear(&self) -> Result<(), StoreError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<SessionCredential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_credential(credential: SessionCredential) -> Self {
        Self { slot: Mutex::new(Some(credential)) }
    }
}

impl CredentialSource for MemoryCredentialStore {
    fn get(&self) -> Option<SessionCredential> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn set(&self, credential: SessionCredential) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

#[derive(Serialize, Deserialize)]
struct CredentialFile {
    token: SessionCredential,
}

/// JSON-file backed store; the token survives process restarts.
pub struct FileCredentialStore {
    path: PathBuf,
    slot: Mutex<Option<SessionCredential>>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading any credential already saved there.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let loaded = load(&path)?;
        tracing::debug!(path = %path.display(), present = loaded.is_some(), "credential store opened");
        Ok(Self { path, slot: Mutex::new(loaded) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load(path: &Path) -> Result<Option<SessionCredential>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(StoreError::Io { path: path.to_owned(), source }),
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let file: CredentialFile =
        serde_json::from_str(&raw).map_err(|source| StoreError::Json { path: path.to_owned(), source })?;
    Ok(Some(file.token))
}

fn persist(path: &Path, credential: &SessionCredential) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io { path: path.to_owned(), source };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let body = serde_json::to_string(&CredentialFile { token: credential.clone() })
        .map_err(|source| StoreError::Json { path: path.to_owned(), source })?;

    let tmp = path.with_extension("tmp");
    write_owner_only(&tmp, body.as_bytes()).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}

/// Write `body` to `path`, readable by the owning user only on unix.
fn write_owner_only(path: &Path, body: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // `mode` only applies on creation; a leftover temp file keeps its old bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(body)?;
    file.sync_all()
}

/// Remove the credential file. If it cannot be unlinked, empty it instead so
/// the next `open` still loads nothing.
fn erase(path: &Path) -> Result<(), StoreError> {
    let source = match fs::remove_file(path) {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => e,
    };
    match fs::OpenOptions::new().write(true).truncate(true).open(path) {
        Ok(_) => {
            tracing::warn!(path = %path.display(), error = %source, "credential file not removed; truncated instead");
            Ok(())
        }
        Err(_) => Err(StoreError::Io { path: path.to_owned(), source }),
    }
}

impl CredentialSource for FileCredentialStore {
    fn get(&self) -> Option<SessionCredential> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl CredentialStore for FileCredentialStore {
    fn set(&self, credential: SessionCredential) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        persist(&self.path, &credential)?;
        *slot = Some(credential);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        // Forget the in-memory copy first; a failed unlink must not leave a live token.
        slot.take();
        erase(&self.path)
    }
}

#[cfg(test)]
#[path = "credential_test.rs"]
mod tests;
