//! Secret key material and the providers that resolve it

use hashmatch_core::{HashmatchError, HashmatchResult};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest as _, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

use crate::KEY_SIZE;

/// HMAC key bytes. Zeroized on drop, never printed.
#[derive(Clone)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Generate a random 256-bit key.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Short public identifier for the key: hex of the first 8 bytes of SHA-256(key).
    ///
    /// Lets two parties confirm they hold the same key without exchanging it.
    pub fn fingerprint(&self) -> String {
        let hash = Sha256::digest(&self.bytes);
        hex::encode(&hash[..8])
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Source of the key used for one invocation.
pub trait KeyProvider {
    fn resolve(&self) -> HashmatchResult<SecretKey>;

    /// Human-readable source description for logs (never the key itself).
    fn describe(&self) -> String;
}

/// A key supplied directly by the caller; its UTF-8 bytes are the key.
pub struct ExplicitKey(SecretString);

impl ExplicitKey {
    pub fn new(key: SecretString) -> Self {
        Self(key)
    }
}

impl KeyProvider for ExplicitKey {
    fn resolve(&self) -> HashmatchResult<SecretKey> {
        let text = self.0.expose_secret();
        if text.is_empty() {
            return Err(HashmatchError::KeyResolution(
                "explicit key must not be empty".into(),
            ));
        }
        Ok(SecretKey::from_bytes(text.as_bytes().to_vec()))
    }

    fn describe(&self) -> String {
        "explicit".into()
    }
}

/// Key persisted as raw bytes in a file; generated on first use.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HashmatchResult<Option<SecretKey>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Err(HashmatchError::KeyResolution(format!(
                "key file is empty: {}",
                self.path.display()
            ))),
            Ok(bytes) => Ok(Some(SecretKey::from_bytes(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HashmatchError::KeyResolution(format!(
                "reading key file {}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Generate a key and write it with `create_new`, so an existing file is never clobbered.
    fn create(&self) -> HashmatchResult<SecretKey> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                HashmatchError::KeyResolution(format!(
                    "creating key directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let key = SecretKey::generate();
        let mut file = match open_new_restricted(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Another process created it between our read and create.
                tracing::debug!(path = %self.path.display(), "key file appeared concurrently, reloading");
                return self.load()?.ok_or_else(|| {
                    HashmatchError::KeyResolution(format!(
                        "key file vanished during creation: {}",
                        self.path.display()
                    ))
                });
            }
            Err(e) => {
                return Err(HashmatchError::KeyResolution(format!(
                    "creating key file {}: {e}",
                    self.path.display()
                )))
            }
        };

        if let Err(e) = file.write_all(key.as_bytes()).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = std::fs::remove_file(&self.path);
            return Err(HashmatchError::KeyResolution(format!(
                "writing key file {}: {e}",
                self.path.display()
            )));
        }

        tracing::info!(
            path = %self.path.display(),
            fingerprint = %key.fingerprint(),
            "generated and saved new secret key"
        );
        Ok(key)
    }
}

impl KeyProvider for FileKeyStore {
    fn resolve(&self) -> HashmatchResult<SecretKey> {
        match self.load()? {
            Some(key) => {
                tracing::info!(
                    path = %self.path.display(),
                    fingerprint = %key.fingerprint(),
                    "loaded existing secret key"
                );
                Ok(key)
            }
            None => self.create(),
        }
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

#[cfg(unix)]
fn open_new_restricted(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_new_restricted(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
}

/// Key resolution order for one invocation:
///   1. a non-empty explicit key (no persistence side effect)
///   2. the key file, created on first use
pub struct KeyResolver {
    explicit: Option<ExplicitKey>,
    store: FileKeyStore,
}

impl KeyResolver {
    pub fn new(explicit: Option<SecretString>, key_file: impl Into<PathBuf>) -> Self {
        let explicit = explicit
            .filter(|k| !k.expose_secret().is_empty())
            .map(ExplicitKey::new);
        Self {
            explicit,
            store: FileKeyStore::new(key_file),
        }
    }

    fn active(&self) -> &dyn KeyProvider {
        match &self.explicit {
            Some(explicit) => explicit as &dyn KeyProvider,
            None => &self.store,
        }
    }
}

impl KeyProvider for KeyResolver {
    fn resolve(&self) -> HashmatchResult<SecretKey> {
        self.active().resolve()
    }

    fn describe(&self) -> String {
        self.active().describe()
    }
}
