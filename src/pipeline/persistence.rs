//! Encrypted persistence (C10): symmetric-authenticated file store for the
//! failed-keyword retry queue, one file per logical namespace.
//!
//! Grounded stylistically on the teacher's `retry_queue.rs` (per-namespace
//! state, read-modify-write under a lock); the AES-GCM primitive itself
//! comes from the wider example pack (`aes-gcm` appears across the
//! retrieval pack's manifests, e.g. AharonR-downloader).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::errors::PipelineError;
use crate::models::FailedKeyword;

const MAGIC: &[u8; 4] = b"KHP1";
const NONCE_LEN: usize = 12;

/// A single encrypted-file namespace store, read-modify-write under a
/// per-namespace lock (§4.10, §5).
pub struct EncryptedStore {
    path: PathBuf,
    cipher: Aes256Gcm,
    lock: Mutex<()>,
}

impl EncryptedStore {
    /// # Errors
    /// Returns [`PipelineError::Config`] if `key` is not exactly 32 bytes.
    pub fn new(path: impl Into<PathBuf>, key: &[u8]) -> Result<Self, PipelineError> {
        if key.len() != 32 {
            return Err(PipelineError::Config(format!(
                "encryption key must be 32 bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        Ok(Self { path: path.into(), cipher, lock: Mutex::new(()) })
    }

    /// Encrypt and write `items` to the namespace file, replacing any
    /// prior content.
    ///
    /// # Errors
    /// Returns [`PipelineError::Data`] on serialization failure or
    /// [`PipelineError::Transport`] wrapping the underlying I/O error.
    pub fn save(&self, items: &[FailedKeyword]) -> Result<(), PipelineError> {
        let _guard = self.lock.lock().expect("persistence lock poisoned");

        let payload = serde_json::to_vec(items)
            .map_err(|e| PipelineError::Data(format!("serializing retry queue: {e}")))?;

        let nonce_bytes = random_nonce();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, payload.as_ref())
            .map_err(|_| PipelineError::Data("encryption failed".into()))?;

        let mut out = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);

        std::fs::write(&self.path, out)
            .map_err(|e| PipelineError::Other(anyhow::anyhow!("writing {}: {e}", self.path.display())))
    }

    /// Read and decrypt the namespace file. Returns an empty vec if the
    /// file does not exist yet (first run).
    ///
    /// # Errors
    /// Returns [`PipelineError::Auth`] if the key does not match (the
    /// AEAD tag fails to verify) rather than silently returning partial
    /// or corrupted data; returns [`PipelineError::Parse`] if the file
    /// exists but its header does not match the expected schema.
    pub fn load(&self) -> Result<Vec<FailedKeyword>, PipelineError> {
        let _guard = self.lock.lock().expect("persistence lock poisoned");

        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PipelineError::Other(anyhow::anyhow!("reading {}: {e}", self.path.display())))
            }
        };

        if bytes.len() < MAGIC.len() + NONCE_LEN {
            return Err(PipelineError::Parse("retry queue file too short for its header".into()));
        }
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(PipelineError::Parse("retry queue file has an unrecognized header".into()));
        }

        let nonce_bytes = &bytes[MAGIC.len()..MAGIC.len() + NONCE_LEN];
        let ciphertext = &bytes[MAGIC.len() + NONCE_LEN..];
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| PipelineError::Auth(401))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| PipelineError::Parse(format!("retry queue payload did not match schema: {e}")))
    }
}

fn random_nonce() -> [u8; NONCE_LEN] {
    use rand::RngCore;
    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_key() -> Vec<u8> {
        vec![7u8; 32]
    }

    fn sample_item() -> FailedKeyword {
        FailedKeyword {
            keyword: "tetris classic".into(),
            source_sitemap: "https://example.com/sitemap.xml".into(),
            first_failed_at_unix: 1_000,
            retry_count: 1,
            last_error: "server error: status 503".into(),
            next_retry_at_unix: 2_000,
        }
    }

    #[test]
    fn rejects_keys_of_the_wrong_length() {
        let dir = tempdir().unwrap();
        let result = EncryptedStore::new(dir.path().join("failed_keywords.enc"), b"too-short");
        assert!(result.is_err());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = EncryptedStore::new(dir.path().join("failed_keywords.enc"), &sample_key()).unwrap();
        let items = vec![sample_item()];
        store.save(&items).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].keyword, "tetris classic");
    }

    #[test]
    fn load_with_missing_file_returns_empty() {
        let dir = tempdir().unwrap();
        let store = EncryptedStore::new(dir.path().join("nonexistent.enc"), &sample_key()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn load_with_wrong_key_returns_auth_error_not_partial_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failed_keywords.enc");
        let store = EncryptedStore::new(&path, &sample_key()).unwrap();
        store.save(&[sample_item()]).unwrap();

        let wrong_key_store = EncryptedStore::new(&path, &[9u8; 32]).unwrap();
        let result = wrong_key_store.load();
        assert!(matches!(result, Err(PipelineError::Auth(_))));
    }

    #[test]
    fn load_with_bad_header_returns_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.enc");
        std::fs::write(&path, b"not an encrypted file").unwrap();
        let store = EncryptedStore::new(&path, &sample_key()).unwrap();
        assert!(matches!(store.load(), Err(PipelineError::Parse(_))));
    }
}
