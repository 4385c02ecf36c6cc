//! Durable cart persistence.
//!
//! The cart survives page reloads and navigation by serializing the order
//! state to a single JSON document under one well-known location after
//! every mutation. Corruption is never fatal: a document that fails to
//! parse is logged and treated as absent, and the flow restarts from an
//! empty cart. A failed save loses durability only - the in-memory state
//! stays authoritative.
//!
//! The durable store is owned by one session at a time; concurrent
//! sessions may diverge and the last write wins (documented limitation).

use crate::types::OrderState;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

/// Errors from the durable cart store
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing store failed
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the order state failed
    #[error("storage serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable store for the order state
///
/// `load` distinguishes absent from corrupt: corrupt documents are logged
/// and reported as absent so the flow never crashes on a bad cart.
pub trait CartStorage: Send + Sync {
    /// Load the persisted order state, if any
    ///
    /// Returns `Ok(None)` when nothing was persisted yet or the persisted
    /// document is corrupt (logged, not surfaced).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] only for I/O failures.
    fn load(&self) -> Result<Option<OrderState>, StorageError>;

    /// Persist the order state, replacing any previous document
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the document cannot be written; the
    /// caller's in-memory state is unaffected either way.
    fn save(&self, state: &OrderState) -> Result<(), StorageError>;

    /// Remove the persisted document (order completed or cart reset)
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when removal fails for reasons other than
    /// the document already being gone.
    fn clear(&self) -> Result<(), StorageError>;

    /// Load the persisted state, falling back to the default empty cart
    ///
    /// Absence, corruption, and I/O failures all land on the default state;
    /// failures are logged, never surfaced.
    fn load_or_default(&self) -> OrderState {
        match self.load() {
            Ok(Some(state)) => state,
            Ok(None) => OrderState::default(),
            Err(error) => {
                tracing::warn!(%error, "failed to load cart state, starting empty");
                OrderState::default()
            },
        }
    }
}

/// File-backed store writing one JSON document
///
/// Saves go through a temp file and an atomic rename so a crash mid-write
/// can never leave a truncated document behind.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Store the cart document at the given path
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn temp_path(&self) -> PathBuf {
        let mut path = self.path.clone();
        path.set_extension("json.tmp");
        path
    }
}

impl CartStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<OrderState>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "corrupt cart document, ignoring");
                Ok(None)
            },
        }
    }

    fn save(&self, state: &OrderState) -> Result<(), StorageError> {
        let document = serde_json::to_string(state)?;
        let temp = self.temp_path();
        fs::write(&temp, document)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

/// In-memory store for tests
///
/// Holds the serialized document so the full serialization path is
/// exercised. Can be poisoned with a raw payload to simulate corruption,
/// or told to fail saves to simulate storage quota errors.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    document: Mutex<Option<String>>,
    fail_saves: std::sync::atomic::AtomicBool,
}

impl InMemoryStorage {
    /// An empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored document with a raw payload (e.g. garbage bytes)
    pub fn poison(&self, raw: &str) {
        let mut document = self
            .document
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *document = Some(raw.to_string());
    }

    /// Make every subsequent save fail
    pub fn fail_saves(&self) {
        self.fail_saves
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// The raw stored document, if any
    #[must_use]
    pub fn raw_document(&self) -> Option<String> {
        self.document
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl CartStorage for InMemoryStorage {
    fn load(&self) -> Result<Option<OrderState>, StorageError> {
        let document = self
            .document
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let Some(raw) = document.as_deref() else {
            return Ok(None);
        };

        match serde_json::from_str(raw) {
            Ok(state) => Ok(Some(state)),
            Err(error) => {
                tracing::warn!(%error, "corrupt cart document, ignoring");
                Ok(None)
            },
        }
    }

    fn save(&self, state: &OrderState) -> Result<(), StorageError> {
        if self.fail_saves.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::StorageFull,
                "simulated quota failure",
            )));
        }

        let serialized = serde_json::to_string(state)?;
        let mut document = self
            .document
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *document = Some(serialized);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut document = self
            .document
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *document = None;
        Ok(())
    }
}
