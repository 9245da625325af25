use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use super::model::{Cart, CartLineItem};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("cart storage i/o: {0}")]
    Io(#[from] io::Error),
    #[error("stored cart is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("cart storage quota exceeded")]
    QuotaExceeded,
}

/// Durable home of the local cart between sessions.
pub trait CartRepository: Send {
    fn load(&self) -> Result<Vec<CartLineItem>, RepositoryError>;
    fn save(&mut self, cart: &Cart) -> Result<(), RepositoryError>;
}

/// Stores the cart as a JSON array of line items.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous cart readable.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "cart.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CartRepository for JsonFileRepository {
    fn load(&self) -> Result<Vec<CartLineItem>, RepositoryError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&raw)?)
    }

    fn save(&mut self, cart: &Cart) -> Result<(), RepositoryError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let body = serde_json::to_vec_pretty(cart)?;
        let tmp = self.temp_path();
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), lines = cart.items().len(), "cart saved");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemorySlot {
    items: Vec<CartLineItem>,
    fail_saves: bool,
    saves: usize,
}

/// In-process repository. Clones share one slot, so a test can keep a handle
/// after boxing a copy into a store.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    slot: Arc<Mutex<MemorySlot>>,
}

impl MemoryRepository {
    pub fn with_items(items: Vec<CartLineItem>) -> Self {
        let repo = Self::default();
        repo.slot.lock().items = items;
        repo
    }

    /// Make subsequent saves fail as if storage were full.
    pub fn fail_saves(&self, fail: bool) {
        self.slot.lock().fail_saves = fail;
    }

    pub fn saved(&self) -> Vec<CartLineItem> {
        self.slot.lock().items.clone()
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> usize {
        self.slot.lock().saves
    }
}

impl CartRepository for MemoryRepository {
    fn load(&self) -> Result<Vec<CartLineItem>, RepositoryError> {
        Ok(self.slot.lock().items.clone())
    }

    fn save(&mut self, cart: &Cart) -> Result<(), RepositoryError> {
        let mut slot = self.slot.lock();
        if slot.fail_saves {
            return Err(RepositoryError::QuotaExceeded);
        }
        slot.items = cart.items().to_vec();
        slot.saves += 1;
        Ok(())
    }
}
