use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};

use crate::error::{Result, TeleopError};

/// The current document at a path and a stream of every later one.
pub struct PathWatch {
    pub snapshot: Option<Value>,
    pub updates: broadcast::Receiver<Value>,
}

/// A shared key-value medium addressed by string paths.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Replaces the document at `path` and notifies its watchers.
    async fn set(&self, path: &str, value: Value) -> Result<()>;
    /// Starts watching `path`. No update may fall between the snapshot and the stream.
    async fn watch(&self, path: &str) -> Result<PathWatch>;
}

struct Slot {
    value: Option<Value>,
    tx: broadcast::Sender<Value>,
}

/// In-process store. Each path gets its own broadcast sender, so updates to one path
/// are delivered in the order they were applied.
pub struct MemoryStore {
    slots: Mutex<HashMap<String, Slot>>,
    capacity: usize,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> MemoryStore {
        MemoryStore {
            slots: Default::default(),
            capacity: capacity.max(1),
            offline: AtomicBool::new(false),
        }
    }

    /// Makes every following operation fail with [TeleopError::ChannelUnavailable] until reset.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn get(&self, path: &str) -> Option<Value> {
        self.slots.lock().await.get(path).and_then(|s| s.value.clone())
    }

    /// Every path currently holding a document, sorted
    pub async fn paths(&self) -> Vec<String> {
        let slots = self.slots.lock().await;
        let mut paths: Vec<String> = slots
            .iter()
            .filter(|(_, s)| s.value.is_some())
            .map(|(p, _)| p.clone())
            .collect();
        paths.sort();
        paths
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TeleopError::ChannelUnavailable("store is offline".into()));
        }
        Ok(())
    }

    fn slot<'a>(slots: &'a mut HashMap<String, Slot>, path: &str, capacity: usize) -> &'a mut Slot {
        slots.entry(path.to_string()).or_insert_with(|| Slot {
            value: None,
            tx: broadcast::channel(capacity).0,
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new(1024)
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.check_online()?;
        let mut slots = self.slots.lock().await;
        let slot = Self::slot(&mut slots, path, self.capacity);
        slot.value = Some(value.clone());
        // No receivers is not a failure, the value is still stored.
        let watchers = slot.tx.send(value).unwrap_or(0);
        debug!("Stored {} for {} watchers", path, watchers);
        Ok(())
    }

    async fn watch(&self, path: &str) -> Result<PathWatch> {
        self.check_online()?;
        let mut slots = self.slots.lock().await;
        let slot = Self::slot(&mut slots, path, self.capacity);
        Ok(PathWatch {
            snapshot: slot.value.clone(),
            updates: slot.tx.subscribe(),
        })
    }
}
