use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use tokio::{
    net::ToSocketAddrs,
    sync::{broadcast, oneshot, Mutex},
    task::JoinHandle,
};

use crate::{
    error::{Result, TeleopError},
    network::{socket::Socket, StoreFrame},
};

use super::store::{PathWatch, StoreBackend};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Option<String>>>>>;
type Mirrors = Arc<Mutex<HashMap<String, Mirror>>>;

/// Local copy of a path the hub is pushing to us
struct Mirror {
    last: Option<Value>,
    tx: broadcast::Sender<Value>,
}

/// A [StoreBackend] living in a telemetry hub on the other end of a tcp connection.
///
/// Requests are not retried and the connection is not re-established: once it drops every
/// operation reports [TeleopError::ChannelUnavailable] and the caller decides what to do.
pub struct RemoteStore {
    socket: Socket,
    next_id: AtomicU64,
    pending: Pending,
    mirrors: Mirrors,
    connected: Arc<AtomicBool>,
    capacity: usize,
    reader: JoinHandle<()>,
}

impl RemoteStore {
    pub async fn connect(addr: impl ToSocketAddrs, capacity: usize) -> Result<Arc<RemoteStore>> {
        let socket = Socket::connect(addr).await?;
        info!("Connected to telemetry hub at {}", socket.peer_addr());

        let pending: Pending = Default::default();
        let mirrors: Mirrors = Default::default();
        let connected = Arc::new(AtomicBool::new(true));

        let reader = tokio::spawn(Self::listen(
            socket.clone(),
            pending.clone(),
            mirrors.clone(),
            connected.clone(),
        ));

        Ok(Arc::new(Self {
            socket,
            next_id: AtomicU64::new(1),
            pending,
            mirrors,
            connected,
            capacity: capacity.max(1),
            reader,
        }))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn listen(socket: Socket, pending: Pending, mirrors: Mirrors, connected: Arc<AtomicBool>) {
        loop {
            let frame = match socket.read_frame().await {
                Ok(frame) => frame,
                Err(TeleopError::MalformedPayload { reason, .. }) => {
                    warn!("Dropping malformed frame from hub: {}", reason);
                    continue;
                }
                Err(e) => {
                    info!("Telemetry hub connection {} closed: {}", socket.peer_addr(), e);
                    break;
                }
            };

            match frame {
                StoreFrame::Ack { id, error } => {
                    if let Some(tx) = pending.lock().await.remove(&id) {
                        let _ = tx.send(error);
                    }
                }
                StoreFrame::Update { path, json } => {
                    let value: Value = match serde_json::from_str(&json) {
                        Ok(v) => v,
                        Err(e) => {
                            warn!("Hub sent undecodable document for {}: {}", path, e);
                            continue;
                        }
                    };
                    if let Some(mirror) = mirrors.lock().await.get_mut(&path) {
                        mirror.last = Some(value.clone());
                        let _ = mirror.tx.send(value);
                    }
                }
                other => debug!("Ignoring unexpected frame from hub: {:?}", other),
            }
        }

        connected.store(false, Ordering::SeqCst);
        // Dropping the senders fails every waiter and closes every subscriber stream.
        pending.lock().await.clear();
        mirrors.lock().await.clear();
    }

    fn check_connected(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(TeleopError::ChannelUnavailable("hub connection closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreBackend for RemoteStore {
    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.check_connected()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            // The reader may have shut down between the first check and the insert.
            self.check_connected()?;
            pending.insert(id, tx);
        }

        let frame = StoreFrame::Set {
            id,
            path: path.to_string(),
            json: value.to_string(),
        };
        if let Err(e) = self.socket.write_frame(&frame).await {
            self.pending.lock().await.remove(&id);
            return Err(TeleopError::ChannelUnavailable(e.to_string()));
        }

        match rx.await {
            Ok(None) => Ok(()),
            Ok(Some(error)) => Err(TeleopError::ChannelUnavailable(error)),
            Err(_) => Err(TeleopError::ChannelUnavailable(
                "hub connection closed before acknowledging".into(),
            )),
        }
    }

    async fn watch(&self, path: &str) -> Result<PathWatch> {
        self.check_connected()?;
        let mut mirrors = self.mirrors.lock().await;
        if let Some(mirror) = mirrors.get(path) {
            return Ok(PathWatch {
                snapshot: mirror.last.clone(),
                updates: mirror.tx.subscribe(),
            });
        }

        let (tx, updates) = broadcast::channel(self.capacity);
        mirrors.insert(
            path.to_string(),
            Mirror {
                last: None,
                tx,
            },
        );
        // The hub answers with the current document as the first update.
        let frame = StoreFrame::Watch {
            path: path.to_string(),
        };
        if let Err(e) = self.socket.write_frame(&frame).await {
            mirrors.remove(path);
            return Err(TeleopError::ChannelUnavailable(e.to_string()));
        }
        Ok(PathWatch {
            snapshot: None,
            updates,
        })
    }
}

impl Drop for RemoteStore {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
