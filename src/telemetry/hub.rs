use std::{net::SocketAddr, sync::Arc};

use log::{debug, info, warn};
use serde_json::Value;
use tokio::{
    net::{TcpListener, ToSocketAddrs},
    sync::broadcast::error::RecvError,
    task::JoinHandle,
};

use crate::{
    error::Result,
    network::{socket::Socket, StoreFrame},
};

use super::store::{MemoryStore, PathWatch, StoreBackend};

/// Shares one [MemoryStore] with every client that connects over tcp.
pub struct TelemetryHub {
    store: Arc<MemoryStore>,
    listener: TcpListener,
}

impl TelemetryHub {
    pub async fn bind(addr: impl ToSocketAddrs, store: Arc<MemoryStore>) -> Result<TelemetryHub> {
        let listener = TcpListener::bind(addr).await?;
        info!("Telemetry hub bound to {}", listener.local_addr()?);
        Ok(Self { store, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        self.store.clone()
    }

    /// Accepts clients until the listener fails
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let socket = match Socket::new(stream) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Could not set up connection from {}: {}", peer, e);
                    continue;
                }
            };
            info!("Telemetry hub link {} -> {}", socket.local_addr(), peer);
            tokio::spawn(Self::serve(self.store.clone(), socket));
        }
    }

    /// Spawns [TelemetryHub::run] and returns the address it's listening on
    pub fn spawn(self) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
        let addr = self.local_addr()?;
        Ok((addr, tokio::spawn(self.run())))
    }

    async fn serve(store: Arc<MemoryStore>, socket: Socket) {
        let mut forwarders: Vec<JoinHandle<()>> = vec![];

        loop {
            let frame = match socket.read_frame().await {
                Ok(frame) => frame,
                Err(e) => {
                    info!("Client {} disconnected: {}", socket.peer_addr(), e);
                    break;
                }
            };

            match frame {
                StoreFrame::Set { id, path, json } => {
                    let error = match serde_json::from_str::<Value>(&json) {
                        Ok(value) => store.set(&path, value).await.err().map(|e| e.to_string()),
                        Err(e) => Some(format!("undecodable document: {}", e)),
                    };
                    if socket.write_frame(&StoreFrame::Ack { id, error }).await.is_err() {
                        break;
                    }
                }
                StoreFrame::Watch { path } => match store.watch(&path).await {
                    Ok(watch) => {
                        debug!("Client {} watching {}", socket.peer_addr(), path);
                        forwarders.push(tokio::spawn(Self::forward(socket.clone(), path, watch)));
                    }
                    Err(e) => warn!("Could not watch {} for {}: {}", path, socket.peer_addr(), e),
                },
                other => debug!("Ignoring unexpected frame from {}: {:?}", socket.peer_addr(), other),
            }
        }

        for forwarder in forwarders {
            forwarder.abort();
        }
    }

    async fn forward(socket: Socket, path: String, watch: PathWatch) {
        let PathWatch {
            snapshot,
            mut updates,
        } = watch;

        if let Some(value) = snapshot {
            if Self::push(&socket, &path, &value).await.is_err() {
                return;
            }
        }
        loop {
            let value = match updates.recv().await {
                Ok(v) => v,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("{} fell behind on {}, {} updates skipped", socket.peer_addr(), path, skipped);
                    continue;
                }
                Err(RecvError::Closed) => return,
            };
            if Self::push(&socket, &path, &value).await.is_err() {
                return;
            }
        }
    }

    async fn push(socket: &Socket, path: &str, value: &Value) -> Result<()> {
        socket
            .write_frame(&StoreFrame::Update {
                path: path.to_string(),
                json: value.to_string(),
            })
            .await
    }
}
