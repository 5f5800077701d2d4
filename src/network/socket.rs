use std::{net::SocketAddr, sync::Arc};

use log::{debug, trace};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream, ToSocketAddrs,
    },
    sync::{Mutex, MutexGuard},
};

use crate::error::{Result, TeleopError};

use super::{StoreFrame, MAX_FRAME_SIZE};

/// Maintains a tcp socket and sends and receives length prefixed [StoreFrame]s on it.
///
/// Either half can be used by its own task, clones share the same halves.
#[derive(Clone)]
pub struct Socket {
    rd: Arc<Mutex<OwnedReadHalf>>,
    wr: Arc<Mutex<OwnedWriteHalf>>,
    peer: SocketAddr,
    local: SocketAddr,
}

impl Socket {
    pub fn new(stream: TcpStream) -> Result<Socket> {
        let peer = stream.peer_addr()?;
        let local = stream.local_addr()?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable nagle on {}: {}", peer, e);
        }
        let (rd, wr) = stream.into_split();

        Ok(Self {
            rd: Arc::new(Mutex::new(rd)),
            wr: Arc::new(Mutex::new(wr)),
            peer,
            local,
        })
    }

    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Socket> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TeleopError::ChannelUnavailable(e.to_string()))?;
        Self::new(stream)
    }

    async fn get_reader(&self) -> MutexGuard<OwnedReadHalf> {
        self.rd.lock().await
    }
    async fn get_writer(&self) -> MutexGuard<OwnedWriteHalf> {
        self.wr.lock().await
    }

    /// Waits for the next complete frame. Fails when the peer hangs up.
    pub async fn read_frame(&self) -> Result<StoreFrame> {
        let mut rd = self.get_reader().await;
        let len = rd.read_u32().await?;
        if len > MAX_FRAME_SIZE {
            // The stream cannot be resynchronised past a frame we refuse to read.
            return Err(TeleopError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("frame of {} bytes exceeds {}", len, MAX_FRAME_SIZE),
            )));
        }
        let mut data = vec![0u8; len as usize];
        rd.read_exact(&mut data).await?;
        drop(rd);

        let frame = bincode::deserialize(&data).map_err(|e| TeleopError::malformed("<frame>", e))?;
        trace!("Frame from {}: {:?}", self.peer, frame);
        Ok(frame)
    }

    pub async fn write_frame(&self, frame: &StoreFrame) -> Result<()> {
        let data = bincode::serialize(frame).map_err(|e| TeleopError::malformed("<frame>", e))?;
        let mut wr = self.get_writer().await;
        wr.write_u32(data.len() as u32).await?;
        wr.write_all(&data).await?;
        wr.flush().await?;
        Ok(())
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }
}
