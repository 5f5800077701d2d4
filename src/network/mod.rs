use serde::{Deserialize, Serialize};

pub mod socket;

/// Largest frame either side will accept
pub const MAX_FRAME_SIZE: u32 = 1 << 20;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
/// Frames exchanged between a [crate::telemetry::remote::RemoteStore] and the hub.
///
/// Documents travel as JSON text because bincode cannot carry a self-describing value.
pub enum StoreFrame {
    /// Client -> hub: replace the document at `path`
    Set { id: u64, path: String, json: String },
    /// Hub -> client: outcome of the `Set` with the same id
    Ack { id: u64, error: Option<String> },
    /// Client -> hub: push the current and every later document at `path`
    Watch { path: String },
    /// Hub -> client: a document for a watched path
    Update { path: String, json: String },
}
