//! Peer messaging primitives
//!
//! The core does not speak wire bytes; peers are typed message envelopes
//! over bounded in-memory queues that a transport drains. Sends never
//! block: a full queue drops the message with a log line.

use crate::error::ChainError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Capacity of each peer's outbound queue and of the node inbound queue.
pub const QUEUE_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Block,
    Transaction,
    Ping,
    Pong,
    GetBlocks,
    Blocks,
}

/// A typed envelope exchanged between nodes. `data` is the bincode
/// encoding of the payload named by `msg_type`; the transport is trusted
/// to deliver whole envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub msg_type: MessageType,
    pub data: Vec<u8>,
    pub from: String,
    pub timestamp: i64,
}

impl Message {
    pub fn new(msg_type: MessageType, data: Vec<u8>, from: &str) -> Self {
        Message {
            msg_type,
            data,
            from: from.to_string(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ChainError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ChainError> {
        Ok(bincode::deserialize(data)?)
    }
}

/// A remote node as seen locally: an identity and a bounded outbound
/// queue whose receiving half belongs to the transport.
pub struct Peer {
    pub id: String,
    pub address: String,
    connected: bool,
    outbound: mpsc::Sender<Message>,
}

impl Peer {
    /// Creates a peer and hands back the transport side of its queue.
    pub fn new(id: &str, address: &str) -> (Self, mpsc::Receiver<Message>) {
        let (outbound, rx) = mpsc::channel(QUEUE_CAPACITY);
        let peer = Peer {
            id: id.to_string(),
            address: address.to_string(),
            connected: false,
            outbound,
        };
        (peer, rx)
    }

    pub fn connect(&mut self) {
        self.connected = true;
        info!(peer = %self.id, address = %self.address, "peer connected");
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
        info!(peer = %self.id, "peer disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Enqueues a message without blocking. Messages to disconnected
    /// peers or full queues are dropped.
    pub fn send(&self, msg: Message) {
        if !self.connected {
            return;
        }
        if self.outbound.try_send(msg).is_err() {
            warn!(peer = %self.id, "peer queue full, dropping message");
        }
    }
}
