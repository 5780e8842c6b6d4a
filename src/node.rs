//! The long-running node actor
//!
//! A node drains an inbound message queue (the dispatcher), produces
//! blocks on a timer when its validator wins selection (the producer),
//! and re-broadcasts accepted blocks and transactions to its peers.
//! Bad messages are logged and dropped; nothing in the message path is
//! fatal.

use crate::blockchain::{Block, Blockchain};
use crate::consensus::{PoS, Validator};
use crate::error::ChainError;
use crate::network::{Message, MessageType, Peer, QUEUE_CAPACITY};
use crate::transaction::Transaction;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, info, warn};

pub struct Node {
    pub id: String,
    pub address: String,
    pub blockchain: Arc<RwLock<Blockchain>>,
    pub consensus: Arc<PoS>,
    peers: Arc<RwLock<HashMap<String, Peer>>>,
    validator: parking_lot::RwLock<Option<Validator>>,
    inbound_tx: mpsc::Sender<Message>,
    inbound_rx: parking_lot::Mutex<Option<mpsc::Receiver<Message>>>,
    stop_tx: watch::Sender<bool>,
}

impl Node {
    pub fn new(
        id: &str,
        address: &str,
        blockchain: Arc<RwLock<Blockchain>>,
        consensus: Arc<PoS>,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (stop_tx, _) = watch::channel(false);
        Node {
            id: id.to_string(),
            address: address.to_string(),
            blockchain,
            consensus,
            peers: Arc::new(RwLock::new(HashMap::new())),
            validator: parking_lot::RwLock::new(None),
            inbound_tx,
            inbound_rx: parking_lot::Mutex::new(Some(inbound_rx)),
            stop_tx,
        }
    }

    /// Registers the local validator with consensus and marks this node as
    /// a producer. Must be called before [`Node::start`].
    pub fn set_validator(&self, validator: Validator) -> Result<(), ChainError> {
        self.consensus.register_validator(validator.clone())?;
        *self.validator.write() = Some(validator);
        Ok(())
    }

    pub fn is_validator(&self) -> bool {
        self.validator.read().is_some()
    }

    /// Spawns the dispatcher and, when a validator is set, the producer.
    pub fn start(self: &Arc<Self>) {
        info!(node = %self.id, address = %self.address, "starting node");

        let Some(inbound) = self.inbound_rx.lock().take() else {
            warn!(node = %self.id, "node already started");
            return;
        };
        tokio::spawn(Arc::clone(self).dispatch_loop(inbound, self.stop_tx.subscribe()));

        if let Some(validator) = self.validator.read().clone() {
            tokio::spawn(Arc::clone(self).produce_loop(validator, self.stop_tx.subscribe()));
        }
    }

    /// Signals both tasks to exit. In-flight message handling completes;
    /// every mutator is atomic under its lock, so no partial state is
    /// left behind.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
        info!(node = %self.id, "node stopped");
    }

    /// Entry point for the transport: enqueues an inbound message without
    /// blocking, dropping it when the queue is full.
    pub fn receive_message(&self, msg: Message) {
        if self.inbound_tx.try_send(msg).is_err() {
            warn!(node = %self.id, "inbound queue full, dropping message");
        }
    }

    pub async fn add_peer(&self, peer: Peer) {
        info!(node = %self.id, peer = %peer.id, "peer added");
        self.peers.write().await.insert(peer.id.clone(), peer);
    }

    pub async fn remove_peer(&self, peer_id: &str) {
        if let Some(mut peer) = self.peers.write().await.remove(peer_id) {
            peer.disconnect();
            info!(node = %self.id, peer = %peer_id, "peer removed");
        }
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    async fn dispatch_loop(
        self: Arc<Self>,
        mut inbound: mpsc::Receiver<Message>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = stop_rx.changed() => return,
                msg = inbound.recv() => match msg {
                    Some(msg) => self.handle_message(msg).await,
                    None => return,
                },
            }
        }
    }

    async fn handle_message(&self, msg: Message) {
        match msg.msg_type {
            MessageType::Block => match Block::from_bytes(&msg.data) {
                Ok(block) => self.handle_block(block).await,
                Err(e) => warn!(error = %e, "failed to decode block message"),
            },
            MessageType::Transaction => match Transaction::from_bytes(&msg.data) {
                Ok(tx) => self.handle_transaction(tx).await,
                Err(e) => warn!(error = %e, "failed to decode transaction message"),
            },
            MessageType::Ping => self.handle_ping(&msg.from).await,
            MessageType::GetBlocks => self.handle_get_blocks(&msg.from).await,
            // Chain synchronization is out of scope; these are observed
            // but unused.
            MessageType::Pong | MessageType::Blocks => {
                debug!(node = %self.id, from = %msg.from, "ignoring message");
            }
        }
    }

    async fn handle_block(&self, block: Block) {
        info!(
            node = %self.id,
            index = block.index,
            validator = %block.validator,
            "received block"
        );

        let latest = { self.blockchain.read().await.latest_block().clone() };
        if let Err(e) = self.consensus.validate_block(&block, Some(&latest)) {
            warn!(error = %e, index = block.index, "rejecting block");
            return;
        }

        if let Err(e) = self.blockchain.write().await.add_block(block.clone()) {
            warn!(error = %e, index = block.index, "failed to add block");
            return;
        }

        info!(index = block.index, "block added to chain");
        self.broadcast_block(&block).await;
    }

    async fn handle_transaction(&self, tx: Transaction) {
        debug!(node = %self.id, id = %tx.id, "received transaction");

        let result = self.blockchain.write().await.add_transaction(tx.clone());
        match result {
            Ok(()) => self.broadcast_transaction(&tx).await,
            Err(e) => warn!(error = %e, id = %tx.id, "failed to add transaction"),
        }
    }

    async fn handle_ping(&self, from: &str) {
        let msg = Message::new(MessageType::Pong, Vec::new(), &self.id);
        self.send_to_peer(from, msg).await;
    }

    async fn handle_get_blocks(&self, from: &str) {
        let blocks = { self.blockchain.read().await.blocks.clone() };
        match bincode::serialize(&blocks) {
            Ok(data) => {
                let msg = Message::new(MessageType::Blocks, data, &self.id);
                self.send_to_peer(from, msg).await;
            }
            Err(e) => warn!(error = %e, "failed to encode chain"),
        }
    }

    async fn produce_loop(
        self: Arc<Self>,
        validator: Validator,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(self.consensus.block_time);
        loop {
            tokio::select! {
                _ = stop_rx.changed() => return,
                _ = ticker.tick() => self.try_produce_block(&validator).await,
            }
        }
    }

    /// One producer tick: skip unless a block interval has elapsed and
    /// selection lands on the local validator; otherwise build, sign,
    /// commit and broadcast the next block.
    async fn try_produce_block(&self, validator: &Validator) {
        let latest = { self.blockchain.read().await.latest_block().clone() };

        if !self.consensus.should_create_block(latest.timestamp) {
            return;
        }

        let selected = match self
            .consensus
            .select_validator(&latest.hash, Utc::now().timestamp())
        {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "validator selection failed");
                return;
            }
        };

        if selected.address != validator.address {
            return;
        }

        let mut block = { self.blockchain.read().await.create_block(&validator.address) };
        let Some(private_key) = &validator.private_key else {
            warn!(node = %self.id, "local validator has no signing key");
            return;
        };
        block.sign(private_key);

        if let Err(e) = self.blockchain.write().await.add_block(block.clone()) {
            warn!(error = %e, index = block.index, "failed to add produced block");
            return;
        }

        info!(
            index = block.index,
            validator = %validator.address,
            "block produced"
        );
        self.broadcast_block(&block).await;
    }

    pub async fn broadcast_block(&self, block: &Block) {
        let data = match block.to_bytes() {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "failed to encode block");
                return;
            }
        };
        self.broadcast(Message::new(MessageType::Block, data, &self.id))
            .await;
    }

    pub async fn broadcast_transaction(&self, tx: &Transaction) {
        let data = match tx.to_bytes() {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "failed to encode transaction");
                return;
            }
        };
        self.broadcast(Message::new(MessageType::Transaction, data, &self.id))
            .await;
    }

    async fn broadcast(&self, msg: Message) {
        let peers = self.peers.read().await;
        for peer in peers.values() {
            peer.send(msg.clone());
        }
    }

    async fn send_to_peer(&self, peer_id: &str, msg: Message) {
        let peers = self.peers.read().await;
        if let Some(peer) = peers.get(peer_id) {
            peer.send(msg);
        }
    }
}
