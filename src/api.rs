//! REST API server for Meridian
//!
//! A thin axum router over the core: chain and transaction queries,
//! transaction submission, staking, validator listing and wallet
//! creation.

use axum::{
    extract::{Path, State},
    http::{self, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::crypto::KeyPair;
use crate::error::ChainError;
use crate::node::Node;
use crate::transaction::Transaction;
use crate::wallet::Wallet;

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::BlockchainError(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub fee: u64,
    pub private_key: String,
}

#[derive(Deserialize)]
pub struct StakeRequest {
    pub address: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: u64,
    pub stake: u64,
}

#[derive(Serialize)]
pub struct StakeResponse {
    pub address: String,
    pub stake: u64,
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_root(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let height = node.blockchain.read().await.height();
    Json(json!({
        "name": "Meridian Blockchain",
        "version": env!("CARGO_PKG_VERSION"),
        "height": height,
    }))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn get_blocks(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let blocks = node.blockchain.read().await.blocks.clone();
    Json(blocks)
}

async fn get_block(
    State(node): State<Arc<Node>>,
    Path(index): Path<String>,
) -> Result<Response, ApiError> {
    let index: u64 = index
        .parse()
        .map_err(|_| ApiError::InvalidInput("invalid block index".to_string()))?;

    let bc = node.blockchain.read().await;
    let block = bc
        .block_by_index(index)
        .ok_or_else(|| ApiError::NotFound(format!("block {} not found", index)))?;
    Ok(Json(block.clone()).into_response())
}

async fn get_pending_transactions(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let pending = node.blockchain.read().await.pending_transactions().to_vec();
    Json(pending)
}

/// Builds, signs and admits a transaction, then broadcasts it to peers.
async fn submit_transaction(
    State(node): State<Arc<Node>>,
    Json(req): Json<TransactionRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let keypair = KeyPair::from_private_hex(&req.private_key)
        .map_err(|e| ApiError::InvalidInput(format!("invalid private key: {}", e)))?;

    let mut tx = Transaction::new(&req.from, &req.to, req.amount, req.fee);
    tx.sign(&keypair);

    node.blockchain.write().await.add_transaction(tx.clone())?;
    node.broadcast_transaction(&tx).await;

    Ok(Json(tx))
}

async fn get_transaction(
    State(node): State<Arc<Node>>,
    Path(id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    let bc = node.blockchain.read().await;
    let tx = bc
        .transaction_by_id(&id)
        .ok_or_else(|| ApiError::NotFound(format!("transaction {} not found", id)))?;
    Ok(Json(tx.clone()))
}

async fn get_balance(
    State(node): State<Arc<Node>>,
    Path(address): Path<String>,
) -> impl IntoResponse {
    let bc = node.blockchain.read().await;
    Json(BalanceResponse {
        balance: bc.state.balance(&address),
        stake: bc.state.stake(&address),
        address,
    })
}

async fn add_stake(
    State(node): State<Arc<Node>>,
    Json(req): Json<StakeRequest>,
) -> Result<Json<StakeResponse>, ApiError> {
    let mut bc = node.blockchain.write().await;
    bc.state.add_stake(&req.address, req.amount)?;
    Ok(Json(StakeResponse {
        stake: bc.state.stake(&req.address),
        address: req.address,
    }))
}

async fn get_validators(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(node.consensus.validator_infos())
}

async fn create_wallet() -> Result<Json<Wallet>, ApiError> {
    let wallet =
        Wallet::new().map_err(|e| ApiError::InternalError(format!("wallet creation: {}", e)))?;
    Ok(Json(wallet))
}

// ============================================================================
// API Server
// ============================================================================

/// Builds the API router with all endpoints (also used by tests).
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![http::Method::GET, http::Method::POST])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(get_root))
        .route("/health", get(health_check))
        .route("/blocks", get(get_blocks))
        .route("/block/:index", get(get_block))
        .route("/transactions", get(get_pending_transactions).post(submit_transaction))
        .route("/transaction/:id", get(get_transaction))
        .route("/balance/:address", get(get_balance))
        .route("/stake", post(add_stake))
        .route("/validators", get(get_validators))
        .route("/wallet/new", post(create_wallet))
        .with_state(node)
        .layer(cors)
}

/// Binds and runs the API server until the process exits.
pub async fn run_api_server(
    node: Arc<Node>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let router = build_api_router(node);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
