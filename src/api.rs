//! REST API server for powchain
//!
//! Exposes the ledger over HTTP: read the chain, submit transactions, and
//! mine the pending pool into a new block.

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::{is_chain_valid, Block, Blockchain};
use crate::config::MiningConfig;
use crate::error::ChainError;
use crate::miner::ProofOfWork;
use crate::transaction::Transaction;

/// Node state shared by every handler
#[derive(Clone)]
pub struct Node {
    pub blockchain: Arc<RwLock<Blockchain>>,
    node_id: String,
    pow: ProofOfWork,
    reward: f64,
    mining_timeout: Option<Duration>,
    // One proof search at a time
    mining_lock: Arc<Mutex<()>>,
    blocks_mined: Arc<AtomicU64>,
}

impl Node {
    /// Create a new node owning `blockchain`
    pub fn new(blockchain: Blockchain, mining: &MiningConfig) -> crate::error::Result<Self> {
        Self::new_shared(Arc::new(RwLock::new(blockchain)), mining)
    }

    /// Create a node over a ledger that other tasks also hold.
    pub fn new_shared(
        blockchain: Arc<RwLock<Blockchain>>,
        mining: &MiningConfig,
    ) -> crate::error::Result<Self> {
        let node_id = match &mining.miner_address {
            Some(address) => address.clone(),
            None => generate_node_identifier(),
        };
        // Rewards are paid to `node_id`, so it must be a valid recipient.
        Transaction::reward(node_id.as_str(), mining.reward)?;

        Ok(Self {
            blockchain,
            node_id,
            pow: mining.proof_of_work()?,
            reward: mining.reward,
            mining_timeout: mining.timeout(),
            mining_lock: Arc::new(Mutex::new(())),
            blocks_mined: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Recipient of this node's mining rewards
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::Relaxed)
    }

    /// Mine the pending pool into a new block.
    ///
    /// The proof search runs on a blocking thread without holding the ledger
    /// lock, so submissions and reads continue meanwhile. Reward, linkage and
    /// append then happen under a single write lock.
    pub async fn mine(&self) -> Result<Block, ApiError> {
        let _guard = self.mining_lock.lock().await;

        loop {
            let job = self.blockchain.read().await.mining_job()?;

            let started = Instant::now();
            let proof = self.search_proof(job.last_proof).await?;

            let mut bc = self.blockchain.write().await;
            match bc.seal(job, proof, &self.node_id, self.reward) {
                Ok(block) => {
                    let block = block.clone();
                    self.blocks_mined.fetch_add(1, Ordering::SeqCst);
                    tracing::info!(
                        index = block.index,
                        proof = block.proof,
                        transactions = block.transactions.len(),
                        duration_ms = %started.elapsed().as_millis(),
                        "block mined"
                    );
                    return Ok(block);
                }
                Err(ChainError::StaleJob) => {
                    tracing::warn!(tip_index = job.tip_index, "chain tip moved during proof search, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn search_proof(&self, last_proof: u64) -> Result<u64, ApiError> {
        let pow = self.pow;
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let mut task =
            tokio::task::spawn_blocking(move || pow.find_proof_cancellable(last_proof, &flag));

        let joined = match self.mining_timeout {
            None => task.await,
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(timeout_ms = %limit.as_millis(), "proof search timed out");
                    cancel.store(true, Ordering::Relaxed);
                    task.await
                }
            },
        };

        let proof = joined
            .map_err(|e| ApiError::InternalError(format!("Proof search failed: {}", e)))??;
        Ok(proof)
    }
}

/// 32 hex characters from 16 random bytes
pub fn generate_node_identifier() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e) => match &e {
                ChainError::InvalidTransaction(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                ChainError::NothingToMine | ChainError::InvalidChain(_) => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                ChainError::BlockNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
                ChainError::StaleJob => (StatusCode::CONFLICT, e.to_string()),
                ChainError::MiningCancelled => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            },
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = %status.as_u16(), error = %message, "api.error");
        } else {
            tracing::debug!(status = %status.as_u16(), error = %message, "api.rejected");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of `POST /transactions/new`. Unknown fields are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTransactionRequest {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<f64>,
}

impl NewTransactionRequest {
    pub fn into_transaction(self) -> Result<Transaction, ApiError> {
        match (self.sender, self.recipient, self.amount) {
            (Some(sender), Some(recipient), Some(amount)) => {
                Ok(Transaction::new(sender, recipient, amount)?)
            }
            _ => Err(ApiError::InvalidInput("Missing values".to_string())),
        }
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

#[derive(Serialize)]
pub struct ValidityResponse {
    pub valid: bool,
    pub length: usize,
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints
pub fn build_api_router(node: Arc<Node>) -> Router {
    // Browser dashboards talk to the node from another origin
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/", get(home))
        // Chain endpoints
        .route("/chain", get(get_chain))
        .route("/chain/valid", get(validate_chain))
        .route("/block/:index", get(get_block))
        // Transaction endpoints
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/pending", get(get_pending))
        // Mining
        .route("/mine", get(mine))
        // System
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

/// Serve the API on `addr` until the process is stopped.
pub async fn run_api_server(node: Arc<Node>, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(node.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        %addr,
        node_id = %node.node_id(),
        difficulty = node.proof_of_work().difficulty(),
        "API server listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn home() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to the Blockchain API!".to_string(),
    })
}

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let length = node.blockchain.read().await.len();
    Json(serde_json::json!({
        "status": "healthy",
        "node_id": node.node_id(),
        "length": length,
        "blocks_mined": node.blocks_mined(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_chain(State(node): State<Arc<Node>>) -> Json<ChainResponse> {
    let blockchain = node.blockchain.read().await;
    Json(ChainResponse {
        chain: blockchain.chain().to_vec(),
        length: blockchain.len(),
    })
}

async fn validate_chain(State(node): State<Arc<Node>>) -> Json<ValidityResponse> {
    let blockchain = node.blockchain.read().await;
    Json(ValidityResponse {
        valid: is_chain_valid(blockchain.chain(), node.proof_of_work()),
        length: blockchain.len(),
    })
}

async fn get_block(
    State(node): State<Arc<Node>>,
    Path(index): Path<u64>,
) -> Result<Json<Block>, ApiError> {
    let blockchain = node.blockchain.read().await;
    Ok(Json(blockchain.block(index)?.clone()))
}

async fn new_transaction(
    State(node): State<Arc<Node>>,
    payload: Result<Json<NewTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(request) = payload?;
    let tx = request.into_transaction()?;

    let index = node
        .blockchain
        .write()
        .await
        .new_transaction(tx.sender, tx.recipient, tx.amount)?;

    tracing::debug!(index, "transaction queued");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("Transaction will be added to Block {}", index),
        }),
    ))
}

async fn get_pending(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let blockchain = node.blockchain.read().await;
    let transactions = blockchain.pending();
    Json(serde_json::json!({
        "count": transactions.len(),
        "transactions": transactions
    }))
}

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    let block = node.mine().await?;

    Ok(Json(MineResponse {
        message: "New Block Mined!".to_string(),
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}
