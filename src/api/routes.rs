//! API Routes
//!
//! HTTP endpoint definitions.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::domain::OperationContext;
use crate::error::{AppError, AppResult};
use crate::handlers::{CheckHandler, CheckResult, DepositCommand, DepositHandler};

/// Shared state of the facade
#[derive(Clone)]
pub struct AppState {
    pub deposits: Arc<DepositHandler>,
    pub checks: Arc<CheckHandler>,
}

impl AppState {
    pub fn new(deposits: DepositHandler, checks: CheckHandler) -> Self {
        Self {
            deposits: Arc::new(deposits),
            checks: Arc::new(checks),
        }
    }
}

// =========================================================================
// Request/Response types
// =========================================================================

/// Absent fields fall back to their zero values, so a body without an
/// amount is rejected by validation rather than by the parser.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    #[serde(default)]
    pub wallet_id: String,
    #[serde(default)]
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub wallet_id: String,
    pub balance: f64,
    pub above_threshold: bool,
}

impl From<CheckResult> for CheckResponse {
    fn from(result: CheckResult) -> Self {
        Self {
            wallet_id: result.wallet_id,
            balance: result.balance,
            above_threshold: result.above_threshold,
        }
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/deposit", post(deposit))
        .route("/check/:wallet_id", get(check))
}

// =========================================================================
// POST /deposit
// =========================================================================

/// Publish a deposit (or a withdrawal, depending on the service's stream).
/// The body is parsed whatever its content type.
async fn deposit(
    State(state): State<AppState>,
    context: Option<Extension<OperationContext>>,
    body: Bytes,
) -> AppResult<StatusCode> {
    let request: DepositRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    let context = context.map(|Extension(ctx)| ctx).unwrap_or_default();
    let command = DepositCommand::new(request.wallet_id, request.amount);

    state.deposits.execute(command, &context).await?;

    Ok(StatusCode::OK)
}

// =========================================================================
// GET /check/:wallet_id
// =========================================================================

/// Current balance and flag of a wallet
async fn check(
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Json<CheckResponse> {
    Json(state.checks.execute(&wallet_id).into())
}
