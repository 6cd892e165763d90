// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use faucet_core::{ChainError, ClaimError};

use crate::{
    handler::{error_response, handle_error, no_cache_json},
    models::{BalanceResponse, ClaimBody, ClaimResponse, DebugResponse, ErrorResponse},
    state::AppState,
    utils::format_ztc,
};

/// Create faucet routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/balance", get(get_balance))
        .route("/claim", post(post_claim))
        .route("/debug", get(get_debug))
}

/// GET /api/balance
/// Returns the native balance held by the faucet contract
#[utoipa::path(
    get,
    path = "/api/balance",
    tag = "Faucet",
    responses(
        (status = 200, description = "Faucet balance", body = BalanceResponse),
        (status = 500, description = "RPC failure", body = ErrorResponse)
    )
)]
async fn get_balance(State(state): State<Arc<AppState>>) -> Response {
    match get_balance_impl(state).await {
        Ok(response) => no_cache_json(response),
        Err(err) => handle_error(err),
    }
}

async fn get_balance_impl(state: Arc<AppState>) -> anyhow::Result<BalanceResponse> {
    let balance = state.chain.balance(state.contract).await?;
    Ok(BalanceResponse { balance: balance.to_string(), balance_formatted: format_ztc(balance) })
}

/// POST /api/claim
/// Checks eligibility and pays out to the requester
#[utoipa::path(
    post,
    path = "/api/claim",
    tag = "Faucet",
    request_body = ClaimBody,
    responses(
        (status = 200, description = "Payout submitted", body = ClaimResponse),
        (status = 400, description = "Malformed request, balance too high or faucet empty", body = ErrorResponse),
        (status = 403, description = "Address and identity are not on the allowlist", body = ErrorResponse),
        (status = 429, description = "Cooldown active", body = ErrorResponse),
        (status = 500, description = "Operator, allowlist or RPC failure", body = ErrorResponse)
    )
)]
async fn post_claim(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ClaimBody>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(body)) => body.into(),
        Err(rejection) => {
            tracing::debug!("Rejected claim body: {}", rejection);
            return claim_error_response(ClaimError::MissingFields);
        }
    };

    match state.claims.authorize(request).await {
        Ok(tx_hash) => no_cache_json(ClaimResponse { tx_hash: tx_hash.to_string() }),
        Err(err) => claim_error_response(err),
    }
}

/// Maps a claim failure onto its HTTP status.
pub fn claim_status(err: &ClaimError) -> StatusCode {
    match err {
        ClaimError::MissingFields
        | ClaimError::InvalidAddress
        | ClaimError::BalanceTooHigh
        | ClaimError::FaucetEmpty => StatusCode::BAD_REQUEST,
        ClaimError::NotAllowlisted => StatusCode::FORBIDDEN,
        ClaimError::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
        ClaimError::Allowlist(_) | ClaimError::Chain(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn claim_error_response(err: ClaimError) -> Response {
    let status = claim_status(&err);
    if err.is_rejection() {
        tracing::info!("Claim rejected: {}", err);
    } else if matches!(err, ClaimError::Chain(ChainError::NoSigner)) {
        tracing::warn!("Claim attempted without an operator key configured");
    } else {
        tracing::error!("Claim failed: {:?}", err);
    }

    let seconds_left = match err {
        ClaimError::CooldownActive { seconds_left } => Some(seconds_left),
        _ => None,
    };
    error_response(status, err.to_string(), Some(err.reason()), seconds_left)
}

/// GET /api/debug
/// Reports the contract and block range the service is working with
#[utoipa::path(
    get,
    path = "/api/debug",
    tag = "Faucet",
    responses(
        (status = 200, description = "Runtime diagnostics", body = DebugResponse)
    )
)]
async fn get_debug(State(state): State<Arc<AppState>>) -> Response {
    let current_block = match state.chain.block_number().await {
        Ok(head) => head.to_string(),
        Err(err) => {
            tracing::warn!("Failed to fetch block number: {}", err);
            format!("error: {}", err)
        }
    };

    no_cache_json(DebugResponse {
        contract_in_use: state.contract.to_string(),
        deploy_block: state.deploy_block,
        current_block,
        aggregation_mode: state.aggregator.mode().to_string(),
    })
}
