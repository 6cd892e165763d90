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
    extract::State,
    http::HeaderValue,
    response::Response,
    routing::get,
    Router,
};
use faucet_core::BaseSnapshot;

use crate::{
    handler::{handle_error, no_cache_json},
    models::{DonorEntry, ErrorResponse},
    state::AppState,
};

/// Number of log windows the scanner had to abandon while building the response.
pub const SKIPPED_WINDOWS_HEADER: &str = "x-skipped-windows";

/// Create donor routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/donors", get(get_donors))
        .route("/donors-snapshot", get(get_donors_snapshot))
}

/// GET /api/donors
/// Returns the donor leaderboard, highest total first
#[utoipa::path(
    get,
    path = "/api/donors",
    tag = "Donors",
    responses(
        (status = 200, description = "Top donors", body = Vec<DonorEntry>),
        (status = 500, description = "RPC failure during aggregation", body = ErrorResponse)
    )
)]
async fn get_donors(State(state): State<Arc<AppState>>) -> Response {
    match get_donors_impl(state).await {
        Ok((entries, skipped)) => {
            let mut res = no_cache_json(entries);
            if skipped > 0 {
                res.headers_mut().insert(SKIPPED_WINDOWS_HEADER, HeaderValue::from(skipped));
            }
            res
        }
        Err(err) => handle_error(err),
    }
}

async fn get_donors_impl(state: Arc<AppState>) -> anyhow::Result<(Vec<DonorEntry>, usize)> {
    let leaderboard = state.aggregator.leaderboard().await?;
    tracing::debug!(
        "Leaderboard at block {} has {} entries ({} mode)",
        leaderboard.head,
        leaderboard.entries.len(),
        leaderboard.mode
    );

    let entries = leaderboard
        .entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| DonorEntry::from_entry(i as u64 + 1, entry))
        .collect();

    Ok((entries, leaderboard.skipped.len()))
}

/// GET /api/donors-snapshot
/// Scans the full donation history and returns it in baseline snapshot format
#[utoipa::path(
    get,
    path = "/api/donors-snapshot",
    tag = "Donors",
    responses(
        (status = 200, description = "Baseline snapshot document", body = serde_json::Value),
        (status = 500, description = "RPC failure during the scan", body = ErrorResponse)
    )
)]
async fn get_donors_snapshot(State(state): State<Arc<AppState>>) -> Response {
    match get_donors_snapshot_impl(state).await {
        Ok(snapshot) => no_cache_json(snapshot),
        Err(err) => handle_error(err),
    }
}

async fn get_donors_snapshot_impl(state: Arc<AppState>) -> anyhow::Result<BaseSnapshot> {
    let snapshot = state.aggregator.snapshot().await?;
    tracing::info!(
        "Generated snapshot with {} donors up to block {}",
        snapshot.donors.len(),
        snapshot.last_block
    );
    Ok(snapshot)
}
