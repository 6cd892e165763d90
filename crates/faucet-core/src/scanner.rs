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

//! Chunked log scanning with adaptive step size, and direct block scanning.

use alloy::{
    primitives::{Address, B256, U256},
    sol_types::SolEvent,
};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::{
    chain::{ChainClient, ChainError, RawLog},
    contracts::IFaucet,
    totals::{add_amount, AddressTotals},
};

/// Inclusive block range scanned as one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanWindow {
    pub from_block: u64,
    pub to_block: u64,
}

impl ScanWindow {
    /// Returns `None` when `from_block > to_block`.
    pub fn new(from_block: u64, to_block: u64) -> Option<Self> {
        (from_block <= to_block).then_some(Self { from_block, to_block })
    }

    pub fn block_count(&self) -> u64 {
        self.to_block - self.from_block + 1
    }
}

/// Step size bounds for [scan_logs_for_donations].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPolicy {
    /// Starting step, and the cap the step ramps back up to after throttling.
    pub initial_step: u64,
    /// Smallest step that is retried. A failing window at this size is abandoned.
    pub min_step: u64,
}

impl Default for StepPolicy {
    fn default() -> Self {
        Self { initial_step: 20_000, min_step: 1_000 }
    }
}

/// Cursor of one log scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStepState {
    pub current: u64,
    pub step: u64,
}

impl ScanStepState {
    fn window(&self, to_block: u64) -> ScanWindow {
        let end = self.current.saturating_add(self.step - 1).min(to_block);
        ScanWindow { from_block: self.current, to_block: end }
    }

    /// Moves past `window` and doubles the step up to `cap`. Returns false once the range is done.
    fn advance(&mut self, window: ScanWindow, to_block: u64, cap: u64) -> bool {
        self.step = self.step.saturating_mul(2).min(cap);
        self.skip(window, to_block)
    }

    fn skip(&mut self, window: ScanWindow, to_block: u64) -> bool {
        if window.to_block >= to_block {
            return false;
        }
        self.current = window.to_block + 1;
        true
    }
}

/// Result of a log scan: donor totals plus the windows that could not be fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogScan {
    pub totals: AddressTotals,
    pub skipped: Vec<ScanWindow>,
}

/// Decodes a `Donated(address indexed from, uint256 amount)` entry.
///
/// The donor is the low 20 bytes of the second topic and the amount is the raw big-endian
/// payload. Entries without a donor topic or with an oversized payload yield `None`.
pub fn decode_donation(log: &RawLog) -> Option<(Address, U256)> {
    let donor = log.topics.get(1).map(|topic| Address::from_word(*topic))?;
    let amount = U256::try_from_be_slice(&log.data)?;
    Some((donor, amount))
}

pub fn donated_topic() -> B256 {
    IFaucet::Donated::SIGNATURE_HASH
}

/// Scans `[from_block, to_block]` for donation events with an adaptive window size.
///
/// A successful window advances the cursor and doubles the step (capped at
/// `policy.initial_step`). A failed window is retried from the same cursor at half the step.
/// When the step can no longer be halved without going under `policy.min_step`, the window is
/// abandoned and recorded in [LogScan::skipped].
pub async fn scan_logs_for_donations<C>(
    chain: &C,
    contract: Address,
    from_block: u64,
    to_block: u64,
    policy: StepPolicy,
) -> LogScan
where
    C: ChainClient + ?Sized,
{
    let mut scan = LogScan::default();
    if from_block > to_block {
        return scan;
    }

    let initial_step = policy.initial_step.max(1);
    let min_step = policy.min_step.clamp(1, initial_step);
    let topic = donated_topic();
    let mut state = ScanStepState { current: from_block, step: initial_step };
    let mut events = 0usize;

    loop {
        let window = state.window(to_block);
        let more = match chain.logs(contract, topic, window).await {
            Ok(logs) => {
                for log in &logs {
                    if let Some((donor, amount)) = decode_donation(log) {
                        add_amount(&mut scan.totals, donor, amount);
                        events += 1;
                    }
                }
                state.advance(window, to_block, initial_step)
            }
            Err(err) if state.step > min_step => {
                state.step = (state.step / 2).max(min_step);
                tracing::debug!(
                    "getLogs failed for blocks {}-{} ({}), retrying with step {}",
                    window.from_block,
                    window.to_block,
                    err,
                    state.step
                );
                true
            }
            Err(err) => {
                tracing::warn!(
                    "Abandoning blocks {}-{} after failure at minimum step: {}",
                    window.from_block,
                    window.to_block,
                    err
                );
                scan.skipped.push(window);
                state.skip(window, to_block)
            }
        };
        if !more {
            break;
        }
    }

    tracing::info!(
        "Scanned blocks {}-{}: {} donation events from {} donors, {} windows skipped",
        from_block,
        to_block,
        events,
        scan.totals.len(),
        scan.skipped.len()
    );
    scan
}

/// Scans full blocks for plain value transfers into `contract`.
///
/// Blocks are fetched concurrently in batches of `batch_size`, batches run one after another.
/// Any failed fetch fails the whole scan.
pub async fn scan_blocks_for_direct_transfers<C>(
    chain: &C,
    contract: Address,
    from_block: u64,
    to_block: u64,
    batch_size: u64,
) -> Result<AddressTotals, ChainError>
where
    C: ChainClient + ?Sized,
{
    let mut totals = AddressTotals::new();
    if from_block > to_block {
        return Ok(totals);
    }

    let batch_size = batch_size.max(1);
    let mut batch_start = from_block;
    loop {
        let batch_end = batch_start.saturating_add(batch_size - 1).min(to_block);
        tracing::debug!("Fetching blocks {}-{}", batch_start, batch_end);

        let blocks =
            try_join_all((batch_start..=batch_end).map(|number| chain.block_transfers(number)))
                .await?;

        for tx in blocks.iter().flatten() {
            if tx.to == Some(contract) && tx.value > U256::ZERO {
                add_amount(&mut totals, tx.from, tx.value);
            }
        }

        if batch_end >= to_block {
            break;
        }
        batch_start = batch_end + 1;
    }

    Ok(totals)
}
