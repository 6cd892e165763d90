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

//! Core of the testnet faucet: donor aggregation over chain history, the allowlist roster and
//! claim authorization.

pub mod aggregator;
pub mod allowlist;
pub mod chain;
pub mod claim;
pub mod config;
pub mod contracts;
pub mod scanner;
pub mod snapshot;
pub mod totals;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregator::{
    AggregateError, AggregationMode, DonorAggregator, Leaderboard, LeaderboardEntry,
};
pub use allowlist::{Allowlist, AllowlistError, IdentityResolver, IdentityResolverObj, Roster};
pub use chain::{AlloyChainClient, ChainClient, ChainClientObj, ChainError, FaucetView};
pub use claim::{ClaimAuthorizer, ClaimError, ClaimRequest};
pub use config::{ConfigError, FaucetConfig, ScanConfig};
pub use scanner::{
    scan_blocks_for_direct_transfers, scan_logs_for_donations, LogScan, ScanWindow, StepPolicy,
};
pub use snapshot::{BaseSnapshot, SnapshotDonor, SnapshotError};
pub use totals::{ContributionRecord, MAX_LEADERBOARD_ENTRIES};
