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

//! Donor leaderboard and snapshot computation.

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use alloy::primitives::{Address, U256};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    allowlist::IdentityResolverObj,
    chain::{ChainClientObj, ChainError},
    config::ScanConfig,
    scanner::{scan_blocks_for_direct_transfers, scan_logs_for_donations, ScanWindow},
    snapshot::{BaseSnapshot, SnapshotDonor},
    totals::{add_amount, merge_and_rank, normalize_address, AddressTotals, IdentityTotals},
};

/// Display name used when an address is not on the allowlist, in address-keyed mode.
pub const UNKNOWN_DISPLAY_NAME: &str = "unknown";
/// Bucket that collects every unresolved address, in identity-keyed mode.
pub const UNKNOWN_IDENTITY: &str = "Unknown";

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),
}

/// How leaderboard rows are keyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// One row per donor address; names are resolved after ranking.
    #[default]
    Address,
    /// One row per registered identity; addresses are resolved before merging.
    Identity,
}

impl FromStr for AggregationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "address" => Ok(Self::Address),
            "identity" => Ok(Self::Identity),
            other => Err(format!("unknown aggregation mode {other:?}, expected address or identity")),
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => f.write_str("address"),
            Self::Identity => f.write_str("identity"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub identity: String,
    /// Donor address; only set in address-keyed mode.
    pub address: Option<Address>,
    pub display_name: String,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaderboard {
    pub head: u64,
    pub mode: AggregationMode,
    pub entries: Vec<LeaderboardEntry>,
    /// Log windows that were abandoned during this run.
    pub skipped: Vec<ScanWindow>,
}

/// Computes donor totals for one faucet contract.
pub struct DonorAggregator {
    chain: ChainClientObj,
    resolver: IdentityResolverObj,
    contract: Address,
    deploy_block: u64,
    config: ScanConfig,
    baseline: Option<Arc<BaseSnapshot>>,
}

impl DonorAggregator {
    pub fn new(
        chain: ChainClientObj,
        resolver: IdentityResolverObj,
        contract: Address,
        deploy_block: u64,
        config: ScanConfig,
    ) -> Self {
        Self { chain, resolver, contract, deploy_block, config, baseline: None }
    }

    pub fn with_baseline(mut self, baseline: BaseSnapshot) -> Self {
        self.baseline = Some(Arc::new(baseline));
        self
    }

    pub fn mode(&self) -> AggregationMode {
        self.config.mode
    }

    /// First block of the tail that is scanned block by block.
    pub fn tail_start(&self, head: u64) -> u64 {
        let window_start = head.saturating_sub(self.config.tail_window.saturating_sub(1));
        let after_baseline =
            self.baseline.as_ref().map(|base| base.last_block.saturating_add(1)).unwrap_or(0);
        window_start.max(after_baseline).max(self.deploy_block)
    }

    /// Builds the leaderboard up to the current chain head.
    pub async fn leaderboard(&self) -> Result<Leaderboard, AggregateError> {
        let head = self.chain.block_number().await?;
        self.leaderboard_at(head).await
    }

    /// Builds the leaderboard up to `head`.
    ///
    /// With a baseline snapshot the baseline is merged with a block scan of the tail. Without one
    /// the history before the tail comes from donation logs instead. The two scanned ranges
    /// never overlap.
    pub async fn leaderboard_at(&self, head: u64) -> Result<Leaderboard, AggregateError> {
        let tail_from = self.tail_start(head);

        let (historical, skipped) = match &self.baseline {
            Some(_) => (AddressTotals::new(), Vec::new()),
            None if tail_from > self.deploy_block => {
                let scan = scan_logs_for_donations(
                    self.chain.as_ref(),
                    self.contract,
                    self.deploy_block,
                    tail_from - 1,
                    self.config.step_policy,
                )
                .await;
                (scan.totals, scan.skipped)
            }
            None => (AddressTotals::new(), Vec::new()),
        };

        let recent = if tail_from <= head {
            scan_blocks_for_direct_transfers(
                self.chain.as_ref(),
                self.contract,
                tail_from,
                head,
                self.config.block_batch_size,
            )
            .await?
        } else {
            AddressTotals::new()
        };

        let baseline = self.baseline.as_ref().map(|base| base.totals());
        tracing::debug!(
            "Merging {} baseline, {} historical and {} recent donors (tail {}-{})",
            baseline.as_ref().map_or(0, |b| b.len()),
            historical.len(),
            recent.len(),
            tail_from,
            head
        );

        let entries = match self.config.mode {
            AggregationMode::Address => {
                self.rank_by_address(baseline.as_ref(), &historical, &recent).await
            }
            AggregationMode::Identity => {
                self.rank_by_identity(baseline.as_ref(), &historical, &recent).await
            }
        };

        Ok(Leaderboard { head, mode: self.config.mode, entries, skipped })
    }

    async fn rank_by_address(
        &self,
        baseline: Option<&AddressTotals>,
        historical: &AddressTotals,
        recent: &AddressTotals,
    ) -> Vec<LeaderboardEntry> {
        let by_address = |totals: &AddressTotals| -> IdentityTotals {
            totals.iter().map(|(address, amount)| (normalize_address(address), *amount)).collect()
        };
        let ranked = merge_and_rank(
            baseline.map(by_address).as_ref(),
            &by_address(historical),
            &by_address(recent),
            self.config.max_entries,
        );

        let addresses: Vec<Address> =
            ranked.iter().filter_map(|record| Address::from_str(&record.identity).ok()).collect();
        let names = self.display_names(&addresses).await;

        ranked
            .into_iter()
            .map(|record| {
                let address = Address::from_str(&record.identity).ok();
                let display_name = address
                    .and_then(|address| names.get(&address).cloned())
                    .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string());
                LeaderboardEntry {
                    identity: record.identity,
                    address,
                    display_name,
                    amount: record.amount,
                }
            })
            .collect()
    }

    async fn rank_by_identity(
        &self,
        baseline: Option<&AddressTotals>,
        historical: &AddressTotals,
        recent: &AddressTotals,
    ) -> Vec<LeaderboardEntry> {
        let mut addresses: Vec<Address> = Vec::new();
        for totals in baseline.into_iter().chain([historical, recent]) {
            addresses.extend(totals.keys().copied());
        }
        addresses.sort();
        addresses.dedup();
        let names = self.display_names(&addresses).await;

        let by_identity = |totals: &AddressTotals| -> IdentityTotals {
            let mut keyed = IdentityTotals::new();
            for (address, amount) in totals {
                let name =
                    names.get(address).cloned().unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());
                add_amount(&mut keyed, name, *amount);
            }
            keyed
        };
        merge_and_rank(
            baseline.map(by_identity).as_ref(),
            &by_identity(historical),
            &by_identity(recent),
            self.config.max_entries,
        )
        .into_iter()
        .map(|record| LeaderboardEntry {
            display_name: record.identity.clone(),
            identity: record.identity,
            address: None,
            amount: record.amount,
        })
        .collect()
    }

    /// Names for `addresses`: the baseline's baked username first, then the resolver.
    /// Addresses whose lookup fails or comes back empty are left out.
    async fn display_names(&self, addresses: &[Address]) -> HashMap<Address, String> {
        let baked = self.baseline.as_ref().map(|base| base.usernames()).unwrap_or_default();
        let lookups = addresses.iter().map(|address| {
            let baked = baked.get(address).cloned();
            async move {
                if let Some(name) = baked {
                    return (*address, Some(name));
                }
                match self.resolver.resolve_identity(*address).await {
                    Ok(name) => (*address, name),
                    Err(err) => {
                        tracing::debug!("Could not resolve identity of {}: {}", address, err);
                        (*address, None)
                    }
                }
            }
        });
        join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(address, name)| Some((address, name?)))
            .collect()
    }

    /// Scans every donation log since deployment and returns a snapshot that can seed later runs.
    pub async fn snapshot(&self) -> Result<BaseSnapshot, AggregateError> {
        let head = self.chain.block_number().await?;
        let scan = scan_logs_for_donations(
            self.chain.as_ref(),
            self.contract,
            self.deploy_block,
            head,
            self.config.step_policy,
        )
        .await;
        if !scan.skipped.is_empty() {
            tracing::warn!("Snapshot at block {} is missing {} windows", head, scan.skipped.len());
        }

        let addresses: Vec<Address> = scan.totals.keys().copied().collect();
        let names = self.display_names(&addresses).await;

        let mut donors: Vec<SnapshotDonor> = scan
            .totals
            .into_iter()
            .map(|(address, amount_wei)| SnapshotDonor {
                address,
                username: names.get(&address).cloned(),
                amount_wei,
            })
            .collect();
        donors.sort_by(|a, b| b.amount_wei.cmp(&a.amount_wei));

        Ok(BaseSnapshot { last_block: head, donors })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy::primitives::{address, U256};
    use tracing_test::traced_test;

    use super::*;
    use crate::{
        chain::TransferTx,
        scanner::StepPolicy,
        test_utils::{MockChain, StaticResolver},
    };

    const FAUCET: Address = address!("00000000000000000000000000000000000000fa");
    const ALICE: Address = address!("00000000000000000000000000000000000000a1");
    const ALICE_ALT: Address = address!("00000000000000000000000000000000000000a2");
    const BOB: Address = address!("00000000000000000000000000000000000000b0");
    const CAROL: Address = address!("00000000000000000000000000000000000000c0");

    fn config(mode: AggregationMode) -> ScanConfig {
        ScanConfig {
            step_policy: StepPolicy { initial_step: 100, min_step: 10 },
            block_batch_size: 4,
            tail_window: 10,
            max_entries: 50,
            mode,
        }
    }

    fn transfer(from: Address, value: u64) -> TransferTx {
        TransferTx { from, to: Some(FAUCET), value: U256::from(value) }
    }

    fn resolver() -> Arc<StaticResolver> {
        Arc::new(StaticResolver::new([(ALICE, "alice"), (ALICE_ALT, "alice"), (BOB, "bob")]))
    }

    #[tokio::test]
    #[traced_test]
    async fn baseline_and_tail_are_summed() {
        let chain = MockChain::new(FAUCET, 1010).with_transfer(1005, transfer(ALICE, 3));
        let baseline: BaseSnapshot = serde_json::from_str(
            r#"{ "lastBlock": 1000, "donors": [
                { "address": "0x00000000000000000000000000000000000000a1", "amountWei": "5" }
            ] }"#,
        )
        .unwrap();
        let aggregator =
            DonorAggregator::new(Arc::new(chain), resolver(), FAUCET, 0, config(AggregationMode::Address))
                .with_baseline(baseline);

        assert_eq!(aggregator.tail_start(1010), 1001);
        let board = aggregator.leaderboard().await.unwrap();

        assert_eq!(board.head, 1010);
        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].identity, normalize_address(&ALICE));
        assert_eq!(board.entries[0].address, Some(ALICE));
        assert_eq!(board.entries[0].display_name, "alice");
        assert_eq!(board.entries[0].amount, U256::from(8));
    }

    #[tokio::test]
    async fn tail_only_scans_blocks_after_the_baseline() {
        let chain = Arc::new(MockChain::new(FAUCET, 1010));
        let baseline = BaseSnapshot { last_block: 1000, donors: vec![] };
        let aggregator = DonorAggregator::new(
            chain.clone(),
            resolver(),
            FAUCET,
            0,
            ScanConfig { tail_window: 600, ..config(AggregationMode::Address) },
        )
        .with_baseline(baseline);

        aggregator.leaderboard().await.unwrap();

        assert_eq!(chain.requested_blocks(), (1001..=1010).collect::<Vec<_>>());
        assert!(chain.requested_log_windows().is_empty());
    }

    #[tokio::test]
    async fn history_uses_logs_and_tail_uses_blocks_without_overlap() {
        let chain = Arc::new(
            MockChain::new(FAUCET, 200)
                .with_donation(50, BOB, U256::from(10))
                .with_donation(195, BOB, U256::from(1_000))
                .with_transfer(195, transfer(BOB, 1_000))
                .with_transfer(199, transfer(CAROL, 4)),
        );
        let aggregator = DonorAggregator::new(
            chain.clone(),
            resolver(),
            FAUCET,
            20,
            config(AggregationMode::Address),
        );

        let board = aggregator.leaderboard().await.unwrap();

        let windows = chain.requested_log_windows();
        assert_eq!(windows.first().map(|w| w.from_block), Some(20));
        assert_eq!(windows.last().map(|w| w.to_block), Some(190));
        assert_eq!(chain.requested_blocks(), (191..=200).collect::<Vec<_>>());

        // The donation at block 195 is only counted once, from the block scan.
        assert_eq!(board.entries[0].identity, normalize_address(&BOB));
        assert_eq!(board.entries[0].amount, U256::from(1_010));
        assert_eq!(board.entries[1].display_name, UNKNOWN_DISPLAY_NAME);
        assert_eq!(board.entries[1].amount, U256::from(4));
    }

    #[tokio::test]
    async fn identity_mode_combines_addresses_and_unknowns() {
        const DAVE: Address = address!("00000000000000000000000000000000000000d0");
        let chain = MockChain::new(FAUCET, 9)
            .with_transfer(1, transfer(ALICE, 2))
            .with_transfer(2, transfer(ALICE_ALT, 3))
            .with_transfer(3, transfer(CAROL, 1))
            .with_transfer(4, transfer(DAVE, 1))
            .with_transfer(5, transfer(BOB, 4));
        let aggregator = DonorAggregator::new(
            Arc::new(chain),
            resolver(),
            FAUCET,
            0,
            config(AggregationMode::Identity),
        );

        let board = aggregator.leaderboard().await.unwrap();

        let rows: Vec<(&str, U256)> =
            board.entries.iter().map(|e| (e.identity.as_str(), e.amount)).collect();
        assert_eq!(
            rows,
            vec![("alice", U256::from(5)), ("bob", U256::from(4)), ("Unknown", U256::from(2))]
        );
        assert!(board.entries.iter().all(|e| e.address.is_none()));
    }

    #[tokio::test]
    async fn failing_resolver_falls_back_to_unknown() {
        let chain = MockChain::new(FAUCET, 5).with_transfer(2, transfer(ALICE, 2));
        let aggregator = DonorAggregator::new(
            Arc::new(chain),
            Arc::new(StaticResolver::failing()),
            FAUCET,
            0,
            config(AggregationMode::Address),
        );

        let board = aggregator.leaderboard().await.unwrap();
        assert_eq!(board.entries[0].display_name, UNKNOWN_DISPLAY_NAME);
    }

    #[tokio::test]
    async fn block_scan_failure_fails_the_run() {
        let chain = MockChain::new(FAUCET, 30).with_failing_block(25);
        let aggregator = DonorAggregator::new(
            Arc::new(chain),
            resolver(),
            FAUCET,
            0,
            config(AggregationMode::Address),
        );

        assert!(matches!(aggregator.leaderboard().await, Err(AggregateError::Chain(_))));
    }

    #[tokio::test]
    async fn leaderboard_is_capped() {
        let mut chain = MockChain::new(FAUCET, 0);
        for i in 0..80u64 {
            let mut raw = [0u8; 20];
            raw[12..].copy_from_slice(&(i + 1).to_be_bytes());
            chain = chain.with_transfer(0, transfer(Address::from(raw), i + 1));
        }
        let aggregator = DonorAggregator::new(
            Arc::new(chain),
            resolver(),
            FAUCET,
            0,
            config(AggregationMode::Address),
        );

        let board = aggregator.leaderboard().await.unwrap();
        assert_eq!(board.entries.len(), 50);
        assert_eq!(board.entries[0].amount, U256::from(80));
        assert!(board.entries.windows(2).all(|w| w[0].amount >= w[1].amount));
    }

    #[tokio::test]
    async fn snapshot_covers_full_history() {
        let chain = MockChain::new(FAUCET, 500)
            .with_donation(10, ALICE, U256::from(1))
            .with_donation(400, BOB, U256::from(9))
            .with_donation(401, ALICE, U256::from(2));
        let aggregator = DonorAggregator::new(
            Arc::new(chain),
            resolver(),
            FAUCET,
            0,
            config(AggregationMode::Address),
        );

        let snapshot = aggregator.snapshot().await.unwrap();

        assert_eq!(snapshot.last_block, 500);
        assert_eq!(snapshot.donors.len(), 2);
        assert_eq!(snapshot.donors[0].address, BOB);
        assert_eq!(snapshot.donors[0].username.as_deref(), Some("bob"));
        assert_eq!(snapshot.donors[1].amount_wei, U256::from(3));
    }

    #[test]
    fn parses_aggregation_mode() {
        assert_eq!("Identity".parse::<AggregationMode>(), Ok(AggregationMode::Identity));
        assert_eq!("address".parse::<AggregationMode>(), Ok(AggregationMode::Address));
        assert!("wallet".parse::<AggregationMode>().is_err());
    }
}
