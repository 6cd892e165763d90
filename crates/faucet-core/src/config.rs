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

//! Service configuration and its validation.

use std::{path::PathBuf, time::Duration};

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use thiserror::Error;
use url::Url;

use crate::{
    aggregator::AggregationMode, allowlist::DEFAULT_ROSTER_TTL, scanner::StepPolicy,
    totals::MAX_LEADERBOARD_ENTRIES,
};

/// Blocks fetched concurrently by the direct transfer scan.
pub const DEFAULT_BLOCK_BATCH_SIZE: u64 = 40;
/// Number of most recent blocks scanned block by block.
pub const DEFAULT_TAIL_WINDOW: u64 = 600;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("faucet contract address must not be the zero address")]
    ZeroContractAddress,

    #[error("log scan steps must be positive")]
    ZeroStep,

    #[error("minimum log scan step {min_step} exceeds initial step {initial_step}")]
    StepOrder { initial_step: u64, min_step: u64 },

    #[error("block scan batch size must be positive")]
    ZeroBatchSize,

    #[error("tail window must be positive")]
    ZeroTailWindow,

    #[error("leaderboard size must be positive")]
    ZeroMaxEntries,
}

/// Tuning of the donor aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    pub step_policy: StepPolicy,
    pub block_batch_size: u64,
    pub tail_window: u64,
    pub max_entries: usize,
    pub mode: AggregationMode,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            step_policy: StepPolicy::default(),
            block_batch_size: DEFAULT_BLOCK_BATCH_SIZE,
            tail_window: DEFAULT_TAIL_WINDOW,
            max_entries: MAX_LEADERBOARD_ENTRIES,
            mode: AggregationMode::default(),
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let StepPolicy { initial_step, min_step } = self.step_policy;
        if initial_step == 0 || min_step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if min_step > initial_step {
            return Err(ConfigError::StepOrder { initial_step, min_step });
        }
        if self.block_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.tail_window == 0 {
            return Err(ConfigError::ZeroTailWindow);
        }
        if self.max_entries == 0 {
            return Err(ConfigError::ZeroMaxEntries);
        }
        Ok(())
    }
}

/// Everything the faucet service needs at construction.
#[derive(Debug, Clone)]
pub struct FaucetConfig {
    // Required.
    pub rpc_url: Url,
    pub contract_address: Address,

    // Optional.
    /// First block searched for donation logs.
    pub deploy_block: u64,
    /// Signs claim transactions; claims fail until it is set.
    pub operator_key: Option<PrivateKeySigner>,
    /// CSV roster of registered identities.
    pub allowlist_url: Option<Url>,
    pub allowlist_ttl: Duration,
    /// Baseline snapshot JSON that seeds leaderboard totals.
    pub base_snapshot_path: Option<PathBuf>,
    pub scan: ScanConfig,
}

impl FaucetConfig {
    pub fn new(rpc_url: Url, contract_address: Address) -> Self {
        Self {
            rpc_url,
            contract_address,
            deploy_block: 0,
            operator_key: None,
            allowlist_url: None,
            allowlist_ttl: DEFAULT_ROSTER_TTL,
            base_snapshot_path: None,
            scan: ScanConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contract_address == Address::ZERO {
            return Err(ConfigError::ZeroContractAddress);
        }
        self.scan.validate()
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    fn config() -> FaucetConfig {
        FaucetConfig::new(
            "http://localhost:8545".parse().unwrap(),
            address!("00000000000000000000000000000000000000fa"),
        )
    }

    #[test]
    fn defaults_are_valid() {
        let config = config();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.scan.step_policy, StepPolicy { initial_step: 20_000, min_step: 1_000 });
        assert_eq!(config.scan.block_batch_size, 40);
        assert_eq!(config.scan.tail_window, 600);
        assert_eq!(config.scan.max_entries, 50);
        assert_eq!(config.allowlist_ttl, Duration::from_secs(300));
    }

    #[test]
    fn rejects_bad_values() {
        let mut zero_contract = config();
        zero_contract.contract_address = Address::ZERO;
        assert_eq!(zero_contract.validate(), Err(ConfigError::ZeroContractAddress));

        let mut inverted = config();
        inverted.scan.step_policy = StepPolicy { initial_step: 10, min_step: 20 };
        assert_eq!(
            inverted.validate(),
            Err(ConfigError::StepOrder { initial_step: 10, min_step: 20 })
        );

        let mut no_batch = config();
        no_batch.scan.block_batch_size = 0;
        assert_eq!(no_batch.validate(), Err(ConfigError::ZeroBatchSize));

        let mut no_tail = config();
        no_tail.scan.tail_window = 0;
        assert_eq!(no_tail.validate(), Err(ConfigError::ZeroTailWindow));
    }
}
