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

use alloy::primitives::Address;
use anyhow::{Context, Result};
use faucet_core::{
    Allowlist, AlloyChainClient, BaseSnapshot, ChainClientObj, ClaimAuthorizer, DonorAggregator,
    FaucetConfig, IdentityResolverObj, ScanConfig,
};

/// Shared state handed to every request handler.
pub struct AppState {
    pub chain: ChainClientObj,
    pub aggregator: DonorAggregator,
    pub claims: ClaimAuthorizer,
    pub contract: Address,
    pub deploy_block: u64,
}

impl AppState {
    /// Connects to the RPC endpoint, prepares the allowlist and loads the baseline snapshot.
    pub fn new(config: &FaucetConfig) -> Result<Self> {
        config.validate().context("Invalid faucet configuration")?;

        let chain: ChainClientObj = Arc::new(AlloyChainClient::new(
            config.rpc_url.clone(),
            config.contract_address,
            config.operator_key.clone(),
        ));
        let resolver: IdentityResolverObj =
            Arc::new(Allowlist::new(config.allowlist_url.clone(), config.allowlist_ttl));

        let baseline = match &config.base_snapshot_path {
            Some(path) => {
                let snapshot = BaseSnapshot::load(path).with_context(|| {
                    format!("Failed to load baseline snapshot from {}", path.display())
                })?;
                tracing::info!(
                    "Loaded baseline snapshot with {} donors up to block {}",
                    snapshot.donors.len(),
                    snapshot.last_block
                );
                Some(snapshot)
            }
            None => None,
        };

        Ok(Self::from_parts(
            chain,
            resolver,
            config.contract_address,
            config.deploy_block,
            config.scan,
            baseline,
        ))
    }

    pub fn from_parts(
        chain: ChainClientObj,
        resolver: IdentityResolverObj,
        contract: Address,
        deploy_block: u64,
        scan: ScanConfig,
        baseline: Option<BaseSnapshot>,
    ) -> Self {
        let mut aggregator =
            DonorAggregator::new(chain.clone(), resolver.clone(), contract, deploy_block, scan);
        if let Some(baseline) = baseline {
            aggregator = aggregator.with_baseline(baseline);
        }
        let claims = ClaimAuthorizer::new(chain.clone(), resolver, contract);

        Self { chain, aggregator, claims, contract, deploy_block }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use alloy::primitives::address;

    use super::*;

    fn config() -> FaucetConfig {
        FaucetConfig::new(
            "http://localhost:8545".parse().unwrap(),
            address!("00000000000000000000000000000000000000fa"),
        )
    }

    #[test]
    fn loads_baseline_snapshot_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "lastBlock": "0x1f4", "donors": [] }}"#).unwrap();

        let mut config = config();
        config.base_snapshot_path = Some(file.path().to_path_buf());

        let state = AppState::new(&config).unwrap();
        assert_eq!(state.aggregator.tail_start(1_000), 501);
    }

    #[test]
    fn missing_baseline_file_is_fatal() {
        let mut config = config();
        config.base_snapshot_path = Some("/nonexistent/base-donors.json".into());

        let err = AppState::new(&config).err().unwrap();
        assert!(format!("{err:#}").contains("Failed to load baseline snapshot"));
    }
}
