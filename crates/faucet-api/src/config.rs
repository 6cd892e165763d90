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

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use anyhow::{Context, Result};
use clap::Parser;
use faucet_core::{
    config::{DEFAULT_BLOCK_BATCH_SIZE, DEFAULT_TAIL_WINDOW},
    snapshot::parse_block_number,
    AggregationMode, FaucetConfig, ScanConfig, StepPolicy, MAX_LEADERBOARD_ENTRIES,
};
use url::Url;

/// Arguments for the faucet server.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// URL of the Ethereum RPC endpoint.
    #[clap(short, long, env)]
    pub rpc_url: Url,

    /// Address of the faucet contract.
    #[clap(long, env)]
    pub faucet_contract_address: Address,

    /// Block the faucet contract was deployed at, decimal or 0x-prefixed hex.
    #[clap(long, env, default_value = "0", value_parser = parse_block_number)]
    pub deploy_block_number: u64,

    /// Key of the operator account that submits claim transactions.
    #[clap(long, env, hide_env_values = true)]
    pub operator_private_key: Option<PrivateKeySigner>,

    /// URL of the CSV roster of registered identities.
    #[clap(long, env)]
    pub allowlist_csv_url: Option<Url>,

    /// Seconds a fetched roster stays fresh.
    #[clap(long, env, default_value = "300")]
    pub allowlist_ttl_secs: u64,

    /// Number of most recent blocks scanned block by block for direct transfers.
    #[clap(long, env, default_value_t = DEFAULT_TAIL_WINDOW)]
    pub donor_tail_window: u64,

    /// Baseline snapshot JSON that seeds the leaderboard.
    #[clap(long, env)]
    pub base_donors_path: Option<PathBuf>,

    /// Leaderboard key, `address` or `identity`.
    #[clap(long, env, default_value = "address")]
    pub aggregation_mode: AggregationMode,

    /// Starting (and maximum) block span of a log query.
    #[clap(long, env, default_value = "20000")]
    pub log_scan_initial_step: u64,

    /// Smallest block span retried before a log window is abandoned.
    #[clap(long, env, default_value = "1000")]
    pub log_scan_min_step: u64,

    /// Number of blocks fetched concurrently by the tail scanner.
    #[clap(long, env, default_value_t = DEFAULT_BLOCK_BATCH_SIZE)]
    pub block_scan_batch_size: u64,

    /// Address to listen on.
    #[clap(long, env, default_value = "0.0.0.0")]
    pub host: std::net::IpAddr,

    /// Port to listen on.
    #[clap(long, env, default_value = "3000")]
    pub port: u16,

    /// Whether to log in JSON format.
    #[clap(long, env, default_value_t = false)]
    pub log_json: bool,
}

impl ServerArgs {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Builds the validated service configuration.
    pub fn into_config(self) -> Result<FaucetConfig> {
        if self.operator_private_key.is_none() {
            tracing::warn!("OPERATOR_PRIVATE_KEY is not set; claims will fail until it is configured");
        }
        if self.allowlist_csv_url.is_none() {
            tracing::warn!("ALLOWLIST_CSV_URL is not set; claims will fail and donors stay unnamed");
        }

        let config = FaucetConfig {
            rpc_url: self.rpc_url,
            contract_address: self.faucet_contract_address,
            deploy_block: self.deploy_block_number,
            operator_key: self.operator_private_key,
            allowlist_url: self.allowlist_csv_url,
            allowlist_ttl: Duration::from_secs(self.allowlist_ttl_secs),
            base_snapshot_path: self.base_donors_path,
            scan: ScanConfig {
                step_policy: StepPolicy {
                    initial_step: self.log_scan_initial_step,
                    min_step: self.log_scan_min_step,
                },
                block_batch_size: self.block_scan_batch_size,
                tail_window: self.donor_tail_window,
                max_entries: MAX_LEADERBOARD_ENTRIES,
                mode: self.aggregation_mode,
            },
        };
        config.validate().context("Invalid faucet configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use faucet_core::ConfigError;

    use super::*;

    const CONTRACT: &str = "0x00000000000000000000000000000000000000fa";

    fn parse(extra: &[&str]) -> ServerArgs {
        let mut argv = vec![
            "faucet-server",
            "--rpc-url",
            "http://localhost:8545",
            "--faucet-contract-address",
            CONTRACT,
        ];
        argv.extend_from_slice(extra);
        ServerArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_produce_valid_config() {
        let config = parse(&[]).into_config().unwrap();

        assert_eq!(config.deploy_block, 0);
        assert!(config.operator_key.is_none());
        assert_eq!(config.allowlist_ttl, Duration::from_secs(300));
        assert_eq!(config.scan, ScanConfig::default());
    }

    #[test]
    fn deploy_block_accepts_hex() {
        let args = parse(&["--deploy-block-number", "0x10"]);
        assert_eq!(args.deploy_block_number, 16);
    }

    #[test]
    fn parses_identity_mode() {
        let config = parse(&["--aggregation-mode", "identity"]).into_config().unwrap();
        assert_eq!(config.scan.mode, AggregationMode::Identity);
    }

    #[test]
    fn rejects_min_step_above_initial_step() {
        let err = parse(&["--log-scan-initial-step", "100", "--log-scan-min-step", "500"])
            .into_config()
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::StepOrder { initial_step: 100, min_step: 500 })
        );
    }

    #[test]
    fn rejects_zero_contract_address() {
        let args = ServerArgs::try_parse_from([
            "faucet-server",
            "--rpc-url",
            "http://localhost:8545",
            "--faucet-contract-address",
            "0x0000000000000000000000000000000000000000",
        ])
        .unwrap();

        assert!(args.into_config().is_err());
    }
}
