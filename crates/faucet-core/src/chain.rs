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

//! RPC client adapter used by the aggregator and the claim flow.

use std::sync::Arc;

use alloy::{
    consensus::Transaction as _,
    network::{EthereumWallet, TransactionResponse as _},
    primitives::{Address, Bytes, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::{
        client::RpcClient,
        types::{BlockNumberOrTag, Filter},
    },
    signers::local::PrivateKeySigner,
    transports::{layers::RetryBackoffLayer, TransportError},
};
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::{contracts::IFaucet, scanner::ScanWindow};

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("RPC transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    #[error("block {0} not found")]
    MissingBlock(u64),

    #[error("operator signer not configured")]
    NoSigner,

    #[error("provider rejected request: {0}")]
    Rejected(String),
}

/// Undecoded log entry as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Top-level value transfer carried by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTx {
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
}

/// View functions of the faucet contract readable through [ChainClient::read_contract_value].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaucetView {
    PayoutAmount,
    MinEligibleBalance,
    Cooldown,
    LastClaim(Address),
}

#[async_trait]
pub trait ChainClient {
    /// Current chain head.
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Logs emitted by `address` with `topic0 == topic` inside `window`.
    async fn logs(
        &self,
        address: Address,
        topic: B256,
        window: ScanWindow,
    ) -> Result<Vec<RawLog>, ChainError>;

    /// Transactions of block `number`, with bodies.
    async fn block_transfers(&self, number: u64) -> Result<Vec<TransferTx>, ChainError>;

    /// Native balance of `address`.
    async fn balance(&self, address: Address) -> Result<U256, ChainError>;

    async fn read_contract_value(&self, view: FaucetView) -> Result<U256, ChainError>;

    /// Sends `claimFor(recipient)` from the operator account and returns the transaction hash.
    async fn submit_claim(&self, recipient: Address) -> Result<B256, ChainError>;
}

pub type ChainClientObj = Arc<dyn ChainClient + Send + Sync>;

/// [ChainClient] backed by an alloy HTTP provider.
pub struct AlloyChainClient {
    provider: DynProvider,
    contract: Address,
    has_signer: bool,
}

impl AlloyChainClient {
    pub fn new(rpc_url: Url, contract: Address, operator: Option<PrivateKeySigner>) -> Self {
        let client = RpcClient::builder().layer(RetryBackoffLayer::new(3, 1000, 200)).http(rpc_url);
        let has_signer = operator.is_some();
        let provider = match operator {
            Some(signer) => {
                tracing::info!("Operator account: {}", signer.address());
                ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_client(client)
                    .erased()
            }
            None => ProviderBuilder::new().connect_client(client).erased(),
        };
        Self { provider, contract, has_signer }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn logs(
        &self,
        address: Address,
        topic: B256,
        window: ScanWindow,
    ) -> Result<Vec<RawLog>, ChainError> {
        let filter = Filter::new()
            .address(address)
            .event_signature(topic)
            .from_block(BlockNumberOrTag::Number(window.from_block))
            .to_block(BlockNumberOrTag::Number(window.to_block));

        let logs = self.provider.get_logs(&filter).await?;
        Ok(logs
            .into_iter()
            .map(|log| RawLog { topics: log.topics().to_vec(), data: log.data().data.clone() })
            .collect())
    }

    async fn block_transfers(&self, number: u64) -> Result<Vec<TransferTx>, ChainError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .full()
            .await?
            .ok_or(ChainError::MissingBlock(number))?;

        if block.transactions.is_hashes() && !block.transactions.is_empty() {
            return Err(ChainError::Rejected(format!(
                "block {number} returned without transaction bodies"
            )));
        }

        Ok(block
            .transactions
            .txns()
            .map(|tx| TransferTx { from: tx.from(), to: tx.to(), value: tx.value() })
            .collect())
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn read_contract_value(&self, view: FaucetView) -> Result<U256, ChainError> {
        let faucet = IFaucet::new(self.contract, &self.provider);
        let value = match view {
            FaucetView::PayoutAmount => faucet.payoutAmount().call().await?,
            FaucetView::MinEligibleBalance => faucet.minEligibleBalance().call().await?,
            FaucetView::Cooldown => faucet.cooldown().call().await?,
            FaucetView::LastClaim(account) => faucet.lastClaim(account).call().await?,
        };
        Ok(value)
    }

    async fn submit_claim(&self, recipient: Address) -> Result<B256, ChainError> {
        if !self.has_signer {
            return Err(ChainError::NoSigner);
        }
        let faucet = IFaucet::new(self.contract, &self.provider);
        let pending = faucet.claimFor(recipient).send().await?;
        let tx_hash = *pending.tx_hash();
        tracing::info!("Submitted claimFor({}) as 0x{:x}", recipient, tx_hash);
        Ok(tx_hash)
    }
}
