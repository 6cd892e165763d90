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

//! In-memory chain and resolver doubles for tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;

use crate::{
    allowlist::{AllowlistError, IdentityResolver},
    chain::{ChainClient, ChainError, FaucetView, RawLog, TransferTx},
    scanner::{donated_topic, ScanWindow},
};

/// Chain double holding donation logs, block transfers and faucet state.
pub struct MockChain {
    contract: Address,
    head: u64,
    logs: Vec<(u64, Address, RawLog)>,
    transfers: HashMap<u64, Vec<TransferTx>>,
    max_log_range: Option<u64>,
    failing_log_blocks: HashSet<u64>,
    failing_blocks: HashSet<u64>,
    balances: HashMap<Address, U256>,
    payout: U256,
    ceiling: U256,
    cooldown: U256,
    last_claims: HashMap<Address, U256>,
    signer: bool,
    log_requests: Mutex<Vec<ScanWindow>>,
    block_requests: Mutex<Vec<u64>>,
    submitted: Mutex<Vec<Address>>,
}

impl MockChain {
    pub fn new(contract: Address, head: u64) -> Self {
        Self {
            contract,
            head,
            logs: Vec::new(),
            transfers: HashMap::new(),
            max_log_range: None,
            failing_log_blocks: HashSet::new(),
            failing_blocks: HashSet::new(),
            balances: HashMap::new(),
            payout: U256::ZERO,
            ceiling: U256::MAX,
            cooldown: U256::ZERO,
            last_claims: HashMap::new(),
            signer: true,
            log_requests: Mutex::new(Vec::new()),
            block_requests: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Adds a `Donated(donor, amount)` log emitted by the faucet at `block`.
    pub fn with_donation(self, block: u64, donor: Address, amount: U256) -> Self {
        let log = RawLog {
            topics: vec![donated_topic(), donor.into_word()],
            data: Bytes::from(amount.to_be_bytes::<32>().to_vec()),
        };
        let contract = self.contract;
        self.with_raw_log(block, contract, log)
    }

    pub fn with_raw_log(mut self, block: u64, address: Address, log: RawLog) -> Self {
        self.logs.push((block, address, log));
        self
    }

    pub fn with_transfer(mut self, block: u64, tx: TransferTx) -> Self {
        self.transfers.entry(block).or_default().push(tx);
        self
    }

    /// `getLogs` fails for any window spanning more than `blocks` blocks.
    pub fn with_max_log_range(mut self, blocks: u64) -> Self {
        self.max_log_range = Some(blocks);
        self
    }

    /// `getLogs` fails for any window containing `block`.
    pub fn with_failing_log_block(mut self, block: u64) -> Self {
        self.failing_log_blocks.insert(block);
        self
    }

    pub fn with_failing_block(mut self, block: u64) -> Self {
        self.failing_blocks.insert(block);
        self
    }

    pub fn with_balance(mut self, address: Address, balance: U256) -> Self {
        self.balances.insert(address, balance);
        self
    }

    pub fn with_faucet_params(mut self, payout: U256, ceiling: U256, cooldown: U256) -> Self {
        self.payout = payout;
        self.ceiling = ceiling;
        self.cooldown = cooldown;
        self
    }

    pub fn with_last_claim(mut self, address: Address, timestamp: U256) -> Self {
        self.last_claims.insert(address, timestamp);
        self
    }

    pub fn without_signer(mut self) -> Self {
        self.signer = false;
        self
    }

    pub fn requested_log_windows(&self) -> Vec<ScanWindow> {
        self.log_requests.lock().unwrap().clone()
    }

    pub fn requested_blocks(&self) -> Vec<u64> {
        let mut blocks = self.block_requests.lock().unwrap().clone();
        blocks.sort_unstable();
        blocks
    }

    pub fn submitted_claims(&self) -> Vec<Address> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.head)
    }

    async fn logs(
        &self,
        address: Address,
        topic: B256,
        window: ScanWindow,
    ) -> Result<Vec<RawLog>, ChainError> {
        self.log_requests.lock().unwrap().push(window);

        if self.max_log_range.is_some_and(|max| window.block_count() > max) {
            return Err(ChainError::Rejected(format!(
                "block range {} exceeds limit",
                window.block_count()
            )));
        }
        if (window.from_block..=window.to_block).any(|b| self.failing_log_blocks.contains(&b)) {
            return Err(ChainError::Rejected("log index unavailable".to_string()));
        }

        Ok(self
            .logs
            .iter()
            .filter(|(block, emitter, log)| {
                *emitter == address
                    && (window.from_block..=window.to_block).contains(block)
                    && log.topics.first() == Some(&topic)
            })
            .map(|(_, _, log)| log.clone())
            .collect())
    }

    async fn block_transfers(&self, number: u64) -> Result<Vec<TransferTx>, ChainError> {
        self.block_requests.lock().unwrap().push(number);
        if self.failing_blocks.contains(&number) {
            return Err(ChainError::Rejected(format!("block {number} unavailable")));
        }
        if number > self.head {
            return Err(ChainError::MissingBlock(number));
        }
        Ok(self.transfers.get(&number).cloned().unwrap_or_default())
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self.balances.get(&address).copied().unwrap_or_default())
    }

    async fn read_contract_value(&self, view: FaucetView) -> Result<U256, ChainError> {
        Ok(match view {
            FaucetView::PayoutAmount => self.payout,
            FaucetView::MinEligibleBalance => self.ceiling,
            FaucetView::Cooldown => self.cooldown,
            FaucetView::LastClaim(account) => {
                self.last_claims.get(&account).copied().unwrap_or_default()
            }
        })
    }

    async fn submit_claim(&self, recipient: Address) -> Result<B256, ChainError> {
        if !self.signer {
            return Err(ChainError::NoSigner);
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(recipient);
        Ok(keccak256([recipient.as_slice(), &submitted.len().to_be_bytes()[..]].concat()))
    }
}

/// Resolver backed by a fixed address to identity table.
#[derive(Debug, Default)]
pub struct StaticResolver {
    entries: HashMap<Address, String>,
    failing: bool,
}

impl StaticResolver {
    pub fn new<'a>(entries: impl IntoIterator<Item = (Address, &'a str)>) -> Self {
        Self {
            entries: entries.into_iter().map(|(a, name)| (a, name.to_string())).collect(),
            failing: false,
        }
    }

    /// Resolver whose every lookup fails.
    pub fn failing() -> Self {
        Self { entries: HashMap::new(), failing: true }
    }
}

#[async_trait]
impl IdentityResolver for StaticResolver {
    async fn resolve_identity(&self, address: Address) -> Result<Option<String>, AllowlistError> {
        if self.failing {
            return Err(AllowlistError::NotConfigured);
        }
        Ok(self.entries.get(&address).cloned())
    }

    async fn is_authorized_pair(
        &self,
        address: Address,
        identity: &str,
    ) -> Result<bool, AllowlistError> {
        if self.failing {
            return Err(AllowlistError::NotConfigured);
        }
        Ok(self.entries.get(&address).map(String::as_str) == Some(identity.trim()))
    }
}
