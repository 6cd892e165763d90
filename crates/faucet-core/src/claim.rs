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

//! Eligibility checks and payout submission for faucet claims.

use std::{
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use alloy::primitives::{Address, B256, U256};
use thiserror::Error;

use crate::{
    allowlist::{AllowlistError, IdentityResolverObj},
    chain::{ChainClientObj, ChainError, FaucetView},
};

#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("address and identity required")]
    MissingFields,

    #[error("invalid address")]
    InvalidAddress,

    #[error("address and identity are not on the allowlist")]
    NotAllowlisted,

    #[error("balance is at or above the eligibility ceiling")]
    BalanceTooHigh,

    #[error("faucet balance is below the payout amount")]
    FaucetEmpty,

    #[error("cooldown active, {seconds_left}s left")]
    CooldownActive { seconds_left: u64 },

    #[error("allowlist unavailable: {0}")]
    Allowlist(#[from] AllowlistError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),
}

impl ClaimError {
    /// Stable machine readable code.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingFields => "missing_fields",
            Self::InvalidAddress => "invalid_address",
            Self::NotAllowlisted => "not_allowlisted",
            Self::BalanceTooHigh => "balance_too_high",
            Self::FaucetEmpty => "faucet_empty",
            Self::CooldownActive { .. } => "cooldown_active",
            Self::Allowlist(_) => "allowlist_unavailable",
            Self::Chain(ChainError::NoSigner) => "operator_not_configured",
            Self::Chain(_) => "chain_error",
        }
    }

    /// Whether the requester failed an eligibility check, as opposed to an internal failure.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Allowlist(_) | Self::Chain(_))
    }
}

/// Claim as submitted by a requester. Fields are validated by [ClaimAuthorizer].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimRequest {
    pub address: Option<String>,
    pub identity: Option<String>,
}

/// Live contract state the eligibility checks are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClaimState {
    payout: U256,
    ceiling: U256,
    last_claim: U256,
    requester_balance: U256,
    faucet_balance: U256,
    cooldown: U256,
}

pub struct ClaimAuthorizer {
    chain: ChainClientObj,
    resolver: IdentityResolverObj,
    contract: Address,
}

impl ClaimAuthorizer {
    pub fn new(chain: ChainClientObj, resolver: IdentityResolverObj, contract: Address) -> Self {
        Self { chain, resolver, contract }
    }

    /// Runs every check against the current time and submits the payout.
    pub async fn authorize(&self, request: ClaimRequest) -> Result<B256, ClaimError> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        self.authorize_at(request, now).await
    }

    /// Runs every check with `now` as the current unix time and submits the payout.
    ///
    /// Checks short-circuit in order: fields present, address well formed, allowlisted pair,
    /// requester balance, faucet balance, cooldown.
    pub async fn authorize_at(&self, request: ClaimRequest, now: u64) -> Result<B256, ClaimError> {
        let (address, identity) = match (request.address, request.identity) {
            (Some(address), Some(identity))
                if !address.trim().is_empty() && !identity.trim().is_empty() =>
            {
                (address, identity)
            }
            _ => return Err(ClaimError::MissingFields),
        };
        let address = parse_address(address.trim()).ok_or(ClaimError::InvalidAddress)?;

        if !self.resolver.is_authorized_pair(address, &identity).await? {
            return Err(ClaimError::NotAllowlisted);
        }

        let state = self.read_state(address).await?;
        if state.requester_balance >= state.ceiling {
            return Err(ClaimError::BalanceTooHigh);
        }
        if state.faucet_balance < state.payout {
            return Err(ClaimError::FaucetEmpty);
        }
        let elapsed = U256::from(now).saturating_sub(state.last_claim);
        if elapsed < state.cooldown {
            let seconds_left = state.cooldown - elapsed;
            return Err(ClaimError::CooldownActive {
                seconds_left: u64::try_from(seconds_left).unwrap_or(u64::MAX),
            });
        }

        tracing::info!("Paying out {} wei to {} ({})", state.payout, address, identity.trim());
        Ok(self.chain.submit_claim(address).await?)
    }

    async fn read_state(&self, requester: Address) -> Result<ClaimState, ChainError> {
        let client = self.chain.as_ref();
        let (payout, ceiling, last_claim, requester_balance, faucet_balance, cooldown) = tokio::try_join!(
            client.read_contract_value(FaucetView::PayoutAmount),
            client.read_contract_value(FaucetView::MinEligibleBalance),
            client.read_contract_value(FaucetView::LastClaim(requester)),
            client.balance(requester),
            client.balance(self.contract),
            client.read_contract_value(FaucetView::Cooldown),
        )?;
        Ok(ClaimState { payout, ceiling, last_claim, requester_balance, faucet_balance, cooldown })
    }
}

/// Parses a `0x`-prefixed address. Mixed-case input must carry a valid EIP-55 checksum.
fn parse_address(raw: &str) -> Option<Address> {
    let hex = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
    let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
    let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
    if has_upper && has_lower {
        Address::parse_checksummed(format!("0x{hex}"), None).ok()
    } else {
        Address::from_str(hex).ok()
    }
}
