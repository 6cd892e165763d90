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

use faucet_core::{ClaimRequest, LeaderboardEntry};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::format_ztc;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,

    /// Machine-readable reason code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Seconds until the requester may claim again (cooldown rejections only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_left: Option<u64>,
}

/// Leaderboard row of the donors endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DonorEntry {
    /// Rank in the leaderboard (1-based)
    pub rank: u64,

    /// Leaderboard key: lowercase donor address or registered identity, depending on the mode
    pub identity: String,

    /// Donor address (address-keyed mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Registered identity, or "unknown"
    pub display_name: String,

    /// Total donated, in wei
    pub amount: String,

    /// Total donated (human-readable)
    pub amount_formatted: String,
}

impl DonorEntry {
    pub fn from_entry(rank: u64, entry: LeaderboardEntry) -> Self {
        Self {
            rank,
            identity: entry.identity,
            address: entry.address.map(|address| address.to_string().to_lowercase()),
            display_name: entry.display_name,
            amount: entry.amount.to_string(),
            amount_formatted: format_ztc(entry.amount),
        }
    }
}

/// Native balance of the faucet contract
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    /// Balance in wei
    pub balance: String,

    /// Balance (human-readable)
    pub balance_formatted: String,
}

/// Claim request body
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimBody {
    /// Wallet address receiving the payout
    #[serde(default)]
    pub address: Option<String>,

    /// Identity the address is registered under
    #[serde(default)]
    pub identity: Option<String>,

    /// Legacy name for `identity`
    #[serde(default)]
    pub discord_username: Option<String>,

    /// Legacy name for `identity`
    #[serde(default)]
    pub discord_id: Option<String>,
}

impl From<ClaimBody> for ClaimRequest {
    /// `identity` wins over `discordUsername`, which wins over `discordId`; blank values are skipped.
    fn from(body: ClaimBody) -> Self {
        let identity = [body.identity, body.discord_username, body.discord_id]
            .into_iter()
            .flatten()
            .find(|value| !value.trim().is_empty());
        ClaimRequest { address: body.address, identity }
    }
}

/// Successful claim
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    /// Hash of the payout transaction
    pub tx_hash: String,
}

/// Runtime diagnostics
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebugResponse {
    pub contract_in_use: String,
    pub deploy_block: u64,
    /// Current head, or the error returned while fetching it
    pub current_block: String,
    pub aggregation_mode: String,
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, U256};

    use super::*;

    #[test]
    fn claim_body_accepts_legacy_field_names() {
        let by_id: ClaimBody =
            serde_json::from_str(r#"{ "address": "0xabc", "discordId": "alice" }"#).unwrap();
        let by_name: ClaimBody =
            serde_json::from_str(r#"{ "address": "0xabc", "discordUsername": "alice" }"#).unwrap();
        let by_identity: ClaimBody =
            serde_json::from_str(r#"{ "address": "0xabc", "identity": "alice" }"#).unwrap();

        for body in [by_id, by_name, by_identity] {
            assert_eq!(ClaimRequest::from(body).identity.as_deref(), Some("alice"));
        }
    }

    #[test]
    fn claim_body_with_both_names_prefers_identity() {
        let body: ClaimBody = serde_json::from_str(
            r#"{ "address": "0xabc", "identity": "alice", "discordId": "alice#1", "discordUsername": " " }"#,
        )
        .unwrap();
        assert_eq!(ClaimRequest::from(body).identity.as_deref(), Some("alice"));

        let body: ClaimBody =
            serde_json::from_str(r#"{ "address": "0xabc", "identity": "", "discordId": "bob" }"#)
                .unwrap();
        assert_eq!(ClaimRequest::from(body).identity.as_deref(), Some("bob"));
    }

    #[test]
    fn donor_entry_uses_decimal_amounts() {
        let entry = LeaderboardEntry {
            identity: "0x00000000000000000000000000000000000000aa".into(),
            address: Some(address!("00000000000000000000000000000000000000AA")),
            display_name: "unknown".into(),
            amount: U256::from(1_500_000_000_000_000_000u128),
        };

        let json = serde_json::to_value(DonorEntry::from_entry(1, entry)).unwrap();

        assert_eq!(json["amount"], "1500000000000000000");
        assert_eq!(json["amountFormatted"], "1.5000 ZTC");
        assert_eq!(json["displayName"], "unknown");
        assert_eq!(json["address"], "0x00000000000000000000000000000000000000aa");
    }
}
