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

//! Baseline donor snapshot used to seed leaderboard totals.

use std::{collections::HashMap, path::Path, str::FromStr};

use alloy::primitives::{Address, U256};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::totals::{add_amount, decimal_u256, AddressTotals};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to read snapshot file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Donor row of a [BaseSnapshot].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDonor {
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(with = "decimal_u256")]
    pub amount_wei: U256,
}

/// Previously computed donor totals up to and including `last_block`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseSnapshot {
    #[serde(deserialize_with = "block_number")]
    pub last_block: u64,
    #[serde(default)]
    pub donors: Vec<SnapshotDonor>,
}

impl BaseSnapshot {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Donor totals; repeated addresses are summed.
    pub fn totals(&self) -> AddressTotals {
        let mut totals = AddressTotals::new();
        for donor in &self.donors {
            add_amount(&mut totals, donor.address, donor.amount_wei);
        }
        totals
    }

    /// Usernames baked into the snapshot.
    pub fn usernames(&self) -> HashMap<Address, String> {
        self.donors
            .iter()
            .filter_map(|donor| {
                let name = donor.username.as_deref()?.trim();
                (!name.is_empty()).then(|| (donor.address, name.to_string()))
            })
            .collect()
    }
}

/// Accepts `lastBlock` as a JSON number, a decimal string or a `0x` hex string.
fn block_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(text) => parse_block_number(&text).map_err(D::Error::custom),
    }
}

/// Parses a block number written in decimal or `0x`-prefixed hex.
pub fn parse_block_number(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => u64::from_str(raw),
    };
    parsed.map_err(|err| format!("invalid block number {raw:?}: {err}"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use alloy::primitives::address;

    use super::*;

    #[test]
    fn parses_snapshot_with_string_block_and_repeated_donor() {
        let json = r#"{
            "lastBlock": "1000",
            "donors": [
                { "address": "0x00000000000000000000000000000000000000aa", "username": "alice", "amountWei": "5" },
                { "address": "0x00000000000000000000000000000000000000AA", "amountWei": "2" },
                { "address": "0x00000000000000000000000000000000000000bb", "username": " ", "amountWei": "1" }
            ]
        }"#;
        let snapshot: BaseSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.last_block, 1000);
        let aa = address!("00000000000000000000000000000000000000aa");
        let bb = address!("00000000000000000000000000000000000000bb");
        assert_eq!(snapshot.totals()[&aa], U256::from(7));
        assert_eq!(snapshot.usernames().get(&aa).map(String::as_str), Some("alice"));
        assert!(!snapshot.usernames().contains_key(&bb));
    }

    #[test]
    fn parses_block_numbers() {
        assert_eq!(parse_block_number("42"), Ok(42));
        assert_eq!(parse_block_number(" 0x2a "), Ok(42));
        assert!(parse_block_number("forty-two").is_err());
    }

    #[test]
    fn loads_snapshot_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "lastBlock": 7, "donors": [] }}"#).unwrap();

        let snapshot = BaseSnapshot::load(file.path()).unwrap();
        assert_eq!(snapshot, BaseSnapshot { last_block: 7, donors: vec![] });
    }

    #[test]
    fn serializes_in_the_format_it_reads() {
        let snapshot = BaseSnapshot {
            last_block: 12,
            donors: vec![SnapshotDonor {
                address: address!("00000000000000000000000000000000000000cc"),
                username: None,
                amount_wei: U256::from(3),
            }],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["lastBlock"], 12);
        assert_eq!(json["donors"][0]["amountWei"], "3");
        assert!(json["donors"][0].get("username").is_none());
    }
}
