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

//! Donor totals, merging and ranking.

use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Maximum number of rows in a leaderboard.
pub const MAX_LEADERBOARD_ENTRIES: usize = 50;

/// Cumulative donations keyed by donor address.
pub type AddressTotals = BTreeMap<Address, U256>;

/// Cumulative donations keyed by leaderboard identity (normalized address or display name).
pub type IdentityTotals = BTreeMap<String, U256>;

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub identity: String,
    #[serde(with = "decimal_u256")]
    pub amount: U256,
}

/// Lowercase `0x`-prefixed hex form used as the address-keyed identity.
pub fn normalize_address(address: &Address) -> String {
    address.to_string().to_lowercase()
}

pub fn add_amount<K: Ord>(totals: &mut BTreeMap<K, U256>, key: K, amount: U256) {
    let entry = totals.entry(key).or_insert(U256::ZERO);
    *entry = entry.saturating_add(amount);
}

/// Adds every amount in `source` to `target`.
pub fn merge_into<K: Ord + Clone>(target: &mut BTreeMap<K, U256>, source: &BTreeMap<K, U256>) {
    for (key, amount) in source {
        add_amount(target, key.clone(), *amount);
    }
}

/// Sorts by amount descending and keeps the first `limit` rows.
///
/// The sort is stable over the map's key order, so ties always come out the same way.
pub fn rank(totals: IdentityTotals, limit: usize) -> Vec<ContributionRecord> {
    let mut records: Vec<ContributionRecord> = totals
        .into_iter()
        .map(|(identity, amount)| ContributionRecord { identity, amount })
        .collect();
    records.sort_by(|a, b| b.amount.cmp(&a.amount));
    records.truncate(limit);
    records
}

/// Sums the baseline, historical and recent totals and ranks the result.
pub fn merge_and_rank(
    baseline: Option<&IdentityTotals>,
    historical: &IdentityTotals,
    recent: &IdentityTotals,
    limit: usize,
) -> Vec<ContributionRecord> {
    let mut merged = baseline.cloned().unwrap_or_default();
    merge_into(&mut merged, historical);
    merge_into(&mut merged, recent);
    rank(merged, limit)
}

/// Serializes a [U256] as a decimal string.
pub mod decimal_u256 {
    use std::str::FromStr;

    use alloy::primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_str(raw.trim()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    fn totals(entries: &[(&str, u128)]) -> IdentityTotals {
        entries.iter().map(|(k, v)| (k.to_string(), U256::from(*v))).collect()
    }

    #[test]
    fn merge_sums_overlapping_identities_exactly() {
        // Both values are above 2^53 and would lose precision as f64.
        let big = 9_007_199_254_740_993u128;
        let a = totals(&[("alice", big), ("bob", 1)]);
        let b = totals(&[("alice", big + 2), ("carol", 7)]);

        let ranked = merge_and_rank(None, &a, &b, MAX_LEADERBOARD_ENTRIES);

        assert_eq!(ranked[0].identity, "alice");
        assert_eq!(ranked[0].amount, U256::from(2 * big + 2));
        assert_eq!(ranked[0].amount.to_string(), "18014398509481988");
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn rank_is_non_increasing_and_capped() {
        let mut many = IdentityTotals::new();
        for i in 0..120u64 {
            many.insert(format!("donor-{i:03}"), U256::from((i * 37) % 11));
        }

        let ranked = rank(many, MAX_LEADERBOARD_ENTRIES);

        assert_eq!(ranked.len(), MAX_LEADERBOARD_ENTRIES);
        assert!(ranked.windows(2).all(|w| w[0].amount >= w[1].amount));
    }

    #[test]
    fn rank_ties_are_deterministic() {
        let input = totals(&[("b", 5), ("a", 5), ("c", 9)]);
        let first = rank(input.clone(), 10);
        let second = rank(input, 10);
        assert_eq!(first, second);
        let order: Vec<_> = first.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[test]
    fn baseline_is_seeded_into_merge() {
        let baseline = totals(&[("x", 5)]);
        let recent = totals(&[("x", 3)]);
        let ranked = merge_and_rank(Some(&baseline), &IdentityTotals::new(), &recent, 50);
        assert_eq!(ranked, vec![ContributionRecord { identity: "x".into(), amount: U256::from(8) }]);
    }

    #[test]
    fn addresses_normalize_to_lowercase() {
        let addr = address!("AbCdEf0123456789abcdef0123456789ABCDEF01");
        assert_eq!(normalize_address(&addr), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn contribution_amount_serializes_as_decimal() {
        let record = ContributionRecord {
            identity: "alice".into(),
            amount: U256::from(10u64).pow(U256::from(24)),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["amount"], "1000000000000000000000000");
        let back: ContributionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
