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

//! Allowlist roster mapping wallet addresses to registered identities.

use std::{collections::HashMap, sync::Arc, time::Duration};

use alloy::primitives::Address;
use async_trait::async_trait;
use thiserror::Error;
use tokio::{sync::RwLock, time::Instant};
use url::Url;

use crate::totals::normalize_address;

/// Default freshness window of the cached roster.
pub const DEFAULT_ROSTER_TTL: Duration = Duration::from_secs(5 * 60);

const WALLET_COLUMNS: [&str; 3] = ["walletaddress", "address", "wallet"];
const IDENTITY_COLUMNS: [&str; 4] = ["discordusername", "discord", "username", "discordname"];

#[derive(Error, Debug)]
pub enum AllowlistError {
    #[error("allowlist URL not configured")]
    NotConfigured,

    #[error("failed to fetch allowlist: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("failed to parse allowlist CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[async_trait]
pub trait IdentityResolver {
    /// Registered identity of `address`, if any.
    async fn resolve_identity(&self, address: Address) -> Result<Option<String>, AllowlistError>;

    /// Whether `address` is registered under exactly `identity`.
    async fn is_authorized_pair(
        &self,
        address: Address,
        identity: &str,
    ) -> Result<bool, AllowlistError>;
}

pub type IdentityResolverObj = Arc<dyn IdentityResolver + Send + Sync>;

/// Normalized address to identity map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entries: HashMap<String, String>,
}

impl Roster {
    /// Parses a roster CSV. Header names are matched ignoring case, spaces and underscores.
    pub fn from_csv(text: &str) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
        let column = |names: &[&str]| -> Vec<usize> {
            names
                .iter()
                .filter_map(|name| headers.iter().position(|header| header == name))
                .collect()
        };
        let wallet_columns = column(&WALLET_COLUMNS[..]);
        let identity_columns = column(&IDENTITY_COLUMNS[..]);

        let mut entries = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let first_value = |columns: &[usize]| {
                columns
                    .iter()
                    .filter_map(|&idx| record.get(idx))
                    .map(str::trim)
                    .find(|value| !value.is_empty())
            };
            if let (Some(wallet), Some(identity)) =
                (first_value(&wallet_columns[..]), first_value(&identity_columns[..]))
            {
                entries.insert(wallet.to_lowercase(), identity.to_string());
            }
        }

        Ok(Self { entries })
    }

    pub fn identity_of(&self, address: &Address) -> Option<&str> {
        self.entries.get(&normalize_address(address)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_header(header: &str) -> String {
    header.chars().filter(|c| !c.is_whitespace() && *c != '_').flat_map(char::to_lowercase).collect()
}

#[derive(Debug, Clone)]
struct CachedRoster {
    fetched_at: Instant,
    roster: Arc<Roster>,
}

impl CachedRoster {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Allowlist backed by a CSV document fetched over HTTP and cached for `ttl`.
pub struct Allowlist {
    url: Option<Url>,
    ttl: Duration,
    client: reqwest::Client,
    cache: RwLock<Option<CachedRoster>>,
}

impl Allowlist {
    pub fn new(url: Option<Url>, ttl: Duration) -> Self {
        Self { url, ttl, client: reqwest::Client::new(), cache: RwLock::new(None) }
    }

    /// Allowlist that starts from an already loaded roster.
    pub fn with_roster(url: Option<Url>, ttl: Duration, roster: Roster) -> Self {
        let cached = CachedRoster { fetched_at: Instant::now(), roster: Arc::new(roster) };
        Self { url, ttl, client: reqwest::Client::new(), cache: RwLock::new(Some(cached)) }
    }

    /// Returns the cached roster, fetching it when missing or stale.
    pub async fn roster(&self) -> Result<Arc<Roster>, AllowlistError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_fresh(self.ttl) {
                return Ok(cached.roster.clone());
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed it while we waited for the lock.
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh(self.ttl) {
                return Ok(cached.roster.clone());
            }
        }

        let roster = Arc::new(self.fetch().await?);
        tracing::info!("Loaded allowlist with {} entries", roster.len());
        *cache = Some(CachedRoster { fetched_at: Instant::now(), roster: roster.clone() });
        Ok(roster)
    }

    /// Drops the cached roster so the next lookup refetches it.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Time at which the cached roster was fetched.
    pub async fn fetched_at(&self) -> Option<Instant> {
        self.cache.read().await.as_ref().map(|cached| cached.fetched_at)
    }

    async fn fetch(&self) -> Result<Roster, AllowlistError> {
        let url = self.url.clone().ok_or(AllowlistError::NotConfigured)?;
        tracing::debug!("Fetching allowlist from {}", url);
        let text = self.client.get(url).send().await?.error_for_status()?.text().await?;
        Ok(Roster::from_csv(&text)?)
    }
}

#[async_trait]
impl IdentityResolver for Allowlist {
    async fn resolve_identity(&self, address: Address) -> Result<Option<String>, AllowlistError> {
        Ok(self.roster().await?.identity_of(&address).map(str::to_string))
    }

    async fn is_authorized_pair(
        &self,
        address: Address,
        identity: &str,
    ) -> Result<bool, AllowlistError> {
        let roster = self.roster().await?;
        Ok(roster.identity_of(&address) == Some(identity.trim()))
    }
}
