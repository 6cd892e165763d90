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

use utoipa::OpenApi;

use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Testnet Faucet API",
        version = "1.0.0",
        description = "Donor leaderboard, faucet balance and allowlisted claims for the testnet faucet contract."
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Donors", description = "Donor leaderboard and baseline snapshot endpoints"),
        (name = "Faucet", description = "Balance, claim and diagnostics endpoints")
    ),
    paths(
        crate::handler::health_check,
        crate::routes::donors::get_donors,
        crate::routes::donors::get_donors_snapshot,
        crate::routes::faucet::get_balance,
        crate::routes::faucet::post_claim,
        crate::routes::faucet::get_debug,
    ),
    components(schemas(
        HealthResponse,
        ErrorResponse,
        DonorEntry,
        BalanceResponse,
        ClaimBody,
        ClaimResponse,
        DebugResponse,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for path in
            ["/health", "/api/donors", "/api/donors-snapshot", "/api/balance", "/api/claim", "/api/debug"]
        {
            assert!(paths.contains(&path), "missing {path}");
        }
    }
}
