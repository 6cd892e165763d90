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

use anyhow::{Context, Result};
use clap::Parser;
use faucet_api::{config::ServerArgs, handler::create_app, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();

    if args.log_json {
        tracing_subscriber::fmt().with_ansi(false).json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let addr = args.listen_addr();
    let config = args.into_config()?;

    tracing::info!("Starting faucet server");
    tracing::info!("Faucet contract: {}", config.contract_address);
    tracing::info!("Deploy block: {}", config.deploy_block);
    tracing::info!("Aggregation mode: {}", config.scan.mode);

    let state = AppState::new(&config).context("Failed to create application state")?;
    let app = create_app(Arc::new(state));

    let listener =
        tokio::net::TcpListener::bind(addr).await.context("Failed to bind to address")?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server failed")?;

    Ok(())
}
