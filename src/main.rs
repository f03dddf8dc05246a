// ┬─┐┌─┐┌─┐┌─┐┌─┐┬─┐┌─┐┬ ┬  ┌─┐┌─┐┌─┐┬┌─┐┌┬┐┌─┐┌┐┌┌┬┐
// ├┬┘├┤ └─┐├┤ ├─┤├┬┘│  ├─┤  ├─┤└─┐└─┐│└─┐ │ ├─┤│││ │
// ┴└─└─┘└─┘└─┘┴ ┴┴└─└─┘┴ ┴  ┴ ┴└─┘└─┘┴└─┘ ┴ ┴ ┴┘└┘ ┴

// Requires an article-search webhook (n8n or similar).
// Optional: a libSQL/Turso database for search history.

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use research_assistant::app::Assistant;
use research_assistant::config::AppConfig;
use research_assistant::logging::init_tracing;
use research_assistant::web::start_web_server;

// CL arguments; everything else lives in the config file
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Scientific article search assistant with PDF/CSV export",
    long_about = None
)]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: IpAddr,

    #[arg(short, long, default_value_t = 6601)]
    port: u16,

    /// TOML config file (default: ./research-assistant.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let config = AppConfig::load_from(args.config.as_deref()).context("loading configuration")?;
    info!(
        webhook = %config.webhook.url,
        history = config.store.is_configured(),
        "configuration loaded"
    );

    let assistant = Assistant::from_config(&config)
        .await
        .context("setting up the webhook client")?;

    let addr = SocketAddr::new(args.bind, args.port);
    start_web_server(addr, Arc::new(assistant), &config.session).await;
    Ok(())
}
