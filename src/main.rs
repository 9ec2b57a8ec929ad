// Copyright (c) 2025 webgrab contributors
// SPDX-License-Identifier: MIT

//! webgrab binary: CLI parsing, config merge, server startup.

use anyhow::Result;
use clap::{Parser, Subcommand};

use webgrab::config::Config;
use webgrab::server::Server;

#[derive(Parser)]
#[command(name = "webgrab", version, about = "Self-hosted media download service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service (default)
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Address to bind to; use 0.0.0.0 to expose to the network
        #[arg(long)]
        bind: Option<String>,
        /// Directory downloads are saved into
        #[arg(long)]
        dir: Option<std::path::PathBuf>,
        /// API token clients must present (overrides the configured one)
        #[arg(long)]
        token: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    let config = Config::load_or_init()?;

    match cli.command {
        Some(Commands::Config) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("# config file: {:?}", Config::path());
            Ok(())
        }
        Some(Commands::Serve { port, bind, dir, token }) => {
            serve(config, port, bind, dir, token)
        }
        None => serve(config, None, None, None, None),
    }
}

fn serve(
    config: Config,
    port: Option<u16>,
    bind: Option<String>,
    dir: Option<std::path::PathBuf>,
    token: Option<String>,
) -> Result<()> {
    let port = port.unwrap_or(config.port);
    let bind = bind.unwrap_or(config.bind_address);
    let dir = dir.unwrap_or(config.download_dir);
    let token = token.unwrap_or(config.api_token);

    let server = Server::new(port)
        .with_bind_address(bind)
        .with_download_dir(dir)
        .with_api_token(token);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.start())
}
