use anyhow::{Context, Result};
use clap::Parser;
use open_file_bridge::app::{self, events::MethodCall, state::BridgeState};
use open_file_bridge::config::{self, BridgeConfig};
use open_file_bridge::platform::DesktopPlatform;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Open a file with the application registered for its type.
#[derive(Parser, Debug)]
#[command(name = "open-file")]
#[command(version)]
struct Cli {
    /// File to open
    path: PathBuf,

    /// MIME type to open the file as, overriding the extension lookup
    #[arg(short = 't', long = "type")]
    mime_type: Option<String>,

    /// Path to a configuration file (defaults to the platform config directory)
    #[arg(long, env = "OPEN_FILE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let bridge_config = match config::settings::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Could not load config, using defaults: {}", e);
            BridgeConfig::default()
        }
    };

    // Provider and file URIs need an absolute path.
    let path = if cli.path.is_absolute() {
        cli.path
    } else {
        std::env::current_dir()
            .context("Could not resolve the current directory")?
            .join(cli.path)
    };

    let platform = DesktopPlatform::new(bridge_config.handler_overrides.clone());
    let dispatcher = bridge_config.build_dispatcher(platform);
    let state = Arc::new(Mutex::new(BridgeState::new(dispatcher)));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let path_arg = path.to_string_lossy();
    app::commands::handle_method_call(
        MethodCall::open_file(Some(&path_arg), cli.mime_type.as_deref()),
        tx,
        state,
    );

    let reply = rx
        .recv()
        .await
        .context("The bridge dropped the call without replying")?;
    println!("{}", serde_json::to_string_pretty(&reply)?);

    Ok(if reply.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
