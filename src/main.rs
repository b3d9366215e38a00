//! Isomer Client CLI - interactive shell for an Isomer server's WebSocket.
//!
//! This is the main binary entry point. See the `isomer_client` library
//! for the core functionality.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use isomer_client::{ClientBuilder, ClientConfig, Protocol};

// CLI
#[derive(Parser, Debug)]
#[command(name = "isomer-client")]
#[command(version)]
#[command(about = "Interactive WebSocket client for Isomer/HFOS servers")]
struct Cli {
    /// JSON file with connection settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// WebSocket protocol
    #[arg(long, value_enum)]
    protocol: Option<Protocol>,

    /// Server host
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// URL path of the WebSocket endpoint
    #[arg(long)]
    url: Option<String>,

    /// Login name
    #[arg(short, long)]
    username: Option<String>,

    /// Login password (prompted for when empty and username is not "anonymous")
    #[arg(short, long)]
    password: Option<String>,

    /// Do not read commands from the terminal
    #[arg(long)]
    suppress_stdin: bool,

    /// Do not print received messages
    #[arg(long)]
    suppress_stdout: bool,

    /// Characters shown per received message
    #[arg(long)]
    preview_length: Option<usize>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

impl Cli {
    /// Layer file, environment and flags into the final configuration.
    fn into_config(self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load_from_file(path)?,
            None => ClientConfig::default(),
        };
        config.apply_env_overrides()?;

        if let Some(protocol) = self.protocol {
            config.protocol = protocol;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(path) = self.url {
            config.path = path;
        }
        if let Some(username) = self.username {
            config.username = username;
        }
        if let Some(password) = self.password {
            config.password = password;
        }
        if let Some(preview_length) = self.preview_length {
            config.options.preview_length = preview_length;
        }
        config.options.suppress_stdin |= self.suppress_stdin;
        config.options.suppress_stdout |= self.suppress_stdout;
        config.options.debug |= self.debug;

        Ok(config)
    }
}

/// Log to stderr, or to `ISOMER_LOG_FILE` when set.
fn init_logging(debug: bool) -> Result<()> {
    let default_filter = if debug { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    builder.format_timestamp_secs();

    if let Ok(path) = std::env::var("ISOMER_LOG_FILE") {
        let log_file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create log file at {path}"))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }

    builder.init();
    Ok(())
}

/// Ask for the password on the terminal when the config needs one.
fn prompt_password(config: &mut ClientConfig) -> Result<()> {
    if !config.needs_password_prompt() {
        return Ok(());
    }
    if !atty::is(atty::Stream::Stdin) {
        log::warn!("No password given and stdin is not a terminal; logging in without one");
        return Ok(());
    }

    config.password = dialoguer::Password::new()
        .with_prompt(format!("Password for {}", config.username))
        .allow_empty_password(true)
        .interact()
        .context("Failed to read password")?;
    Ok(())
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = cli.into_config()?;
    init_logging(config.options.debug)?;
    prompt_password(&mut config)?;

    // Single-threaded: handlers run one at a time on this thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(ClientBuilder::new(config).run());

    // Don't wait on tasks still parked on socket I/O. The stdin reader is a
    // plain thread and ends with the process.
    runtime.shutdown_background();

    let reason = result?;
    Ok(ExitCode::from(reason.exit_code()))
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
