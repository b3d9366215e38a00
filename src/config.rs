//! Connection configuration.
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. Built-in defaults ([`ClientConfig::default`])
//! 2. Optional JSON file ([`ClientConfig::load_from_file`])
//! 3. `ISOMER_*` environment variables ([`ClientConfig::apply_env_overrides`])
//! 4. Command-line flags (applied by the binary)
//!
//! The password is accepted from every layer but never written back out.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{
    ANONYMOUS_USER, DEFAULT_HOST, DEFAULT_PATH, DEFAULT_PORT, DEFAULT_PREVIEW_LENGTH,
    DEFAULT_REQUEST_TIMEOUT,
};

/// WebSocket URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain WebSocket.
    Ws,
    /// WebSocket over TLS.
    #[default]
    Wss,
}

impl Protocol {
    /// URL scheme string.
    #[must_use]
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Ws => "ws",
            Self::Wss => "wss",
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ws" => Ok(Self::Ws),
            "wss" => Ok(Self::Wss),
            other => bail!("unknown protocol {other:?} (expected ws or wss)"),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Behavioural switches of the client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ClientOptions {
    /// Do not read commands from the terminal.
    pub suppress_stdin: bool,
    /// Do not print received frames.
    pub suppress_stdout: bool,
    /// Tick rate of the embedder loop function in Hz (`None` disables it).
    pub loop_frequency: Option<f64>,
    /// Verbose logging.
    pub debug: bool,
    /// Characters shown when previewing a frame.
    pub preview_length: usize,
    /// Seconds an unanswered data query stays pending.
    pub request_timeout_secs: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            suppress_stdin: false,
            suppress_stdout: false,
            loop_frequency: None,
            debug: false,
            preview_length: DEFAULT_PREVIEW_LENGTH,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl ClientOptions {
    /// Pending-request lifetime.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Loop period derived from the frequency, if a loop is configured.
    ///
    /// `None` also when the period does not fit a [`Duration`] or rounds
    /// down to zero.
    #[must_use]
    pub fn loop_period(&self) -> Option<Duration> {
        self.loop_frequency
            .filter(|hz| hz.is_finite() && *hz > 0.0)
            .and_then(|hz| Duration::try_from_secs_f64(1.0 / hz).ok())
            .filter(|period| !period.is_zero())
    }
}

/// Configuration for one client run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// `ws` or `wss`.
    pub protocol: Protocol,
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// URL path of the WebSocket endpoint (without leading slash).
    pub path: String,
    /// Login name.
    pub username: String,
    /// Login password - read from files/env but never serialized.
    #[serde(skip_serializing)]
    pub password: String,
    /// Behavioural switches.
    pub options: ClientOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            username: ANONYMOUS_USER.to_string(),
            password: String::new(),
            options: ClientOptions::default(),
        }
    }
}

impl ClientConfig {
    /// WebSocket URL: `<protocol>://<host>:<port>/<path>`.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}/{}",
            self.protocol,
            self.host,
            self.port,
            self.path.trim_start_matches('/')
        )
    }

    /// Returns `true` if the launcher should ask for a password.
    ///
    /// Only the exact username `anonymous` is exempt.
    #[must_use]
    pub fn needs_password_prompt(&self) -> bool {
        self.username != ANONYMOUS_USER && self.password.is_empty()
    }

    /// Load settings from a JSON file, starting from defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Apply `ISOMER_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if `ISOMER_PROTOCOL` or `ISOMER_PORT` is malformed.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(protocol) = lookup("ISOMER_PROTOCOL") {
            self.protocol = protocol.parse()?;
        }
        if let Some(host) = lookup("ISOMER_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("ISOMER_PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("ISOMER_PORT is not a valid port: {port}"))?;
        }
        if let Some(path) = lookup("ISOMER_PATH") {
            self.path = path;
        }
        if let Some(username) = lookup("ISOMER_USERNAME") {
            self.username = username;
        }
        if let Some(password) = lookup("ISOMER_PASSWORD") {
            self.password = password;
        }
        Ok(())
    }

    /// Check the configuration for values the client cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("host must not be empty");
        }
        if self.port == 0 {
            bail!("port must be between 1 and 65535");
        }
        if self.options.preview_length == 0 {
            bail!("preview length must be positive");
        }
        if let Some(hz) = self.options.loop_frequency {
            if !hz.is_finite() || hz <= 0.0 {
                bail!("loop frequency must be a positive number of Hz, got {hz}");
            }
            if self.options.loop_period().is_none() {
                bail!("loop frequency {hz} Hz gives a period outside the supported range");
            }
        }
        Ok(())
    }
}
