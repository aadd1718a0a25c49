//! Typed configuration, overridable by `ODB_CONF_*` environment variables
//! read once at construction. Not a config-file format.

use crate::types::DEFAULT_TCP_PORT;
use crate::{Error, Result};

const ENV_ENABLED: &str = "ODB_CONF_ENABLED";
const ENV_NOSTART: &str = "ODB_CONF_NOSTART";
const ENV_MODE_SERVER_CLI: &str = "ODB_CONF_MODE_SERVER_CLI";
const ENV_SERVER_CLI_SIGHANDLER: &str = "ODB_CONF_SERVER_CLI_SIGHANDLER";
const ENV_MODE_TCP: &str = "ODB_CONF_MODE_TCP";
const ENV_TCP_PORT: &str = "ODB_CONF_TCP_PORT";

/// Options read by the host VM's embedded debugger. Each field may be
/// overridden by the environment variable of the same shape; only the
/// literal string `"1"` flips a boolean default to true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Master switch; when false, the per-instruction hook is a no-op.
    pub enabled: bool,
    /// Force the debugger to `stopped` before the first instruction.
    pub nostart: bool,
    /// Enable the on-server stdin/stdout CLI.
    pub mode_server_cli: bool,
    /// Install a SIGINT handler that sets the stop-latch.
    pub server_cli_sighandler: bool,
    /// Enable the TCP server handler.
    pub mode_tcp: bool,
    /// Listen port for the TCP handler.
    pub tcp_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            enabled: false,
            nostart: false,
            mode_server_cli: false,
            server_cli_sighandler: true,
            mode_tcp: false,
            tcp_port: DEFAULT_TCP_PORT,
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => v == "1",
        Err(_) => default,
    }
}

impl ServerConfig {
    /// Starts from `base`, then applies any `ODB_CONF_*` variables present
    /// in the process environment.
    pub fn from_env(base: ServerConfig) -> Result<Self> {
        let mut conf = base;
        conf.enabled = env_bool(ENV_ENABLED, conf.enabled);
        conf.nostart = env_bool(ENV_NOSTART, conf.nostart);
        conf.mode_server_cli = env_bool(ENV_MODE_SERVER_CLI, conf.mode_server_cli);
        conf.server_cli_sighandler =
            env_bool(ENV_SERVER_CLI_SIGHANDLER, conf.server_cli_sighandler);
        conf.mode_tcp = env_bool(ENV_MODE_TCP, conf.mode_tcp);
        if let Ok(v) = std::env::var(ENV_TCP_PORT) {
            conf.tcp_port = v
                .parse()
                .map_err(|_| Error::precondition(format!("{ENV_TCP_PORT}: invalid port {v:?}")))?;
        }
        Ok(conf)
    }
}

/// Remote CLI client configuration: host/port to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_TCP_PORT,
        }
    }
}
