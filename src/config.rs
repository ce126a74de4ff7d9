use std::{env, net::SocketAddr, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

/// Where the one-off `{"notice": ...}` startup line is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerMode {
    Stdout,
    Stderr,
    Off,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub transport: Transport,
    pub bind_addr: String,
    pub bind_port: u16,
    pub resources_dir: PathBuf,
    pub banner: BannerMode,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MCP_TRANSPORT must be one of: stdio, http")]
    InvalidTransport,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("MCP_BANNER must be one of: stdout, stderr, off")]
    InvalidBanner,
    #[error("MCP_RESOURCES_DIR must not be empty")]
    EmptyResourcesDir,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let transport = match read("MCP_TRANSPORT")
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("stdio") => Transport::Stdio,
            Some("http") => Transport::Http,
            Some(_) => return Err(ConfigError::InvalidTransport),
        };

        let bind_addr = read("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = read("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8001);

        let resources_dir = match lookup("MCP_RESOURCES_DIR") {
            None => PathBuf::from("resources"),
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::EmptyResourcesDir)
            }
            Some(value) => PathBuf::from(value.trim()),
        };

        let banner = match read("MCP_BANNER")
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("stdout") => BannerMode::Stdout,
            Some("stderr") => BannerMode::Stderr,
            Some("off") | Some("0") | Some("false") => BannerMode::Off,
            Some(_) => return Err(ConfigError::InvalidBanner),
        };

        let config = Self {
            transport,
            bind_addr,
            bind_port,
            resources_dir,
            banner,
        };

        if config.transport == Transport::Http {
            let _ = config.bind_socket()?;
        }
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}
