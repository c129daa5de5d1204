//! Server configuration from the environment.

use loto_room::RegistryConfig;

/// Address used when neither `LOTO_BIND` nor `PORT` is set.
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Runtime settings for the binary.
///
/// | Variable            | Meaning                                    |
/// |---------------------|--------------------------------------------|
/// | `LOTO_BIND`         | full bind address, e.g. `127.0.0.1:4000`   |
/// | `PORT`              | port on `0.0.0.0`, used if `LOTO_BIND` unset |
/// | `LOTO_ROOM_CHANNEL` | room actor command channel capacity        |
/// | `RUST_LOG`          | log filter, read by the subscriber in main |
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub room_channel_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            room_channel_size: RegistryConfig::default().channel_size,
        }
    }
}

impl ServerConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, crate::ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unset or blank values fall back
    /// to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, crate::ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(bind) = get("LOTO_BIND") {
            config.bind_addr = bind.trim().to_string();
        } else if let Some(port) = get("PORT") {
            let port: u16 = port.trim().parse().map_err(|_| {
                crate::ServerError::Config(format!("PORT must be a port number, got {port:?}"))
            })?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(size) = get("LOTO_ROOM_CHANNEL") {
            config.room_channel_size = size
                .trim()
                .parse()
                .ok()
                .filter(|&n: &usize| n > 0)
                .ok_or_else(|| {
                    crate::ServerError::Config(format!(
                        "LOTO_ROOM_CHANNEL must be a positive integer, got {size:?}"
                    ))
                })?;
        }
        Ok(config)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            channel_size: self.room_channel_size,
        }
    }
}
