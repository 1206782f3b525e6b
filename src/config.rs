/*!
 * Server configuration
 *
 * A plain struct with defaults. `from_env` is a convenience for the
 * bundled binary — not a general-purpose config-file loader, and there
 * is deliberately no `serde` or config-crate dependency here.
 */

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub enable_aof: bool,
    pub aof_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "127.0.0.1:6379".parse().expect("valid default address"),
            enable_aof: false,
            aof_file: PathBuf::from("pedis.aof"),
        }
    }
}

impl ServerConfig {
    /// Reads `PEDIS_BIND_ADDR`, `PEDIS_AOF`, and `PEDIS_AOF_FILE` from the
    /// environment, falling back to defaults for anything unset or
    /// unparseable (an unparseable bind address is logged and ignored
    /// rather than treated as fatal — bootstrap still has the final say).
    pub fn from_env() -> ServerConfig {
        let mut config = ServerConfig::default();

        if let Ok(addr) = env::var("PEDIS_BIND_ADDR") {
            match addr.parse() {
                Ok(parsed) => config.bind_addr = parsed,
                Err(e) => log::warn!("ignoring invalid PEDIS_BIND_ADDR {:?}: {}", addr, e),
            }
        }

        if let Ok(flag) = env::var("PEDIS_AOF") {
            config.enable_aof = matches!(flag.as_str(), "1" | "true" | "yes" | "on");
        }

        if let Ok(path) = env::var("PEDIS_AOF_FILE") {
            config.aof_file = PathBuf::from(path);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(
            config.bind_addr,
            "127.0.0.1:6379".parse::<SocketAddr>().unwrap()
        );
        assert!(!config.enable_aof);
        assert_eq!(config.aof_file, PathBuf::from("pedis.aof"));
    }
}
