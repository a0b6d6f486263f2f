use std::env;
use std::fmt::Display;
use std::str::FromStr;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8010;
pub const DEFAULT_PING_MESSAGE: &str = "wayfarer backend is alive";

/// Backend configuration, read from the environment at bootstrap.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub ping_message: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ping_message: DEFAULT_PING_MESSAGE.to_string(),
        }
    }
}

fn load_or<T: FromStr>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match env::var(key) {
        Err(_) => default,
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("invalid {key} value {raw:?} ({e}), using default");
                default
            }
        },
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();
        ServerConfig {
            host: load_or("WAYFARER_HOST", defaults.host),
            port: load_or("WAYFARER_PORT", defaults.port),
            ping_message: load_or("WAYFARER_PING_MESSAGE", defaults.ping_message),
        }
    }
}
