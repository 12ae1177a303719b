//! Connection settings for the store client.

use std::time::Duration;

/// Name the tool registers with `CLIENT SETNAME`.
pub const CLIENT_NAME: &str = "redis-doctor";

/// Default per round trip timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and how to connect.
///
/// Built explicitly by the caller (the binary gathers it from flags and
/// `REDIS_*` environment variables); nothing is read from globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_name: String,
    /// Upper bound for connecting and for each read/write on the socket.
    pub timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            username: None,
            password: None,
            client_name: CLIENT_NAME.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// `host:port`, used for logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connection_info(&self) -> redis::ConnectionInfo {
        redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: redis::RedisConnectionInfo {
                db: self.db,
                username: non_empty(&self.username),
                password: non_empty(&self.password),
                ..Default::default()
            },
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
