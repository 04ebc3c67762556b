use std::time::Duration as StdDuration;

use log::{error, info};
use rocket::{
    fairing::{Fairing, Info, Kind},
    time::Duration,
    Build, Rocket,
};
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::{Deserialize, Deserializer};

use crate::model::vote::Choice;
use crate::queue::{Queue, RedisQueue};

/// Application configuration, derived from `Rocket.toml`, `ROCKET_*`
/// environment variables and the unprefixed variables listed in
/// [`crate::TEXT_ENV_KEYS`] and [`crate::TYPED_ENV_KEYS`]. This struct becomes managed state.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    options: Options,
    #[serde(default = "default_hostname", deserialize_with = "text")]
    hostname: String,
    #[serde(default = "default_voter_ttl")]
    voter_ttl: u32,
}

impl Config {
    /// Display labels for the two options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Identifies this instance on the rendered page.
    /// Configured via `HOSTNAME`.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// How long a voter cookie lives after it was last refreshed.
    /// Configured via `VOTER_TTL`, in seconds.
    pub fn voter_ttl(&self) -> Duration {
        Duration::seconds(self.voter_ttl.into())
    }
}

/// The machine's own name, or `localhost` if it has none we can print.
fn default_hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

fn default_voter_ttl() -> u32 {
    365 * 24 * 60 * 60
}

/// The display labels of the two options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Options {
    #[serde(default = "default_option_a", deserialize_with = "text")]
    option_a: String,
    #[serde(default = "default_option_b", deserialize_with = "text")]
    option_b: String,
}

impl Options {
    pub fn new(option_a: impl Into<String>, option_b: impl Into<String>) -> Self {
        Self {
            option_a: option_a.into(),
            option_b: option_b.into(),
        }
    }

    /// The label shown for `choice`.
    pub fn label(&self, choice: Choice) -> &str {
        match choice {
            Choice::A => &self.option_a,
            Choice::B => &self.option_b,
        }
    }
}

fn default_option_a() -> String {
    "Cats".to_string()
}

fn default_option_b() -> String {
    "Dogs".to_string()
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!(
            "Ballot is {:?} vs {:?}",
            config.options().label(Choice::A),
            config.options().label(Choice::B)
        );

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the vote queue.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_redis_host", deserialize_with = "text")]
    redis_host: String,
    #[serde(default = "default_redis_port")]
    redis_port: u16,
    // secrets
    #[serde(default, deserialize_with = "optional_text")]
    redis_password: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    redis_ssl: bool,
    #[serde(default = "default_redis_timeout")]
    redis_timeout: u64,
}

impl QueueConfig {
    /// `host:port` of the Redis server.
    pub fn address(&self) -> String {
        format!("{}:{}", self.redis_host, self.redis_port)
    }

    /// Whether to talk to Redis over TLS.
    pub fn ssl(&self) -> bool {
        self.redis_ssl
    }

    /// Password for Redis, if one is set. An empty password counts as none.
    pub fn password(&self) -> Option<&str> {
        self.redis_password.as_deref().filter(|p| !p.is_empty())
    }

    /// Upper bound on connecting to Redis and on each command.
    pub fn timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.redis_timeout)
    }

    /// Where and how the `redis` client connects, always selecting database 0.
    pub fn connection_info(&self) -> ConnectionInfo {
        let host = self.redis_host.clone();
        let port = self.redis_port;
        let addr = if self.redis_ssl {
            ConnectionAddr::TcpTls {
                host,
                port,
                insecure: false,
                tls_params: None,
            }
        } else {
            ConnectionAddr::Tcp(host, port)
        };
        ConnectionInfo {
            addr,
            redis: RedisConnectionInfo {
                db: 0,
                password: self.password().map(str::to_string),
                ..Default::default()
            },
        }
    }
}

fn default_redis_host() -> String {
    "redis".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_redis_timeout() -> u64 {
    5
}

/// Any single value a config source can hold. Environment values arrive
/// already parsed, so `REDIS_PASSWORD=123456` shows up as a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Unsigned(n) => n.to_string(),
            Self::Signed(n) => n.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Text(text) => text,
        }
    }
}

/// Read any scalar as its text.
fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(Scalar::into_text)
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    text(deserializer).map(Some)
}

/// Accept `true`/`1`/`yes` (any case) as set; anything else is unset.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Bool(set) => set,
        Scalar::Unsigned(n) => n == 1,
        Scalar::Signed(n) => n == 1,
        Scalar::Float(_) => false,
        Scalar::Text(text) => matches!(text.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
    })
}

/// A fairing that loads the queue config and places a [`Queue`] backed by
/// Redis into managed state. The connection itself is opened lazily by the
/// first vote.
pub struct QueueFairing;

#[rocket::async_trait]
impl Fairing for QueueFairing {
    fn info(&self) -> Info {
        Info {
            name: "Redis queue",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<QueueConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load queue config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        // Describe the connection.
        let queue = match RedisQueue::new(&config) {
            Ok(queue) => queue,
            Err(e) => {
                error!("Invalid queue config: {e}");
                return Err(rocket);
            }
        };
        info!(
            "Loaded queue config for {} (ssl={}, timeout={:?})",
            config.address(),
            config.ssl(),
            config.timeout()
        );

        // Manage the state.
        rocket = rocket.manage(Queue::new(queue));
        Ok(rocket)
    }
}

#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment, Jail};

    use super::*;

    fn queue_config(figment: Figment) -> QueueConfig {
        figment.extract().unwrap()
    }

    #[test]
    fn defaults() {
        let config: Config = Figment::new().extract().unwrap();
        assert_eq!(&Options::new("Cats", "Dogs"), config.options());
        assert_eq!(default_hostname(), config.hostname());
        assert!(!config.hostname().is_empty());
        assert_eq!(Duration::days(365), config.voter_ttl());

        let queue = queue_config(Figment::new());
        assert_eq!("redis:6379", queue.address());
        assert_eq!(None, queue.password());
        assert!(!queue.ssl());
        assert_eq!(StdDuration::from_secs(5), queue.timeout());
    }

    #[test]
    fn labels() {
        let config: Config = Figment::new()
            .merge(Serialized::default("option_a", "Tea"))
            .merge(Serialized::default("option_b", "Coffee"))
            .extract()
            .unwrap();
        assert_eq!("Tea", config.options().label(Choice::A));
        assert_eq!("Coffee", config.options().label(Choice::B));
    }

    #[test]
    fn scalar_settings_read_as_text() {
        let config: Config = Figment::new()
            .merge(Serialized::default("option_a", 1))
            .merge(Serialized::default("option_b", true))
            .merge(Serialized::default("hostname", 42))
            .extract()
            .unwrap();
        assert_eq!(&Options::new("1", "true"), config.options());
        assert_eq!("42", config.hostname());

        let queue = queue_config(
            Figment::new()
                .merge(Serialized::default("redis_host", 10))
                .merge(Serialized::default("redis_password", 123456)),
        );
        assert_eq!("10:6379", queue.address());
        assert_eq!(Some("123456"), queue.password());
    }

    #[test]
    fn environment_values_keep_their_text() {
        Jail::expect_with(|jail| {
            jail.set_env("REDIS_PASSWORD", "007");
            jail.set_env("OPTION_A", "1");
            jail.set_env("OPTION_B", "true");
            jail.set_env("HOSTNAME", "42");
            jail.set_env("REDIS_PORT", "6380");
            jail.set_env("REDIS_SSL", "yes");
            jail.set_env("REDIS_TIMEOUT", "2");
            jail.set_env("VOTER_TTL", "600");

            let config: Config = crate::figment().extract()?;
            assert_eq!(&Options::new("1", "true"), config.options());
            assert_eq!("42", config.hostname());
            assert_eq!(Duration::seconds(600), config.voter_ttl());

            let queue: QueueConfig = crate::figment().extract()?;
            assert_eq!(Some("007"), queue.password());
            assert_eq!("redis:6380", queue.address());
            assert!(queue.ssl());
            assert_eq!(StdDuration::from_secs(2), queue.timeout());
            Ok(())
        });
    }

    #[test]
    fn ssl_flag_spellings() {
        for (value, expected) in [
            ("true", true),
            ("TRUE", true),
            ("yes", true),
            ("Yes", true),
            ("1", true),
            ("false", false),
            ("0", false),
            ("no", false),
            ("on", false),
        ] {
            let config = queue_config(
                Figment::new().merge(Serialized::default("redis_ssl", value)),
            );
            assert_eq!(expected, config.ssl(), "REDIS_SSL={value}");
        }
        let config = queue_config(Figment::new().merge(Serialized::default("redis_ssl", true)));
        assert!(config.ssl());
        let config = queue_config(Figment::new().merge(Serialized::default("redis_ssl", 1)));
        assert!(config.ssl());
    }

    #[test]
    fn connection_info_with_tls_and_password() {
        let config = queue_config(
            Figment::new()
                .merge(Serialized::default("redis_host", "cache.internal"))
                .merge(Serialized::default("redis_port", 6380))
                .merge(Serialized::default("redis_password", "p@ss:w/rd"))
                .merge(Serialized::default("redis_ssl", "true")),
        );
        let info = config.connection_info();
        assert!(matches!(
            &info.addr,
            ConnectionAddr::TcpTls { host, port: 6380, insecure: false, .. } if host == "cache.internal"
        ));
        assert_eq!(0, info.redis.db);
        assert_eq!(Some("p@ss:w/rd"), info.redis.password.as_deref());
    }

    #[test]
    fn connection_info_in_plain_text() {
        let info = queue_config(Figment::new()).connection_info();
        assert!(matches!(
            &info.addr,
            ConnectionAddr::Tcp(host, 6379) if host == "redis"
        ));
        assert_eq!(None, info.redis.password);
    }

    #[test]
    fn empty_password_is_none() {
        let config = queue_config(Figment::new().merge(Serialized::default("redis_password", "")));
        assert_eq!(None, config.password());
        assert_eq!(None, config.connection_info().redis.password);
    }

    #[test]
    fn unparsable_port_is_rejected() {
        let result = Figment::new()
            .merge(Serialized::default("redis_port", "not-a-port"))
            .extract::<QueueConfig>();
        assert!(result.is_err());
    }

    #[test]
    fn redis_client_accepts_config() {
        let config = queue_config(
            Figment::new()
                .merge(Serialized::default("redis_password", "secret"))
                .merge(Serialized::default("redis_ssl", true)),
        );
        assert!(RedisQueue::new(&config).is_ok());
    }
}
