#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use std::collections::BTreeMap;

use rocket::{
    figment::{
        providers::{Env, Serialized},
        Figment,
    },
    Build, Rocket,
};

use crate::config::{ConfigFairing, QueueFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod queue;

pub use config::Config;

/// Environment variables read without the `ROCKET_` prefix and kept as
/// text, so a value like `007` or `true` reaches a string setting unchanged.
pub const TEXT_ENV_KEYS: [&str; 5] = [
    "option_a",
    "option_b",
    "hostname",
    "redis_host",
    "redis_password",
];

/// Environment variables read without the `ROCKET_` prefix and parsed into
/// numbers or booleans.
pub const TYPED_ENV_KEYS: [&str; 4] = ["voter_ttl", "redis_port", "redis_ssl", "redis_timeout"];

/// Rocket's own configuration sources plus the plain environment variables in
/// [`TEXT_ENV_KEYS`] and [`TYPED_ENV_KEYS`], matched case-insensitively.
pub fn figment() -> Figment {
    rocket::Config::figment()
        .merge(Env::raw().only(&TYPED_ENV_KEYS))
        .merge(Serialized::globals(text_env(&TEXT_ENV_KEYS)))
}

/// The environment variables named by `keys`, lowercased, with their values untouched.
fn text_env(keys: &[&str]) -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| {
            let key = key.into_string().ok()?.to_ascii_lowercase();
            let value = value.into_string().ok()?;
            keys.contains(&key.as_str()).then_some((key, value))
        })
        .collect()
}

/// Assemble the server, queueing votes in Redis.
pub fn build() -> Rocket<Build> {
    rocket::custom(figment())
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(QueueFairing)
        .attach(LoggerFairing)
}

/// Assemble a server with fixed labels and hostname around an in-memory queue.
#[cfg(test)]
fn rocket_for_queue(queue: queue::MemoryQueue) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("option_a", "Cats"))
        .merge(("option_b", "Dogs"))
        .merge(("hostname", "test-host"));
    rocket::custom(figment)
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(LoggerFairing)
        .manage(queue::Queue::new(queue))
}
