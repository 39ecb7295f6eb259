#![recursion_limit="128"]

extern crate base64;
extern crate fern;
extern crate flate2;
extern crate glob;
extern crate hex;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate quick_error;
extern crate rand;
extern crate regex;
extern crate reqwest;
extern crate rusqlite;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;
extern crate serde_yaml;
extern crate sha2;
extern crate time;

#[macro_use]
pub mod error;
#[macro_use]
pub mod util;
pub mod config;
pub mod messaging;
pub mod api;
pub mod schema;
#[macro_use]
pub mod models;
pub mod storage;
pub mod fingerprint;
#[macro_use]
pub mod sync;
pub mod eviction;
pub mod snapshot;
pub mod backup;
pub mod docket;

use ::error::DResult;
use ::util::json::{self, Value};

/// Init any state/logging/etc the core needs. `config_str` is the runtime
/// config (JSON) from the embedding shell; its keys override whatever the
/// config file says. Call once, before building a `Docket`.
pub fn init(config_str: String) -> DResult<()> {
    let runtime_config: Value = match json::parse(&config_str) {
        Ok(x) => x,
        Err(e) => {
            println!("docket: problem parsing runtime config: {}", e);
            json!({})
        }
    };
    let config_location: Option<String> = json::get_opt(&["config_file"], &runtime_config);
    config::load_config(config_location)?;
    config::merge(&runtime_config)?;
    match util::logger::setup_logger() {
        Ok(_) => {}
        Err(e) => {
            println!("docket: problem setting up logging: {}", e);
            return Err(e);
        }
    }
    Ok(())
}
