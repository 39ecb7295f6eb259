//! App-wide configuration. Loaded once from a YAML file (`config.yaml`, or
//! whatever `DOCKET_CONFIG_FILE` points at), then optionally merged with a
//! JSON runtime config handed in by the embedding shell. Readers grab typed
//! values by key path.

use ::std::fs::File;
use ::std::path::Path;
use ::std::io::prelude::*;
use ::std::env;
use ::std::sync::RwLock;

use ::error::DResult;
use ::util::json::{self, Value, DeserializeOwned, Serialize};

lazy_static! {
    /// create a static/global CONFIG var. starts out with our defaults, which
    /// `load_config()` layers the config file over.
    static ref CONFIG: RwLock<Value> = RwLock::new(default_config());
}

/// The config values we fall back on when the config file is missing a key
/// (or missing entirely, which is how the tests run).
fn default_config() -> Value {
    json!({
        "loglevel": "warn",
        "data_folder": ":memory:",
        "sync": {
            "mode": "local-only",
            "last_writer": "local",
            "enable_outgoing": true,
        },
        "backup": {
            "remember_folder": true,
            "download_folder": "",
        },
        "eviction": {
            "enabled": true,
            "interval_ms": 30000,
            "min_significant_bytes": 1048576,
        },
        "storage": {
            "quota_bytes": 0,
            "warn_ratio": 0.8,
        },
    })
}

/// Recursively merge object values from `from` into `into`. Scalars and
/// arrays overwrite, objects merge key by key.
fn merge_vals(into: &mut Value, from: &Value) {
    match (into, from) {
        (&mut Value::Object(ref mut into_map), &Value::Object(ref from_map)) => {
            for (key, val) in from_map {
                let merged = match into_map.get_mut(key) {
                    Some(existing) => {
                        merge_vals(existing, val);
                        true
                    }
                    None => false,
                };
                if !merged {
                    into_map.insert(key.clone(), val.clone());
                }
            }
        }
        (into, from) => {
            *into = from.clone();
        }
    }
}

/// Load/parse our config file over the defaults. A missing file is not an
/// error (we run on defaults), a present-but-broken file is.
pub fn load_config(location: Option<String>) -> DResult<()> {
    let path_str = match env::var("DOCKET_CONFIG_FILE") {
        Ok(x) => x,
        Err(_) => match location {
            Some(x) => x,
            None => String::from("config.yaml"),
        },
    };
    let path = Path::new(&path_str[..]);
    let mut config = default_config();
    if path.exists() {
        let mut file = File::open(&path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let data: Value = json::parse_yaml(&contents)?;
        merge_vals(&mut config, &data);
    }
    let mut guard = (*CONFIG).write().unwrap();
    *guard = config;
    Ok(())
}

/// Merge a runtime config (JSON, from the embedding shell) over whatever we
/// have loaded. Runtime keys win.
pub fn merge(runtime: &Value) -> DResult<()> {
    let mut guard = (*CONFIG).write().unwrap();
    merge_vals(&mut *guard, runtime);
    Ok(())
}

/// Get a typed value out of our config
pub fn get<T: DeserializeOwned>(keys: &[&str]) -> DResult<T> {
    let guard = (*CONFIG).read().unwrap();
    json::get(keys, &guard).map_err(|e| From::from(e))
}

/// Like `get`, but None on a missing key instead of an error
pub fn get_opt<T: DeserializeOwned>(keys: &[&str]) -> Option<T> {
    let guard = (*CONFIG).read().unwrap();
    json::get_opt(keys, &guard)
}

/// Set a value into our config
pub fn set<T: Serialize>(keys: &[&str], val: &T) -> DResult<()> {
    let mut guard = (*CONFIG).write().unwrap();
    json::set(keys, &mut guard, val).map_err(|e| From::from(e))
}
