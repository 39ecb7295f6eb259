//! A small collection of utilities for dealing with JSON (and, for config
//! loading, YAML) values. Everything in the crate that touches serialized
//! data goes through here so the error type stays uniform.

use ::std::error::Error;
use ::std::convert::From;

use ::serde_json;
use ::serde_json::Error as SerdeJsonError;
use ::serde_yaml;
use ::serde_yaml::Error as SerdeYamlError;
pub use ::serde_json::Value;
pub use ::serde_json::Map;
pub use ::serde::de::DeserializeOwned;
pub use ::serde::ser::Serialize;

quick_error! {
    #[derive(Debug)]
    pub enum JSONError {
        Boxed(err: Box<dyn Error + Send + Sync>) {
            description(err.description())
            display("json: error: {}", err)
        }
        Parse(err: SerdeJsonError) {
            cause(err)
            description("parse error")
            display("json: parse error: {}", err)
        }
        Stringify(err: SerdeJsonError) {
            cause(err)
            description("stringify error")
            display("json: stringify error: {}", err)
        }
        DeadEnd {
            description("dead end")
            display("json: lookup dead end")
        }
        NotFound(key: String) {
            description("key not found")
            display("json: key not found: {}", key)
        }
        InvalidKey(key: String) {
            description("invalid key")
            display("json: invalid key for object: {}", key)
        }
    }
}

macro_rules! from_err {
    ($t:ty) => (
        impl From<$t> for JSONError {
            fn from(err: $t) -> JSONError {
                JSONError::Boxed(Box::new(err))
            }
        }
    )
}

from_err!(::std::io::Error);
from_err!(SerdeYamlError);

pub type JResult<T> = Result<T, JSONError>;

/// Parse a JSON string into something deserializable
pub fn parse<T: DeserializeOwned>(string: &String) -> JResult<T> {
    serde_json::from_str(string).map_err(JSONError::Parse)
}

/// Parse a JSON byte slice into something deserializable
pub fn parse_bytes<T: DeserializeOwned>(bytes: &[u8]) -> JResult<T> {
    serde_json::from_slice(bytes).map_err(JSONError::Parse)
}

/// Parse a YAML string and return a Value type
pub fn parse_yaml(string: &String) -> JResult<Value> {
    let data: Value = serde_yaml::from_str(string)?;
    Ok(data)
}

/// Turn a JSON-serializable object into a Result<String> of JSON.
pub fn stringify<T: Serialize>(obj: &T) -> JResult<String> {
    serde_json::to_string(&obj).map_err(|e| JSONError::Stringify(e))
}

/// Turn a JSON-serializable object into a Result<Value>
pub fn to_val<T: Serialize>(obj: &T) -> JResult<Value> {
    serde_json::to_value(obj).map_err(|e| JSONError::Stringify(e))
}

/// Turn a JSON Value into an object that implements Deserialize
pub fn from_val<T: DeserializeOwned>(val: Value) -> JResult<T> {
    serde_json::from_value(val).map_err(|e| JSONError::Parse(e))
}

/// Make a blank JSON object
pub fn obj() -> Value {
    Value::Object(Map::new())
}

/// Walk a JSON structure, given a key path. Returns a reference to the found
/// value, if any.
pub fn walk<'a>(keys: &[&str], data: &'a Value) -> JResult<&'a Value> {
    if keys.len() == 0 { return Ok(data); }

    let key = keys[0];
    match *data {
        Value::Object(ref obj) => {
            match obj.get(key) {
                Some(d) => walk(&keys[1..], d),
                None => Err(JSONError::NotFound(key.to_owned())),
            }
        },
        Value::Array(ref arr) => {
            let idx: usize = match key.parse() {
                Ok(x) => x,
                Err(_) => return Err(JSONError::InvalidKey(key.to_owned())),
            };
            match arr.get(idx) {
                Some(d) => walk(&keys[1..], d),
                None => Err(JSONError::NotFound(key.to_owned())),
            }
        },
        _ => Err(JSONError::DeadEnd),
    }
}

/// Like `walk`, but deserializes the found value into a type.
pub fn get<T: DeserializeOwned>(keys: &[&str], value: &Value) -> JResult<T> {
    let found = walk(keys, value)?;
    from_val(found.clone())
}

/// Like `get`, but returns an Option instead of erroring on a missing key.
pub fn get_opt<T: DeserializeOwned>(keys: &[&str], value: &Value) -> Option<T> {
    match get(keys, value) {
        Ok(x) => Some(x),
        Err(_) => None,
    }
}

/// Set a serializable value into a JSON object at the given key path,
/// creating intermediate objects as needed.
pub fn set<T: Serialize>(keys: &[&str], container: &mut Value, to: &T) -> JResult<()> {
    if keys.len() == 0 { return Err(JSONError::DeadEnd); }

    let key = keys[0];
    match *container {
        Value::Object(ref mut obj) => {
            if keys.len() == 1 {
                obj.insert(String::from(key), to_val(to)?);
                return Ok(());
            }
            if !obj.contains_key(key) {
                obj.insert(String::from(key), Value::Object(Map::new()));
            }
            match obj.get_mut(key) {
                Some(next) => set(&keys[1..], next, to),
                None => Err(JSONError::NotFound(key.to_owned())),
            }
        },
        _ => Err(JSONError::InvalidKey(key.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_walk() {
        let val: Value = parse(&String::from(r#"{"case":{"city":"baltimore","victims":2}}"#)).unwrap();
        assert_eq!(get::<String>(&["case", "city"], &val).unwrap(), "baltimore");
        assert_eq!(get::<u64>(&["case", "victims"], &val).unwrap(), 2);
        assert!(get::<String>(&["case", "nope"], &val).is_err());
        assert_eq!(get_opt::<String>(&["case", "nope"], &val), None);
    }

    #[test]
    fn sets_deep_keys() {
        let mut val = obj();
        set(&["sync", "mode"], &mut val, &String::from("remote")).unwrap();
        assert_eq!(get::<String>(&["sync", "mode"], &val).unwrap(), "remote");
        set(&["sync", "mode"], &mut val, &String::from("local-only")).unwrap();
        assert_eq!(get::<String>(&["sync", "mode"], &val).unwrap(), "local-only");
    }

    #[test]
    fn yaml() {
        let val = parse_yaml(&String::from("loglevel: info\nstorage:\n  quota_bytes: 1024\n")).unwrap();
        assert_eq!(get::<String>(&["loglevel"], &val).unwrap(), "info");
        assert_eq!(get::<u64>(&["storage", "quota_bytes"], &val).unwrap(), 1024);
    }
}
