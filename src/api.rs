//! The Api system is responsible for talking to the authoritative Docket
//! server. It only knows how to fire one logical operation (method +
//! resource path + optional JSON body) and report success or failure; the
//! replayer decides what to do with the answers.

use ::std::sync::RwLock;
use ::std::time::Duration;

use ::reqwest;
pub use ::reqwest::Method;
pub use ::reqwest::StatusCode as Status;
use ::base64;

use ::util::json::{self, Value};
use ::error::{DError, DResult};

/// The delivery seam the replayer drains through. The real implementation is
/// `Api`; tests (and a hypothetical second backend) supply their own.
pub trait RemoteDelivery: Send + Sync {
    fn deliver(&self, method: Method, resource: &str, body: Option<Value>) -> DResult<Value>;
}

/// Holds our Api configuration: any mutable fields the Api needs to build
/// URLs or make decisions.
struct ApiConfig {
    endpoint: Option<String>,
    auth: Option<String>,
}

impl ApiConfig {
    fn new() -> ApiConfig {
        ApiConfig {
            endpoint: None,
            auth: None,
        }
    }
}

/// Our Api object. Responsible for making outbound calls to the sync server.
pub struct Api {
    config: RwLock<ApiConfig>,
}

impl Api {
    pub fn new() -> Api {
        Api {
            config: RwLock::new(ApiConfig::new()),
        }
    }

    /// Point the Api at a server (set when the Remote sync mode is
    /// activated).
    pub fn set_endpoint(&self, url: String) {
        let mut guard = self.config.write().unwrap();
        guard.endpoint = Some(url);
    }

    /// Set the API's authentication from the configured sync token
    pub fn set_auth(&self, token: String) {
        let auth_str = String::from("sync:") + &token;
        let base_auth = base64::encode(&Vec::from(auth_str.as_bytes()));
        let mut guard = self.config.write().unwrap();
        guard.auth = Some(String::from("Basic ") + &base_auth);
    }

    /// Clear out the API auth
    pub fn clear_auth(&self) {
        let mut guard = self.config.write().unwrap();
        guard.auth = None;
    }

    /// Send out an API request. 2xx is success; anything else (including
    /// never reaching the server) is a delivery failure the caller records.
    pub fn call(&self, method: Method, resource: &str, data: Option<Value>) -> DResult<Value> {
        let (endpoint, auth) = {
            let guard = self.config.read().unwrap();
            (guard.endpoint.clone(), guard.auth.clone())
        };
        let endpoint = match endpoint {
            Some(x) => x,
            None => return Err(DError::MissingData(format!("api::call() -- no endpoint set (sync mode not remote?)"))),
        };
        info!("api::call() -- req: {} {}", method, resource);
        let mut url = String::with_capacity(endpoint.len() + resource.len());
        url.push_str(&endpoint[..]);
        url.push_str(resource);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DError::Network(format!("api::call() -- building client: {}", e)))?;
        let mut req = client.request(method.clone(), &url[..]);
        match auth {
            Some(x) => req = req.header("Authorization", &x[..]),
            None => (),
        }
        match data {
            Some(ref body) => req = req.json(body),
            None => (),
        }
        let mut res = req.send()
            .map_err(|e| DError::Network(format!("{}", e)))?;
        if !res.status().is_success() {
            return Err(DError::Api(res.status()));
        }
        let out = res.text()
            .map_err(|e| DError::Network(format!("{}", e)))?;
        info!("api::call() -- res({}): {} {}", out.len(), method, resource);
        if out.len() == 0 {
            return Ok(Value::Null);
        }
        match json::parse(&out) {
            Ok(x) => Ok(x),
            Err(e) => {
                // a 2xx with a body we can't read is still a success; the
                // replayer only needs the acknowledgment
                warn!("api::call() -- unparseable response body: {}", e);
                Ok(Value::Null)
            }
        }
    }

    /// Convenience function for api.call(GET)
    #[allow(dead_code)]
    pub fn get(&self, resource: &str) -> DResult<Value> {
        self.call(Method::GET, resource, None)
    }

    /// Convenience function for api.call(POST)
    pub fn post(&self, resource: &str, data: Value) -> DResult<Value> {
        self.call(Method::POST, resource, Some(data))
    }

    /// Convenience function for api.call(PUT)
    pub fn put(&self, resource: &str, data: Value) -> DResult<Value> {
        self.call(Method::PUT, resource, Some(data))
    }

    /// Convenience function for api.call(DELETE)
    pub fn delete(&self, resource: &str) -> DResult<Value> {
        self.call(Method::DELETE, resource, None)
    }
}

impl RemoteDelivery for Api {
    fn deliver(&self, method: Method, resource: &str, body: Option<Value>) -> DResult<Value> {
        self.call(method, resource, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_to_call_without_endpoint() {
        let api = Api::new();
        let res = api.get("/articles/art_123");
        match res {
            Err(DError::MissingData(..)) => {}
            _ => panic!("expected MissingData without an endpoint"),
        }
    }

    #[test]
    fn auth_is_basic_over_token() {
        let api = Api::new();
        api.set_auth(String::from("sekrit"));
        let guard = api.config.read().unwrap();
        let auth = guard.auth.as_ref().unwrap();
        assert!(auth.starts_with("Basic "));
    }
}
