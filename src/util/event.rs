//! The Event module defines an Emitter struct/implementation that passes a
//! json `Value` as the single argument to bound functions.
//!
//! Bindings are wrapped in an RwLock, so an evented object can be bound or
//! triggered from any thread. This is what lets the sync/eviction threads
//! raise UI-bound events without knowing who (if anyone) is listening.

use ::std::sync::RwLock;
use ::std::collections::HashMap;

use ::util::json::Value;

/// Defines what type of binding we have
enum BindType {
    Every,
    Once,
}

/// Define a trait for our event callbacks.
pub trait EventThunk: Send + Sync + 'static {
    fn call_box(&self, val: &Value);
}
impl<F: Fn(&Value) + Send + Sync + 'static> EventThunk for F {
    fn call_box(&self, val: &Value) {
        (*self)(val);
    }
}

/// Holds information about a callback.
pub struct Callback {
    cb: Box<dyn EventThunk>,
    binding: BindType,
    name: String,
}

/// An alias to make returning the bindings object easier
pub type Bindings = RwLock<HashMap<String, Vec<Callback>>>;

/// The EventEmitter holds a set of event bindings and can be used as a
/// standalone event emitter object.
pub struct EventEmitter {
    _bindings: Bindings,
}

/// Defines an interface for an event emitter: binding and triggering events.
/// The only non-provided method is `bindings`.
pub trait Emitter {
    /// Grab a ref to this emitter's bindings
    fn bindings(&self) -> &Bindings;

    /// Binds a callback to an event name.
    fn do_bind(&self, event_name: &str, cb: Callback) {
        // same event name/bind name *replaces* the existing binding
        self.unbind(event_name, cb.name.as_str());
        let bindings = self.bindings();
        let mut guard = bindings.write().unwrap();
        let events = guard.entry(String::from(event_name)).or_insert(Vec::with_capacity(3));
        events.push(cb);
    }

    /// Bind a callback to an event name. The binding takes a name, which
    /// makes it easy to unbind later (by name).
    fn bind<F>(&self, event_name: &str, cb: F, bind_name: &str)
        where F: Fn(&Value) + Send + Sync + 'static
    {
        self.do_bind(event_name, Callback {
            cb: Box::new(cb),
            binding: BindType::Every,
            name: String::from(bind_name),
        });
    }

    /// Bind a one-time callback to an event name.
    fn bind_once<F>(&self, event_name: &str, cb: F, bind_name: &str)
        where F: Fn(&Value) + Send + Sync + 'static
    {
        self.do_bind(event_name, Callback {
            cb: Box::new(cb),
            binding: BindType::Once,
            name: String::from(bind_name),
        });
    }

    /// Unbind an event/listener from this emitter.
    fn unbind(&self, event_name: &str, bind_name: &str) -> bool {
        let bindings = self.bindings();
        let mut guard = bindings.write().unwrap();
        match guard.get_mut(event_name) {
            Some(x) => {
                let mut removed = false;
                for idx in (0..(x.len())).rev() {
                    if &x[idx].name == bind_name {
                        x.remove(idx);
                        removed = true;
                    }
                }
                removed
            }
            None => false
        }
    }

    /// Trigger an event. Any function bound to the event name gets fired,
    /// with `data` passed as the only argument.
    fn trigger(&self, event_name: &str, data: &Value) -> () {
        let bindings = self.bindings();
        let mut guard = bindings.write().unwrap();
        match guard.get_mut(event_name) {
            Some(x) => {
                let mut removes: Vec<usize> = Vec::new();
                for idx in 0..(x.len()) {
                    let callback = &x[idx];
                    callback.cb.call_box(data);
                    match callback.binding {
                        BindType::Once => {
                            removes.push(idx);
                        }
                        _ => (),
                    }
                }
                // reversed so our indexing is preserved as we remove
                removes.reverse();
                for idx in removes {
                    x.remove(idx);
                }
            }
            None => (),
        }
    }
}

impl EventEmitter {
    /// Make a new Emitter.
    pub fn new() -> EventEmitter {
        EventEmitter { _bindings: RwLock::new(HashMap::new()) }
    }
}

impl Emitter for EventEmitter {
    fn bindings(&self) -> &Bindings {
        &self._bindings
    }
}

impl Default for EventEmitter {
    fn default() -> EventEmitter {
        EventEmitter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::util::json::{self, Value};
    use ::std::sync::{Arc, RwLock};

    #[test]
    fn bind_emit() {
        let data = Arc::new(RwLock::new(vec![0]));
        let jval = json::parse(&String::from(r#"{"usage":1024}"#)).unwrap();
        let rdata = data.clone();
        {
            let data = data.clone();
            let cb = move |x: &Value| {
                assert_eq!(json::stringify(x).unwrap(), r#"{"usage":1024}"#);
                data.write().unwrap()[0] += 1;
            };
            let emitter = EventEmitter::new();
            emitter.bind("storage-warning", cb, "test:warn");

            assert_eq!(rdata.read().unwrap()[0], 0);
            emitter.trigger("some-other-event", &jval);
            assert_eq!(rdata.read().unwrap()[0], 0);
            emitter.trigger("storage-warning", &jval);
            assert_eq!(rdata.read().unwrap()[0], 1);
            emitter.trigger("storage-warning", &jval);
            assert_eq!(rdata.read().unwrap()[0], 2);
        }
    }

    #[test]
    fn bind_once_emit() {
        let data = Arc::new(RwLock::new(vec![0]));
        let jval = json::obj();
        let rdata = data.clone();
        {
            let data = data.clone();
            let emitter = EventEmitter::new();
            emitter.bind_once("db-evicted", move |_| {
                data.write().unwrap()[0] += 1;
            }, "test:once");

            emitter.trigger("db-evicted", &jval);
            emitter.trigger("db-evicted", &jval);
            assert_eq!(rdata.read().unwrap()[0], 1);
        }
    }

    #[test]
    fn replace_and_unbind() {
        let data = Arc::new(RwLock::new(vec![0]));
        let jval = json::obj();
        let rdata = data.clone();
        {
            let data1 = data.clone();
            let emitter = EventEmitter::new();
            emitter.bind("fire", move |_| {
                data1.write().unwrap()[0] += 1;
            }, "same-name");
            emitter.trigger("fire", &jval);
            assert_eq!(rdata.read().unwrap()[0], 1);
            // replace with a cb that does nothing
            emitter.bind("fire", move |_| { }, "same-name");
            emitter.trigger("fire", &jval);
            assert_eq!(rdata.read().unwrap()[0], 1);
            assert!(emitter.unbind("fire", "same-name"));
            assert!(!emitter.unbind("fire", "same-name"));
        }
    }
}
