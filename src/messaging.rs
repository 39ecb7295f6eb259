//! Messaging is the one-way event boundary between this core and whatever UI
//! embeds it. The eviction monitor, the backup sink, and the sync system all
//! publish here; the UI subscribes to the event names it cares about and
//! never gets called into directly.

use ::std::sync::RwLock;

use ::error::DResult;
use ::util::event::{EventEmitter, Emitter};
use ::util::json::{self, Value, Serialize};

lazy_static! {
    /// our global event emitter. module-local so the rest of the app can
    /// blast out UI events without passing an emitter around everywhere. the
    /// RwLock inside EventEmitter's bindings gives us thread safety for free.
    static ref EMITTER: EventEmitter = EventEmitter::new();

    /// events that fired before anyone was listening, so a late-subscribing
    /// UI can drain what it missed (eviction warnings mainly).
    static ref BACKLOG: RwLock<Vec<Value>> = RwLock::new(Vec::new());
}

/// Subscribe a named callback to a UI event.
pub fn bind<F>(event_name: &str, cb: F, bind_name: &str)
    where F: Fn(&Value) + Send + Sync + 'static
{
    (*EMITTER).bind(event_name, cb, bind_name);
}

/// Subscribe a one-shot named callback to a UI event.
pub fn bind_once<F>(event_name: &str, cb: F, bind_name: &str)
    where F: Fn(&Value) + Send + Sync + 'static
{
    (*EMITTER).bind_once(event_name, cb, bind_name);
}

/// Drop a named binding.
pub fn unbind(event_name: &str, bind_name: &str) -> bool {
    (*EMITTER).unbind(event_name, bind_name)
}

/// Send an event out to the UI. The payload has to carry everything the UI
/// needs to react; subscribers don't get to call back into us to ask.
pub fn ui_event<T: Serialize>(event_name: &str, data: &T) -> DResult<()> {
    let val = json::to_val(data)?;
    debug!("messaging::ui_event() -- {}", event_name);
    (*EMITTER).trigger(event_name, &val);
    let mut guard = (*BACKLOG).write().unwrap();
    guard.push(json!({"e": event_name, "d": val}));
    // don't let an unattended backlog grow without bound
    let len = guard.len();
    if len > 256 {
        guard.drain(0..(len - 256));
    }
    Ok(())
}

/// Drain any events that fired so far (oldest first).
pub fn drain_events() -> Vec<Value> {
    let mut guard = (*BACKLOG).write().unwrap();
    let drained = guard.drain(..).collect();
    drained
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::std::sync::{Arc, RwLock};

    #[test]
    fn events_reach_bindings() {
        let seen = Arc::new(RwLock::new(Vec::new()));
        let seen2 = seen.clone();
        bind("test:event", move |val| {
            seen2.write().unwrap().push(val.clone());
        }, "messaging-test");
        ui_event("test:event", &json!({"ok": true})).unwrap();
        assert_eq!(seen.read().unwrap().len(), 1);
        unbind("test:event", "messaging-test");
        ui_event("test:event", &json!({"ok": true})).unwrap();
        assert_eq!(seen.read().unwrap().len(), 1);
    }
}
