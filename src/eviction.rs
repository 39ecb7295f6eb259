//! The eviction monitor watches for the host environment silently throwing
//! our data away. It never fixes anything -- it only raises events
//! (`db-evicted`, `storage-warning`) that the backup-prompt UI consumes.
//!
//! The trick is a marker record written into the *monitored* store, with a
//! memory of past observations kept in the separate kv store: if the marker
//! disappears while our notes say there used to be real data, something ate
//! the database out from under us. A usage sample that collapses to less
//! than half of a previously-significant size says the same thing.

use ::std::sync::{Arc, RwLock};

use ::config;
use ::error::DResult;
use ::messaging;
use ::storage::Storage;
use ::sync::{SyncConfig, Syncer};
use ::util;

const MARKER_KEY: &'static str = "eviction-marker";
const LAST_USAGE_KEY: &'static str = "eviction-last-usage";
const HAD_DATA_KEY: &'static str = "eviction-had-data";

/// Why we think the store was evicted. Carried on the `db-evicted` event.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum EvictionReason {
    /// Our marker vanished while past observations showed real data.
    #[serde(rename = "marker-missing")]
    MarkerMissing,
    /// Usage collapsed to under half of a previously-significant sample.
    #[serde(rename = "usage-collapsed")]
    UsageCollapsed,
}

/// The pure decision function: given what we knew and what we see, did an
/// eviction (probably) happen? Keeping this free of storage/config makes
/// the state machine testable on its own.
pub fn assess(marker_present: bool, had_data: bool, prev_usage: Option<u64>, usage: u64, min_significant: u64) -> Option<EvictionReason> {
    if !marker_present && had_data {
        return Some(EvictionReason::MarkerMissing);
    }
    match prev_usage {
        Some(prev) => {
            if prev >= min_significant && usage < prev / 2 {
                return Some(EvictionReason::UsageCollapsed);
            }
        }
        None => {}
    }
    None
}

/// Periodically samples the store and raises data-loss-risk events.
pub struct EvictionMonitor {
    /// Shared sync config; gives us the quit/pause switches.
    config: Arc<RwLock<SyncConfig>>,

    /// The store being watched (holds the marker).
    db: Arc<RwLock<Option<Storage>>>,

    /// The separate kv store that remembers our observations. Separate on
    /// purpose: it has to survive the eviction of `db` to be any use.
    kv: Arc<RwLock<Option<Storage>>>,
}

impl EvictionMonitor {
    pub fn new(config: Arc<RwLock<SyncConfig>>, db: Arc<RwLock<Option<Storage>>>, kv: Arc<RwLock<Option<Storage>>>) -> EvictionMonitor {
        EvictionMonitor {
            config: config,
            db: db,
            kv: kv,
        }
    }

    fn kv_get_u64(&self, key: &str) -> DResult<Option<u64>> {
        let val = with_db!{ kv, self.kv, "EvictionMonitor.kv_get_u64()",
            kv.kv_get(key)?
        };
        match val {
            Some(x) => Ok(Some(x.parse()?)),
            None => Ok(None),
        }
    }

    /// Run one observation/assessment cycle.
    pub fn check(&self) -> DResult<()> {
        let (usage, count, marker) = with_db!{ db, self.db, "EvictionMonitor.check()",
            (db.usage_bytes(), db.count_all()?, db.kv_get(MARKER_KEY)?)
        };
        let prev_usage = self.kv_get_u64(LAST_USAGE_KEY)?;
        let had_data = {
            let flagged = with_db!{ kv, self.kv, "EvictionMonitor.check()",
                kv.kv_get(HAD_DATA_KEY)?
            };
            flagged.map(|x| x == "1").unwrap_or(false)
        };
        let min_significant: u64 = config::get(&["eviction", "min_significant_bytes"]).unwrap_or(1048576);

        if marker.is_none() && !had_data && count == 0 {
            // first boot: empty store, no history. write the marker and move
            // along -- this is initialization, not data loss.
            info!("EvictionMonitor.check() -- first boot, writing marker");
        } else {
            match assess(marker.is_some(), had_data, prev_usage, usage, min_significant) {
                Some(reason) => {
                    warn!("EvictionMonitor.check() -- eviction suspected ({:?}): usage {} -> {}", reason, prev_usage.unwrap_or(0), usage);
                    messaging::ui_event("db-evicted", &json!({
                        "reason": reason,
                        "usage": usage,
                        "prev_usage": prev_usage,
                        "records": count,
                    }))?;
                }
                None => {
                    self.check_quota(usage)?;
                }
            }
        }

        // (re)write the marker and bring our observations up to date. after
        // a detected eviction this re-arms the state machine with the store
        // as it is now.
        with_db!{ db, self.db, "EvictionMonitor.check()",
            match db.kv_get(MARKER_KEY)? {
                Some(_) => {}
                None => db.kv_set(MARKER_KEY, &format!("{}", util::time_ms()))?,
            }
        }
        with_db!{ kv, self.kv, "EvictionMonitor.check()",
            kv.kv_set(LAST_USAGE_KEY, &format!("{}", usage))?;
            kv.kv_set(HAD_DATA_KEY, &String::from(if count > 0 { "1" } else { "0" }))?;
        }
        Ok(())
    }

    /// High-water-mark warning, separate from eviction: usage crossing the
    /// configured ratio of quota means "prompt the user to back up before
    /// the browser decides for them".
    fn check_quota(&self, usage: u64) -> DResult<()> {
        let quota: u64 = config::get(&["storage", "quota_bytes"]).unwrap_or(0);
        if quota == 0 { return Ok(()); }
        let warn_ratio: f64 = config::get(&["storage", "warn_ratio"]).unwrap_or(0.8);
        let ratio = (usage as f64) / (quota as f64);
        if ratio >= warn_ratio {
            messaging::ui_event("storage-warning", &json!({
                "usage": usage,
                "quota": quota,
                "ratio": ratio,
            }))?;
        }
        Ok(())
    }
}

impl Syncer for EvictionMonitor {
    fn get_name(&self) -> &'static str {
        "eviction"
    }

    fn get_config(&self) -> Arc<RwLock<SyncConfig>> {
        self.config.clone()
    }

    fn get_delay(&self) -> u64 {
        config::get(&["eviction", "interval_ms"]).unwrap_or(30000)
    }

    fn run_sync(&self) -> DResult<()> {
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::schema;
    use ::util::json;

    #[test]
    fn assess_state_machine() {
        let mb = 1024 * 1024;
        // 10MB -> 2MB with the marker gone
        assert_eq!(assess(false, true, Some(10 * mb), 2 * mb, mb), Some(EvictionReason::MarkerMissing));
        // usage collapse alone is enough, marker or not
        assert_eq!(assess(true, true, Some(10 * mb), 2 * mb, mb), Some(EvictionReason::UsageCollapsed));
        // 10MB -> 9MB is normal churn
        assert_eq!(assess(true, true, Some(10 * mb), 9 * mb, mb), None);
        // small stores never trip the usage heuristic
        assert_eq!(assess(true, false, Some(1000), 200, mb), None);
        // missing marker with no history is first boot, not eviction
        assert_eq!(assess(false, false, None, 0, mb), None);
    }

    fn pre_test() -> (EvictionMonitor, Arc<RwLock<Option<Storage>>>, Arc<RwLock<Option<Storage>>>) {
        let config = Arc::new(RwLock::new(SyncConfig::new()));
        let db = Arc::new(RwLock::new(Some(Storage::new(&String::from(":memory:"), schema::get_schema()).unwrap())));
        let kv = Arc::new(RwLock::new(Some(Storage::new(&String::from(":memory:"), json::obj()).unwrap())));
        let monitor = EvictionMonitor::new(config, db.clone(), kv.clone());
        (monitor, db, kv)
    }

    #[test]
    fn first_boot_writes_marker_quietly() {
        let (monitor, db, _kv) = pre_test();
        monitor.check().unwrap();
        let guard = db.write().unwrap();
        assert!(guard.as_ref().unwrap().kv_get(MARKER_KEY).unwrap().is_some());
    }

    #[test]
    fn detects_marker_loss_as_eviction() {
        let (monitor, db, _kv) = pre_test();
        // boot, store a record, observe
        monitor.check().unwrap();
        {
            let guard = db.write().unwrap();
            guard.as_ref().unwrap().store_value("articles", &json!({"id": "art_1", "headline": "x"})).unwrap();
        }
        monitor.check().unwrap();

        // simulate host eviction: replace the store wholesale (marker and
        // data gone), kv memory intact
        {
            let mut guard = db.write().unwrap();
            *guard = Some(Storage::new(&String::from(":memory:"), schema::get_schema()).unwrap());
        }

        let fired = ::std::sync::Arc::new(RwLock::new(Vec::new()));
        let fired2 = fired.clone();
        ::messaging::bind("db-evicted", move |val| {
            fired2.write().unwrap().push(val.clone());
        }, "eviction-test");

        monitor.check().unwrap();
        ::messaging::unbind("db-evicted", "eviction-test");

        let events = fired.read().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(json::get::<String>(&["reason"], &events[0]).unwrap(), "marker-missing");

        // the monitor re-armed: a quiet follow-up check, no repeat event
        monitor.check().unwrap();
    }
}
