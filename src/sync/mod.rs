//! The sync system is responsible for pushing local changes up to the
//! authoritative Docket server, when one is configured at all.
//!
//! All changes to data happen locally first -- the app is fully usable
//! offline -- and the outbox/replayer pair here drains the backlog whenever
//! a server is reachable. There is deliberately no "incoming" half beyond
//! whole-record overwrites: last-writer wins, per the configured policy.
//!
//! The sync threads share a SyncConfig with the main thread, which is how
//! the app pauses/resumes/kills syncing without owning the threads.

#[macro_use]
mod macros;
pub mod outbox;
pub mod outgoing;

use ::std::thread;
use ::std::sync::{Arc, RwLock, mpsc};

use ::config;
use ::util;
use ::error::{DError, DResult};
use ::storage::Storage;
use ::api::Api;
use ::messaging;
use ::sync::outgoing::SyncOutgoing;
use ::eviction::EvictionMonitor;

/// Where (if anywhere) local writes get replicated. This is configuration,
/// not a runtime type-check: the outbox consults it on every enqueue.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncMode {
    /// No syncing, no queueing, nothing.
    Disabled,
    /// Keep everything local; records stay `pending` but nothing is queued.
    LocalOnly,
    /// Queue mutations and replay them against the given server.
    Remote {
        url: String,
        token: String,
        interval_ms: u64,
    },
}

/// What wins when local and remote disagree about a record. There is no
/// field-level merge anywhere in this system: whichever side wins, it wins
/// the whole record. `Manual` is accepted from config but needs a conflict
/// UI upstream; the core treats it like whole-record overwrite too.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LastWriter {
    Local,
    Remote,
    Manual,
}

/// This holds the configuration for the sync system. It's a separate struct
/// so it can be shared by both the sync threads and the main thread without
/// either owning the other.
pub struct SyncConfig {
    /// Whether or not to quit the sync threads
    pub quit: bool,
    /// Whether or not to run syncing
    pub enabled: bool,
    pub mode: SyncMode,
    pub last_writer: LastWriter,
}

impl SyncConfig {
    pub fn new() -> SyncConfig {
        SyncConfig {
            quit: false,
            enabled: false,
            mode: SyncMode::LocalOnly,
            last_writer: LastWriter::Local,
        }
    }

    /// Build a SyncConfig from the app config.
    pub fn from_config() -> SyncConfig {
        let mode_str: String = config::get(&["sync", "mode"]).unwrap_or(String::from("local-only"));
        let mode = match mode_str.as_ref() {
            "disabled" => SyncMode::Disabled,
            "remote" => {
                match config::get_opt::<String>(&["sync", "remote", "url"]) {
                    Some(url) => SyncMode::Remote {
                        url: url,
                        token: config::get_opt(&["sync", "remote", "token"]).unwrap_or(String::new()),
                        interval_ms: config::get_opt(&["sync", "remote", "interval_ms"]).unwrap_or(10000),
                    },
                    None => {
                        warn!("SyncConfig::from_config() -- sync.mode = remote but sync.remote.url missing, falling back to local-only");
                        SyncMode::LocalOnly
                    }
                }
            }
            "local-only" => SyncMode::LocalOnly,
            _ => {
                warn!("SyncConfig::from_config() -- bad sync.mode value ({}), falling back to local-only", mode_str);
                SyncMode::LocalOnly
            }
        };
        let writer_str: String = config::get(&["sync", "last_writer"]).unwrap_or(String::from("local"));
        let last_writer = match writer_str.as_ref() {
            "remote" => LastWriter::Remote,
            "manual" => LastWriter::Manual,
            _ => LastWriter::Local,
        };
        SyncConfig {
            quit: false,
            enabled: false,
            mode: mode,
            last_writer: last_writer,
        }
    }
}

/// A structure that tracks some state for a running sync system.
pub struct SyncState {
    pub join_handles: Vec<thread::JoinHandle<()>>,
    pub shutdown: Box<dyn Fn() + 'static + Sync + Send>,
    pub pause: Box<dyn Fn() + 'static + Sync + Send>,
    pub resume: Box<dyn Fn() + 'static + Sync + Send>,
}

/// Defines some common functions for our periodic worker objects (the
/// outbox replayer and the eviction monitor).
pub trait Syncer {
    /// Get this syncer's name
    fn get_name(&self) -> &'static str;

    /// Get a copy of the current sync config
    fn get_config(&self) -> Arc<RwLock<SyncConfig>>;

    /// Run one pass of this syncer. This is the meat.
    fn run_sync(&self) -> DResult<()>;

    /// Run any initialization this Syncer needs.
    fn init(&self) -> DResult<()> {
        Ok(())
    }

    /// Get the delay (in ms) between calls to run_sync() for this Syncer
    fn get_delay(&self) -> u64 {
        1000
    }

    /// Check to see if we should quit the thread
    fn should_quit(&self) -> bool {
        let local_config = self.get_config();
        let guard = local_config.read().unwrap();
        guard.quit
    }

    /// Check to see if we're enabled
    fn is_enabled(&self) -> bool {
        let config_enabled: bool = if self.get_name() == "outgoing" {
            config::get(&["sync", "enable_outgoing"]).unwrap_or(true)
        } else {
            config::get(&["eviction", "enabled"]).unwrap_or(true)
        };
        let local_config = self.get_config();
        let guard = local_config.read().unwrap();
        let mode_ok = if self.get_name() == "outgoing" {
            match guard.mode {
                SyncMode::Remote { .. } => true,
                _ => false,
            }
        } else {
            // the eviction monitor runs regardless of sync mode
            true
        };
        guard.enabled && config_enabled && mode_ok
    }

    /// Runs our syncer, with some quick checks on run status.
    fn runner(&self, init_tx: mpsc::Sender<DResult<()>>) {
        info!("sync::runner() -- {} init", self.get_name());
        let init_res = self.init();
        let failed = init_res.is_err();
        match init_tx.send(init_res) {
            Err(e) => error!("sync::{}::runner() -- problem sending init signal: {}", self.get_name(), e),
            _ => (),
        }
        if failed { return; }

        info!("sync::runner() -- {} main loop", self.get_name());
        while !self.should_quit() {
            let delay = if self.is_enabled() {
                match self.run_sync() {
                    Err(e) => error!("sync::runner() -- {}: main loop: {}", self.get_name(), e),
                    _ => (),
                }
                self.get_delay()
            } else {
                1000
            };
            // sleep in short slices so a shutdown doesn't sit out a long
            // delay before the thread notices
            let mut slept = 0;
            while slept < delay && !self.should_quit() {
                let chunk = if delay - slept < 250 { delay - slept } else { 250 };
                util::sleep(chunk);
                slept += chunk;
            }
        }
    }

    /// Let the UI know that we've (dis)connected to the server.
    fn connected(&self, yesno: bool) {
        messaging::ui_event("sync:connected", &yesno)
            .unwrap_or_else(|e| error!("Syncer::connected() -- error sending connected event: {}", e));
    }
}

/// Start our syncing system: one thread for the outbox replayer, one for
/// the eviction monitor.
///
/// Note that the db handles are shared (RwLock'd), not duplicated: sqlite
/// serializes us anyway and the write sets are tiny.
/// The replayer comes in from the caller (rather than being built here) so
/// manual "process queue" calls and the timer thread share one drain lock:
/// two replayers would happily double-submit around each other.
pub fn start(config: Arc<RwLock<SyncConfig>>, api: Arc<Api>, replayer: Arc<SyncOutgoing>, db: Arc<RwLock<Option<Storage>>>, kv: Arc<RwLock<Option<Storage>>>) -> DResult<SyncState> {
    // enable syncing
    {
        let mut config_guard = config.write().unwrap();
        config_guard.enabled = true;
        config_guard.quit = false;
        match config_guard.mode {
            SyncMode::Remote { ref url, ref token, .. } => {
                api.set_endpoint(url.clone());
                if token.len() > 0 {
                    api.set_auth(token.clone());
                }
            }
            _ => {}
        }
    }

    let mut join_handles = Vec::with_capacity(2);
    let mut rx_vec = Vec::with_capacity(2);

    {
        let (tx, rx) = mpsc::channel::<DResult<()>>();
        let sync = replayer.clone();
        let handle = thread::Builder::new().name(String::from("sync:outgoing")).spawn(move || {
            sync.runner(tx);
            info!("sync::start() -- outgoing shut down");
        })?;
        join_handles.push(handle);
        rx_vec.push(rx);
    }
    {
        let (tx, rx) = mpsc::channel::<DResult<()>>();
        let monitor = EvictionMonitor::new(config.clone(), db.clone(), kv.clone());
        let handle = thread::Builder::new().name(String::from("sync:eviction")).spawn(move || {
            monitor.runner(tx);
            info!("sync::start() -- eviction monitor shut down");
        })?;
        join_handles.push(handle);
        rx_vec.push(rx);
    }

    // wait on an Ok(()) from each thread (sent after successful init) or an
    // Err() if one of them blew up on the launch pad
    for rx in rx_vec {
        match rx.recv() {
            Ok(x) => {
                match x {
                    Err(e) => return Err(e),
                    _ => (),
                }
            },
            Err(e) => return Err(DError::Msg(format!("sync::start() -- init channel died: {}", e))),
        }
    }

    // define some callbacks the app can use to control the sync threads
    let config1 = config.clone();
    let shutdown = move || {
        let mut guard = config1.write().unwrap();
        guard.enabled = false;
        guard.quit = true;
    };
    let config2 = config.clone();
    let pause = move || {
        let mut guard = config2.write().unwrap();
        guard.enabled = false;
    };
    let config3 = config.clone();
    let resume = move || {
        let mut guard = config3.write().unwrap();
        guard.enabled = true;
    };

    Ok(SyncState {
        join_handles: join_handles,
        shutdown: Box::new(shutdown),
        pause: Box::new(pause),
        resume: Box::new(resume),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::api::RemoteDelivery;
    use ::schema;

    #[test]
    fn starts_and_quits() {
        let sync_config = Arc::new(RwLock::new(SyncConfig::new()));
        let api = Arc::new(Api::new());
        let db = Arc::new(RwLock::new(Some(Storage::new(&String::from(":memory:"), schema::get_schema()).unwrap())));
        let kv = Arc::new(RwLock::new(Some(Storage::new(&String::from(":memory:"), ::util::json::obj()).unwrap())));
        let api_c: Arc<dyn RemoteDelivery> = api.clone();
        let replayer = Arc::new(SyncOutgoing::new(sync_config.clone(), api_c, db.clone()));
        let state = start(sync_config, api, replayer, db, kv).unwrap();
        (state.shutdown)();
        let mut state = state;
        loop {
            let hn = state.join_handles.pop();
            match hn {
                Some(x) => x.join().unwrap(),
                None => break,
            }
        }
    }

    #[test]
    fn parses_modes_from_config() {
        // defaults give us local-only
        let config = SyncConfig::from_config();
        assert!(config.mode == SyncMode::LocalOnly || config.mode == SyncMode::Disabled || match config.mode { SyncMode::Remote{..} => true, _ => false });
        assert_eq!(config.enabled, false);
        assert_eq!(config.quit, false);
    }
}
