//! Outgoing sync: drains the outbox against the remote server. One call to
//! `drain()` is one bounded pass -- there is no retry loop in here. Retries
//! happen because something (the sync thread's timer, a manual "process
//! queue" action, a connectivity-restored event) calls `drain()` again.

use ::std::sync::{Arc, RwLock, Mutex};

use ::error::DResult;
use ::sync::{SyncConfig, SyncMode, Syncer};
use ::storage::Storage;
use ::api::RemoteDelivery;
use ::messaging;
use ::models::model::SyncStatus;
use ::models::queue_entry::{Method, QueueEntry, QueueStatus};
use ::util::json;

/// After this many failures on one entry we start warning loudly; the entry
/// stays in the queue either way (dropping a user's write is worse than
/// nagging about it).
static MAX_ALLOWED_FAILURES: u32 = 3;

/// Holds the state for data going from docket -> server (outgoing sync).
pub struct SyncOutgoing {
    /// Holds our sync config, shared with the main thread.
    config: Arc<RwLock<SyncConfig>>,

    /// The delivery seam. In production this is the Api object.
    api: Arc<dyn RemoteDelivery>,

    /// Holds our db, which we poll for queued outgoing changes.
    db: Arc<RwLock<Option<Storage>>>,

    /// Taken for the duration of a drain pass. A second concurrent drain
    /// no-ops instead of double-submitting entries that are in flight.
    drain_lock: Mutex<()>,
}

impl SyncOutgoing {
    /// Create a new outgoing syncer
    pub fn new(config: Arc<RwLock<SyncConfig>>, api: Arc<dyn RemoteDelivery>, db: Arc<RwLock<Option<Storage>>>) -> SyncOutgoing {
        SyncOutgoing {
            config: config,
            api: api,
            db: db,
            drain_lock: Mutex::new(()),
        }
    }

    /// Grab every outgoing queue entry, in enqueue order. A `failed` status
    /// doesn't exclude an entry -- failed entries are due for retry exactly
    /// like pending ones; staleness policy lives in the UI, not here.
    fn get_queue_entries(&self) -> DResult<Vec<QueueEntry>> {
        let rows = with_db!{ db, self.db, "SyncOutgoing.get_queue_entries()",
            let mut stmt = db.conn.prepare("SELECT id, method, endpoint, body, sync_status, queued_at, failure_count, last_error FROM docket_outbox ORDER BY queued_at ASC, id ASC")?;
            let mapped = stmt.query_map(&[], |row| {
                (
                    row.get::<_, i64>("id"),
                    row.get::<_, String>("method"),
                    row.get::<_, String>("endpoint"),
                    row.get::<_, Option<String>>("body"),
                    row.get::<_, String>("sync_status"),
                    row.get::<_, i64>("queued_at"),
                    row.get::<_, i64>("failure_count"),
                    row.get::<_, Option<String>>("last_error"),
                )
            })?;
            let mut rows = Vec::new();
            for row in mapped {
                rows.push(row?);
            }
            rows
        };
        let mut entries: Vec<QueueEntry> = Vec::with_capacity(rows.len());
        for (id, method, endpoint, body, status, queued_at, failure_count, last_error) in rows {
            let body = match body {
                Some(ref x) => Some(json::parse(x)?),
                None => None,
            };
            entries.push(QueueEntry {
                id: id,
                method: Method::from_str(&method[..])?,
                endpoint: endpoint,
                body: body,
                sync_status: QueueStatus::from_str(&status[..])?,
                queued_at: queued_at,
                failure_count: failure_count as u32,
                last_error: last_error,
            });
        }
        Ok(entries)
    }

    /// Remove a confirmed entry. This is the only way entries leave the
    /// queue.
    fn delete_queue_entry(&self, entry: &QueueEntry) -> DResult<()> {
        debug!("SyncOutgoing.delete_queue_entry() -- delete {} ({} {})", entry.id, entry.method.as_str(), entry.endpoint);
        with_db!{ db, self.db, "SyncOutgoing.delete_queue_entry()",
            db.conn.execute("DELETE FROM docket_outbox WHERE id = $1", &[&entry.id])?;
        }
        Ok(())
    }

    /// Record a delivery failure on an entry: failed status, bumped failure
    /// count, last error string.
    fn mark_entry_failed(&self, entry: &QueueEntry, errstr: &String) -> DResult<()> {
        with_db!{ db, self.db, "SyncOutgoing.mark_entry_failed()",
            db.conn.execute(
                "UPDATE docket_outbox SET sync_status = $1, failure_count = failure_count + 1, last_error = $2 WHERE id = $3",
                &[&QueueStatus::Failed.as_str(), errstr, &entry.id]
            )?;
        }
        if entry.failure_count + 1 > MAX_ALLOWED_FAILURES {
            warn!("SyncOutgoing.mark_entry_failed() -- entry {} has now failed {} times ({} {}): {}", entry.id, entry.failure_count + 1, entry.method.as_str(), entry.endpoint, errstr);
        }
        Ok(())
    }

    /// Push the delivery outcome onto the record the entry mutates. Deletes
    /// have nothing local left to mark.
    fn mark_record(&self, entry: &QueueEntry, status: SyncStatus) -> DResult<()> {
        if entry.method == Method::Delete { return Ok(()); }
        let (table, id) = entry.resource()?;
        with_db!{ db, self.db, "SyncOutgoing.mark_record()",
            db.update_sync_status(&table[..], &id, status)?;
        }
        Ok(())
    }

    fn deliver(&self, entry: &QueueEntry) -> DResult<json::Value> {
        self.api.deliver(entry.method.to_http(), &entry.endpoint[..], entry.body.clone())
    }

    /// One bounded replay pass over the queue.
    ///
    /// Safe to call concurrently with itself: whoever takes the drain lock
    /// runs the pass, everyone else no-ops. Entries are processed in
    /// enqueue order; one entry's delivery failure never aborts the batch,
    /// but a failure of the queue storage itself does (and propagates).
    pub fn drain(&self) -> DResult<()> {
        let _guard = match self.drain_lock.try_lock() {
            Ok(x) => x,
            Err(_) => {
                debug!("SyncOutgoing.drain() -- drain already running, skipping");
                return Ok(());
            }
        };

        let entries = self.get_queue_entries()?;
        if entries.len() == 0 { return Ok(()); }
        info!("SyncOutgoing.drain() -- sending {} queued mutations", entries.len());

        let mut failures: Vec<QueueEntry> = Vec::new();
        for entry in entries {
            match self.deliver(&entry) {
                Ok(_) => {
                    self.delete_queue_entry(&entry)?;
                    self.mark_record(&entry, SyncStatus::Synced)?;
                }
                Err(e) => {
                    if !e.is_delivery_failure() {
                        // the queue storage itself is broken; this pass is
                        // done and the caller needs to hear about it
                        return Err(e);
                    }
                    let errstr = format!("{}", e);
                    info!("SyncOutgoing.drain() -- delivery failed for entry {} ({} {}): {}", entry.id, entry.method.as_str(), entry.endpoint, errstr);
                    self.mark_entry_failed(&entry, &errstr)?;
                    self.mark_record(&entry, SyncStatus::Failed)?;
                    let mut failed = entry;
                    failed.sync_status = QueueStatus::Failed;
                    failed.failure_count += 1;
                    failed.last_error = Some(errstr);
                    failures.push(failed);
                }
            }
        }

        if failures.len() > 0 {
            messaging::ui_event("sync:outgoing:failure", &failures)?;
        }
        Ok(())
    }
}

impl Syncer for SyncOutgoing {
    fn get_name(&self) -> &'static str {
        "outgoing"
    }

    fn get_config(&self) -> Arc<RwLock<SyncConfig>> {
        self.config.clone()
    }

    fn get_delay(&self) -> u64 {
        let guard = self.config.read().unwrap();
        match guard.mode {
            SyncMode::Remote { interval_ms, .. } => interval_ms,
            _ => 10000,
        }
    }

    fn init(&self) -> DResult<()> {
        let remote = {
            let guard = self.config.read().unwrap();
            match guard.mode {
                SyncMode::Remote { .. } => true,
                _ => false,
            }
        };
        if remote {
            self.connected(true);
        }
        Ok(())
    }

    fn run_sync(&self) -> DResult<()> {
        self.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::std::sync::atomic::{AtomicUsize, Ordering};
    use ::std::thread;
    use ::error::DError;
    use ::schema;
    use ::sync::outbox;
    use ::models::victim::Victim;
    use ::api::Method as HttpMethod;
    use ::util;
    use ::util::json::Value;

    /// Records every delivery it sees; fails the endpoints it's told to.
    struct MockRemote {
        delivered: RwLock<Vec<String>>,
        fail_endpoints: Vec<String>,
        delay_ms: u64,
        calls: AtomicUsize,
    }

    impl MockRemote {
        fn new() -> MockRemote {
            MockRemote {
                delivered: RwLock::new(Vec::new()),
                fail_endpoints: Vec::new(),
                delay_ms: 0,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl RemoteDelivery for MockRemote {
        fn deliver(&self, _method: HttpMethod, resource: &str, _body: Option<Value>) -> DResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.delay_ms > 0 { util::sleep(self.delay_ms); }
            if self.fail_endpoints.iter().any(|x| &x[..] == resource) {
                return Err(DError::Network(String::from("connection refused")));
            }
            self.delivered.write().unwrap().push(String::from(resource));
            Ok(Value::Null)
        }
    }

    fn pre_test() -> (Arc<RwLock<SyncConfig>>, Arc<RwLock<Option<Storage>>>) {
        let mut sync_config = SyncConfig::new();
        sync_config.mode = SyncMode::Remote {
            url: String::from("https://sync.example.org/api"),
            token: String::from("t"),
            interval_ms: 1000,
        };
        let config = Arc::new(RwLock::new(sync_config));
        let db = Arc::new(RwLock::new(Some(Storage::new(&String::from(":memory:"), schema::get_schema()).unwrap())));
        {
            let guard = db.write().unwrap();
            ::storage::setup_client_id(guard.as_ref().unwrap()).unwrap();
        }
        (config, db)
    }

    fn save_victim(config: &Arc<RwLock<SyncConfig>>, db: &Arc<RwLock<Option<Storage>>>, name: &str) -> String {
        let mut victim = Victim::new();
        victim.name = Some(String::from(name));
        outbox::save_record(config, db, &mut victim).unwrap();
        // keep queued_at strictly increasing between saves
        util::sleep(2);
        victim.id.clone().unwrap()
    }

    fn outbox_count(db: &Arc<RwLock<Option<Storage>>>) -> i64 {
        let guard = db.write().unwrap();
        let storage = guard.as_ref().unwrap();
        storage.conn.query_row_and_then("SELECT COUNT(*) AS count FROM docket_outbox", &[], |row| -> DResult<i64> {
            Ok(row.get_checked("count")?)
        }).unwrap()
    }

    #[test]
    fn drains_in_enqueue_order() {
        let (config, db) = pre_test();
        let id1 = save_victim(&config, &db, "first");
        let id2 = save_victim(&config, &db, "second");
        let id3 = save_victim(&config, &db, "third");

        let mock = Arc::new(MockRemote::new());
        let sync = SyncOutgoing::new(config, mock.clone(), db.clone());
        sync.drain().unwrap();

        let delivered = mock.delivered.read().unwrap();
        assert_eq!(*delivered, vec![
            format!("/victims/{}", id1),
            format!("/victims/{}", id2),
            format!("/victims/{}", id3),
        ]);
        assert_eq!(outbox_count(&db), 0);
    }

    #[test]
    fn one_failure_doesnt_poison_the_batch() {
        let (config, db) = pre_test();
        let id1 = save_victim(&config, &db, "first");
        let id2 = save_victim(&config, &db, "second");
        let id3 = save_victim(&config, &db, "third");

        let mut mock = MockRemote::new();
        mock.fail_endpoints.push(format!("/victims/{}", id2));
        let mock = Arc::new(mock);
        let sync = SyncOutgoing::new(config, mock.clone(), db.clone());
        sync.drain().unwrap();

        // 1 and 3 made it out and left the queue; 2 stayed behind, failed
        let delivered = mock.delivered.read().unwrap();
        assert_eq!(*delivered, vec![
            format!("/victims/{}", id1),
            format!("/victims/{}", id3),
        ]);
        assert_eq!(outbox_count(&db), 1);

        let entries = sync.get_queue_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sync_status, QueueStatus::Failed);
        assert_eq!(entries[0].failure_count, 1);
        assert!(entries[0].last_error.is_some());

        // record bookkeeping followed along
        let guard = db.write().unwrap();
        let storage = guard.as_ref().unwrap();
        let ok_rec = storage.get_value("victims", &id1).unwrap().unwrap();
        assert_eq!(json::get::<String>(&["sync_status"], &ok_rec).unwrap(), "synced");
        assert_eq!(json::get::<u32>(&["failure_count"], &ok_rec).unwrap(), 0);
        let bad_rec = storage.get_value("victims", &id2).unwrap().unwrap();
        assert_eq!(json::get::<String>(&["sync_status"], &bad_rec).unwrap(), "failed");
        assert_eq!(json::get::<u32>(&["failure_count"], &bad_rec).unwrap(), 1);
    }

    #[test]
    fn failed_entries_retry_on_the_next_pass() {
        let (config, db) = pre_test();
        let id1 = save_victim(&config, &db, "flaky");

        let mut mock = MockRemote::new();
        mock.fail_endpoints.push(format!("/victims/{}", id1));
        let mock = Arc::new(mock);
        let sync = SyncOutgoing::new(config.clone(), mock.clone(), db.clone());
        sync.drain().unwrap();
        assert_eq!(outbox_count(&db), 1);

        // "connectivity restored": same entry, delivery works now
        let mock2 = Arc::new(MockRemote::new());
        let sync2 = SyncOutgoing::new(config, mock2.clone(), db.clone());
        sync2.drain().unwrap();
        assert_eq!(outbox_count(&db), 0);
        assert_eq!(mock2.delivered.read().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_drains_never_double_submit() {
        let (config, db) = pre_test();
        for i in 0..4 {
            save_victim(&config, &db, &format!("victim {}", i));
        }

        let mut mock = MockRemote::new();
        mock.delay_ms = 20;
        let mock = Arc::new(mock);
        let sync = Arc::new(SyncOutgoing::new(config, mock.clone(), db.clone()));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let sync2 = sync.clone();
            handles.push(thread::spawn(move || {
                sync2.drain().unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // exactly one pass delivered anything: 4 entries, 4 calls
        assert_eq!(mock.calls.load(Ordering::SeqCst), 4);
        assert_eq!(mock.delivered.read().unwrap().len(), 4);
        assert_eq!(outbox_count(&db), 0);
    }

    #[test]
    fn empty_queue_is_a_quiet_noop() {
        let (config, db) = pre_test();
        let mock = Arc::new(MockRemote::new());
        let sync = SyncOutgoing::new(config, mock.clone(), db);
        sync.drain().unwrap();
        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
    }
}
