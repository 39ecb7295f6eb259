//! The Docket module is the container for the state of the core. The
//! embedding UI holds exactly one of these and drives everything -- writes,
//! queue processing, snapshots, backups -- through it.

use ::std::sync::{Arc, RwLock};

use ::api::{Api, RemoteDelivery};
use ::backup::BackupSink;
use ::config;
use ::error::{DError, DResult};
use ::fingerprint::{self, Match};
use ::messaging;
use ::models::article::Article;
use ::models::model::Model;
use ::schema;
use ::snapshot::{self, Manifest};
use ::storage::{self, Storage};
use ::sync::{self, SyncConfig, SyncState};
use ::sync::outbox::{self, SyncModel};
use ::sync::outgoing::SyncOutgoing;
use ::util;
use ::util::json::{self, Value};

/// What a write through the dedup gate gives back: the committed record,
/// plus any non-blocking duplicate warnings the caller should surface.
pub struct SaveOutcome {
    pub data: Value,
    pub warnings: Vec<Match>,
}

/// Defines a container for our app's state.
pub struct Docket {
    /// Small, always-local key/value storage (client id, eviction notes,
    /// backup folder ref). Initialized before -- and kept apart from -- the
    /// main db: it has to survive the main store being evicted.
    pub kv: Arc<RwLock<Option<Storage>>>,
    /// Our main document store.
    pub db: Arc<RwLock<Option<Storage>>>,
    /// Our external API object.
    pub api: Arc<Api>,
    /// Sync system configuration (shared state with the sync threads).
    pub sync_config: Arc<RwLock<SyncConfig>>,
    /// Holds our sync state data (join handles + control callbacks).
    pub sync_state: RwLock<Option<SyncState>>,
    /// The one and only outbox replayer. Shared between the sync thread and
    /// manual "process queue" calls so they contend on one drain lock
    /// instead of double-submitting around each other.
    replayer: Arc<SyncOutgoing>,
    /// Where snapshot artifacts go to survive.
    pub backup: BackupSink,
}

impl Docket {
    /// Build the app state off the loaded config: open (or create) the
    /// stores, bootstrap the client id, parse the sync mode.
    pub fn new() -> DResult<Docket> {
        let data_folder: String = config::get(&["data_folder"])?;
        let (kv_location, db_location) = if data_folder == ":memory:" {
            (String::from(":memory:"), String::from(":memory:"))
        } else {
            util::create_dir(&data_folder)?;
            info!("docket::new() -- data folder: {}", data_folder);
            (format!("{}/kv.sqlite", data_folder), format!("{}/docket.sqlite", data_folder))
        };

        let kv = Storage::new(&kv_location, json::obj())?;
        let db = Storage::new(&db_location, schema::get_schema())?;
        storage::setup_client_id(&kv)?;

        let kv = Arc::new(RwLock::new(Some(kv)));
        let db = Arc::new(RwLock::new(Some(db)));
        let api = Arc::new(Api::new());
        let sync_config = Arc::new(RwLock::new(SyncConfig::from_config()));
        let api_c: Arc<dyn RemoteDelivery> = api.clone();
        let replayer = Arc::new(SyncOutgoing::new(sync_config.clone(), api_c, db.clone()));
        Ok(Docket {
            kv: kv.clone(),
            db: db,
            api: api,
            sync_config: sync_config,
            sync_state: RwLock::new(None),
            replayer: replayer,
            backup: BackupSink::new(kv),
        })
    }

    /// Spawn the sync threads (replayer + eviction monitor).
    pub fn sync_start(&self) -> DResult<()> {
        let state = sync::start(self.sync_config.clone(), self.api.clone(), self.replayer.clone(), self.db.clone(), self.kv.clone())?;
        let mut guard = self.sync_state.write().unwrap();
        *guard = Some(state);
        Ok(())
    }

    /// Signal the sync threads to die and (optionally) wait for them.
    pub fn sync_shutdown(&self, join: bool) -> DResult<()> {
        let mut guard = self.sync_state.write().unwrap();
        match guard.take() {
            Some(mut state) => {
                (state.shutdown)();
                if join {
                    loop {
                        match state.join_handles.pop() {
                            Some(handle) => match handle.join() {
                                Ok(_) => {}
                                Err(e) => error!("docket::sync_shutdown() -- problem joining sync thread: {:?}", e),
                            },
                            None => break,
                        }
                    }
                }
            }
            None => {}
        }
        Ok(())
    }

    pub fn sync_pause(&self) {
        let guard = self.sync_state.read().unwrap();
        match *guard {
            Some(ref state) => (state.pause)(),
            None => {}
        }
    }

    pub fn sync_resume(&self) {
        let guard = self.sync_state.read().unwrap();
        match *guard {
            Some(ref state) => (state.resume)(),
            None => {}
        }
    }

    /// Save an article through the duplicate gate. A High-confidence match
    /// blocks the write unless `allow_duplicate` says the user overrode it;
    /// Medium matches come back as warnings next to the committed record.
    pub fn save_article(&self, article: &mut Article, allow_duplicate: bool) -> DResult<SaveOutcome> {
        let mut warnings: Vec<Match> = Vec::new();
        if article.is_new() {
            article.prepare_id()?;
            let existing: Vec<Article> = {
                let values = with_db!{ db, self.db, "docket::save_article()",
                    db.all("articles")?
                };
                let mut existing = Vec::with_capacity(values.len());
                for value in values {
                    existing.push(json::from_val(value)?);
                }
                existing
            };
            let matches = fingerprint::detect_duplicates(article, &existing);
            match matches.iter().find(|x| x.is_high()) {
                Some(hit) => {
                    if !allow_duplicate {
                        info!("docket::save_article() -- blocking write, high-confidence duplicate of {}", hit.id);
                        return Err(DError::Duplicate(hit.id.clone()));
                    }
                }
                None => {}
            }
            warnings = matches;
        }
        let data = outbox::save_record(&self.sync_config, &self.db, article)?;
        Ok(SaveOutcome {
            data: data,
            warnings: warnings,
        })
    }

    /// Save any non-article record (no dedup gate; their ids are random).
    pub fn save_record<T>(&self, model: &mut T) -> DResult<Value>
        where T: SyncModel
    {
        outbox::save_record(&self.sync_config, &self.db, model)
    }

    /// Delete a record and queue the delete for the remote.
    pub fn delete_record<T>(&self, id: &String) -> DResult<()>
        where T: SyncModel
    {
        outbox::delete_record::<T>(&self.sync_config, &self.db, id)
    }

    /// Run one manual drain pass ("process queue" button, connectivity
    /// restored, etc). Same replayer the timer thread uses; a genuinely
    /// concurrent pass just no-ops at the drain lock.
    pub fn process_queue(&self) -> DResult<()> {
        self.replayer.drain()
    }

    /// Serialize the whole store into one portable document.
    pub fn export_full(&self) -> DResult<Value> {
        with_db!{ db, self.db, "docket::export_full()",
            snapshot::export_full(db)
        }
    }

    /// Restore from a full snapshot document (all-or-nothing).
    pub fn import_full(&self, doc: &Value) -> DResult<()> {
        let res = with_db!{ db, self.db, "docket::import_full()",
            snapshot::import_full(db, doc)
        };
        match res {
            Ok(_) => {
                messaging::ui_event("snapshot-restored", &json!({"mode": "full"}))?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Export partitioned chunks + manifest through the backup sink's
    /// destination chain.
    pub fn export_backup(&self, max_records_per_chunk: usize) -> DResult<Manifest> {
        with_db!{ db, self.db, "docket::export_backup()",
            snapshot::export_partitioned(db, max_records_per_chunk, &self.backup)
        }
    }
}

impl Drop for Docket {
    fn drop(&mut self) {
        match self.sync_shutdown(true) {
            Ok(_) => {}
            Err(e) => error!("docket::drop() -- error shutting down sync: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(url: &str, author: &str, headline: &str) -> Article {
        let mut art = Article::new();
        art.url = Some(String::from(url));
        art.author = Some(String::from(author));
        art.headline = Some(String::from(headline));
        art
    }

    #[test]
    fn blocks_high_confidence_duplicates() {
        let docket = Docket::new().unwrap();
        let mut first = article("http://x.com/a", "Jane", "Man killed");
        docket.save_article(&mut first, false).unwrap();

        // same story, different whitespace: exact key hit, write blocked
        let mut dupe = article("HTTP://x.com/a/", "jane", "man killed");
        match docket.save_article(&mut dupe, false) {
            Err(DError::Duplicate(id)) => assert_eq!(&id, first.id.as_ref().unwrap()),
            _ => panic!("expected a Duplicate error"),
        }

        // explicit override goes through (and upserts the same row)
        let mut dupe = article("HTTP://x.com/a/", "jane", "man killed");
        let outcome = docket.save_article(&mut dupe, true).unwrap();
        assert!(outcome.warnings.len() > 0);
        let guard = docket.db.write().unwrap();
        assert_eq!(guard.as_ref().unwrap().count("articles").unwrap(), 1);
    }

    #[test]
    fn medium_matches_warn_but_commit() {
        let docket = Docket::new().unwrap();
        let mut first = article("http://x.com/a", "Jane", "man shot dead on 5th street");
        docket.save_article(&mut first, false).unwrap();

        let mut similar = article("http://x.com/b", "Joan", "men shot dead on 6th streets");
        let outcome = docket.save_article(&mut similar, false).unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(!outcome.warnings[0].is_high());
        let guard = docket.db.write().unwrap();
        assert_eq!(guard.as_ref().unwrap().count("articles").unwrap(), 2);
    }

    #[test]
    fn edits_skip_the_dedup_gate() {
        let docket = Docket::new().unwrap();
        let mut art = article("http://x.com/a", "Jane", "Man killed");
        docket.save_article(&mut art, false).unwrap();
        // editing the same record is not a duplicate of itself
        art.body = Some(String::from("updated body text"));
        let outcome = docket.save_article(&mut art, false).unwrap();
        assert_eq!(outcome.warnings.len(), 0);
    }
}
