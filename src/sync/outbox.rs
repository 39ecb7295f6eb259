//! The outbox is the durable queue of not-yet-confirmed remote writes, plus
//! the write path that feeds it. Saving or deleting a record through here
//! gives you the documented flow: commit locally (durably), then -- only if
//! a remote sync target is configured -- append a queue entry that fully
//! describes the mutation for a later replay pass.
//!
//! Enqueue never fails silently: if the append itself errors, the error
//! propagates and the record is left `pending` locally, which is exactly
//! what the caller has to surface.

use ::std::sync::{Arc, RwLock};

use ::error::DResult;
use ::storage::Storage;
use ::sync::{SyncConfig, SyncMode};
use ::models::model::Model;
use ::models::storable::Storable;
use ::models::article::Article;
use ::models::victim::Victim;
use ::models::incident::Incident;
use ::models::queue_entry::{Method, QueueStatus};
use ::util::json::{self, Value};
use ::util;

/// A record type that rides the local-commit-then-enqueue path.
pub trait SyncModel: Model + Storable + Send + Sync + 'static {
    /// Make sure this model has an id before it hits storage. The default
    /// is a locally-generated random id.
    fn prepare_id(&mut self) -> DResult<()> {
        if self.is_new() {
            self.generate_id()?;
        }
        Ok(())
    }

    /// A default save function that takes a db/model and saves it.
    fn db_save(&self, db: &Storage) -> DResult<Value> {
        db.save(self)
    }

    /// A default delete function that takes a db/model and deletes it.
    fn db_delete(&self, db: &Storage) -> DResult<()> {
        db.delete(self.table(), &self.id_or_else()?)
    }
}

impl SyncModel for Article {
    /// Articles get content-derived ids: same normalized natural keys,
    /// same id, no duplicate row.
    fn prepare_id(&mut self) -> DResult<()> {
        if self.is_new() {
            let id = self.content_id()?;
            self.set_id(id);
        }
        Ok(())
    }
}
impl SyncModel for Victim {}
impl SyncModel for Incident {}

/// Append one mutation to the queue, if (and only if) we have a remote to
/// deliver it to. Returns the queue id, or None when running local-only.
pub fn enqueue(config: &Arc<RwLock<SyncConfig>>, db: &Arc<RwLock<Option<Storage>>>, method: Method, endpoint: String, body: Option<Value>) -> DResult<Option<i64>> {
    {
        let guard = config.read().unwrap();
        match guard.mode {
            SyncMode::Remote { .. } => {}
            _ => {
                debug!("outbox::enqueue() -- no remote configured, skipping {} {}", method.as_str(), endpoint);
                return Ok(None);
            }
        }
    }
    let body_str = match body {
        Some(ref x) => Some(json::stringify(x)?),
        None => None,
    };
    let queued_at = util::time_ms();
    let entry_id = with_db!{ db_, db, "outbox::enqueue()",
        db_.conn.execute(
            "INSERT INTO docket_outbox (method, endpoint, body, sync_status, queued_at, failure_count) VALUES ($1, $2, $3, $4, $5, 0)",
            &[&method.as_str(), &endpoint, &body_str, &QueueStatus::Pending.as_str(), &queued_at]
        )?;
        db_.conn.last_insert_rowid()
    };
    debug!("outbox::enqueue() -- queued {} {} as entry {}", method.as_str(), endpoint, entry_id);
    Ok(Some(entry_id))
}

/// Serialize a model, commit it to the local store, and queue the mutation
/// for the remote. The local write lands before the enqueue is attempted,
/// so an enqueue failure leaves a committed-but-pending record behind (the
/// right shape for a retry), never a lost write.
pub fn save_record<T>(config: &Arc<RwLock<SyncConfig>>, db: &Arc<RwLock<Option<Storage>>>, model: &mut T) -> DResult<Value>
    where T: SyncModel
{
    model.prepare_id()?;
    let id = model.id_or_else()?;
    let table = model.table();
    let (existed, data) = with_db!{ db_, db, "outbox::save_record()",
        let existed = db_.get_value(table, &id)?.is_some();
        let data = model.db_save(db_)?;
        (existed, data)
    };
    let method = if existed { Method::Put } else { Method::Post };
    enqueue(config, db, method, format!("/{}/{}", table, id), Some(data.clone()))?;
    Ok(data)
}

/// Remove a record locally and queue the delete. The endpoint alone fully
/// describes a delete; there is no body.
pub fn delete_record<T>(config: &Arc<RwLock<SyncConfig>>, db: &Arc<RwLock<Option<Storage>>>, id: &String) -> DResult<()>
    where T: SyncModel
{
    let mut model: T = Default::default();
    model.set_id(id.clone());
    let table = model.table();
    with_db!{ db_, db, "outbox::delete_record()",
        model.db_delete(db_)?;
    }
    enqueue(config, db, Method::Delete, format!("/{}/{}", table, id), None)?;
    Ok(())
}
