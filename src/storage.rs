//! The storage module is the local store adapter: one uniform interface over
//! a schemaless, sqlite-backed document store. Objects go in as JSON, come
//! back out as JSON, and any fields we want to search on get rows in a
//! separate index table (think of it as a crude IndexedDB). A key/value
//! table rides along for small persistent state (client id, eviction marker,
//! backup folder ref), and the outbox table holds queued remote writes.
//!
//! The same interface serves both runtime contexts: `":memory:"` gives the
//! short-lived/ephemeral store, a file path gives the durable one. Nothing
//! above this layer branches on which one it got.

use ::std::fs;

use ::rusqlite::Connection;
use ::rusqlite::types::Value as SqlValue;
use ::rusqlite::Error as SqlError;
use ::rand::{self, Rng};
use ::hex;

use ::util::json::{self, Value};
use ::models::model::{self, Model, SyncStatus};
use ::models::storable::Storable;
use ::error::{DError, DResult};
use ::util;

/// Make sure we have a client ID, and sync it with the model system. The
/// client id seeds every locally-generated record id.
pub fn setup_client_id(storage: &Storage) -> DResult<()> {
    let id = match storage.kv_get("client_id")? {
        Some(x) => x,
        None => {
            let bytes: [u8; 32] = rand::thread_rng().gen();
            let client_id = hex::encode(&bytes[..]);
            storage.kv_set("client_id", &client_id)?;
            client_id
        },
    };
    model::set_client_id(id)
}

/// This structure holds state for persisting data to disk (or to memory,
/// depending on the location it was opened with).
pub struct Storage {
    pub conn: Connection,
    schema: Value,
    location: String,
}

impl Storage {
    /// Open (and if needed, initialize) a store. Initialization is one-time
    /// but idempotent: every entry point can call through here without
    /// caring whether another one got here first, since the DDL is all
    /// IF NOT EXISTS and sqlite serializes writers.
    pub fn new(location: &String, schema: Value) -> DResult<Storage> {
        let conn = if location == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(location)
        }?;

        let storage = Storage {
            conn: conn,
            schema: schema,
            location: location.clone(),
        };
        storage.init()?;
        Ok(storage)
    }

    /// Set up our tables/indexes. Idempotent.
    fn init(&self) -> DResult<()> {
        self.conn.execute("CREATE TABLE IF NOT EXISTS docket_objects (id VARCHAR(96) PRIMARY KEY, table_name VARCHAR(32), data TEXT)", &[])?;
        self.conn.execute("CREATE TABLE IF NOT EXISTS docket_index (id INTEGER PRIMARY KEY, table_name VARCHAR(32), index_name VARCHAR(32), vals VARCHAR(256), object_id VARCHAR(96))", &[])?;
        self.conn.execute("CREATE TABLE IF NOT EXISTS docket_kv (key VARCHAR(64) PRIMARY KEY, value TEXT)", &[])?;
        self.conn.execute("CREATE TABLE IF NOT EXISTS docket_outbox (id INTEGER PRIMARY KEY AUTOINCREMENT, method VARCHAR(8), endpoint VARCHAR(255), body TEXT, sync_status VARCHAR(16), queued_at INTEGER, failure_count INTEGER NOT NULL DEFAULT 0, last_error TEXT)", &[])?;

        self.conn.execute("CREATE INDEX IF NOT EXISTS docket_idx_index ON docket_index (table_name, index_name, vals)", &[])?;
        self.conn.execute("CREATE INDEX IF NOT EXISTS docket_idx_index_obj ON docket_index (table_name, object_id)", &[])?;
        self.conn.execute("CREATE INDEX IF NOT EXISTS docket_idx_objects_table ON docket_objects (table_name)", &[])?;
        self.conn.execute("CREATE INDEX IF NOT EXISTS docket_idx_outbox ON docket_outbox (sync_status, queued_at)", &[])?;
        Ok(())
    }

    pub fn location(&self) -> &String {
        &self.location
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// The document tables our schema declares, in stable order.
    pub fn tables(&self) -> Vec<String> {
        match self.schema {
            Value::Object(ref obj) => obj.keys().map(|x| x.clone()).collect(),
            _ => Vec::new(),
        }
    }

    /// How many bytes the store occupies on disk (0 when in-memory, where
    /// eviction isn't a thing anyway).
    pub fn usage_bytes(&self) -> u64 {
        if self.location == ":memory:" { return 0; }
        match fs::metadata(&self.location) {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        }
    }

    /// Save a model to our db. Writes are durable before this returns: no
    /// caller gets an Ok() for data that a clean process exit can lose.
    pub fn save<T>(&self, model: &T) -> DResult<Value>
        where T: Model + Storable
    {
        let modeldata = model.data()?;
        self.store_value(model.table(), &modeldata)?;
        Ok(modeldata)
    }

    /// Store a raw JSON object (must carry an `id` field). Upserts the
    /// object row and rebuilds its index rows from the schema.
    pub fn store_value(&self, table: &str, obj: &Value) -> DResult<()> {
        let id = json::get::<String>(&["id"], obj)
            .map_err(|_| DError::MissingField(format!("storage::store_value() -- {}: object missing `id` field", table)))?;
        let data = json::stringify(obj)?;
        self.conn.execute("INSERT OR REPLACE INTO docket_objects (id, table_name, data) VALUES ($1, $2, $3)", &[&id, &table, &data])?;
        // wipe out all index rows for this object and rebuild them
        self.conn.execute("DELETE FROM docket_index WHERE table_name = $1 AND object_id = $2", &[&table, &id])?;

        let indexes: Vec<Value> = json::get_opt(&[table, "indexes"], &self.schema).unwrap_or(Vec::new());
        for index in &indexes {
            let fields: Vec<String> = match json::get(&["fields"], index) {
                Ok(x) => x,
                Err(e) => return Err(From::from(e)),
            };
            let idx_name: String = match json::get_opt(&["name"], index) {
                Some(x) => x,
                None => fields.join("_"),
            };

            // all combinations of the various fields' values (multi-valued
            // fields get one index row per value)
            let mut val_vec: Vec<Vec<String>> = Vec::new();
            for field in &fields {
                val_vec.push(index_field_values(json::walk(&[&field[..]], obj).ok()));
            }
            let mut vals: Vec<String> = Vec::new();
            combine(String::from(""), &val_vec[..], &mut vals);
            for val in &vals {
                self.conn.execute("INSERT INTO docket_index (table_name, index_name, vals, object_id) VALUES ($1, $2, $3, $4)", &[
                    &table,
                    &idx_name,
                    val,
                    &id,
                ])?;
            }
        }
        Ok(())
    }

    /// Get a typed model by id
    pub fn get<T>(&self, table: &str, id: &String) -> DResult<Option<T>>
        where T: Model
    {
        match self.get_value(table, id)? {
            Some(x) => Ok(Some(json::from_val(x)?)),
            None => Ok(None),
        }
    }

    /// Get an object's raw JSON by id
    pub fn get_value(&self, table: &str, id: &String) -> DResult<Option<Value>> {
        let query = "SELECT data FROM docket_objects WHERE id = $1 AND table_name = $2";
        let res = self.conn.query_row_and_then(query, &[id, &table], |row| -> DResult<Value> {
            let data: SqlValue = row.get_checked("data")?;
            match data {
                SqlValue::Text(ref x) => Ok(json::parse(x)?),
                _ => Err(DError::Msg(format!("storage: {}: {}: `data` field is not a string", table, id))),
            }
        });
        match res {
            Ok(x) => Ok(Some(x)),
            Err(e) => match e {
                DError::Storage(e) => match e {
                    SqlError::QueryReturnedNoRows => Ok(None),
                    _ => Err(From::from(e)),
                },
                _ => Err(e),
            },
        }
    }

    /// Remove all traces of an object.
    pub fn delete(&self, table: &str, id: &String) -> DResult<()> {
        self.conn.execute("DELETE FROM docket_objects WHERE table_name = $1 AND id = $2", &[&table, id])?;
        self.conn.execute("DELETE FROM docket_index WHERE table_name = $1 AND object_id = $2", &[&table, id])?;
        Ok(())
    }

    /// Find objects via an index. `limit <= 0` means no limit.
    pub fn find(&self, table: &str, index: &str, vals: &Vec<String>, limit: i64, offset: i64) -> DResult<Vec<Value>> {
        let vals_str = format!("{}%", vals.join("|"));
        let mut query = self.conn.prepare("SELECT object_id FROM docket_index WHERE table_name = $1 AND index_name = $2 AND vals LIKE $3 ORDER BY object_id ASC")?;
        let rows = query.query_map(&[&table, &index, &vals_str], |row| {
            row.get("object_id")
        })?;
        let mut ids: Vec<String> = Vec::new();
        for oid in rows {
            ids.push(oid?);
        }
        if ids.len() == 0 { return Ok(Vec::new()); }

        let oids = ids.into_iter()
            .map(|x| format!("'{}'", x))
            .collect::<Vec<String>>()
            .join(", ");
        let limit = if limit <= 0 { -1 } else { limit };
        let query = format!("SELECT data FROM docket_objects WHERE id IN ({}) ORDER BY id ASC LIMIT {} OFFSET {}", oids, limit, offset);
        let mut query = self.conn.prepare(&query[..])?;
        let rows = query.query_map(&[], |row| {
            row.get("data")
        })?;
        let mut objects: Vec<Value> = Vec::new();
        for data in rows {
            let data: String = data?;
            objects.push(json::parse(&data)?);
        }
        Ok(objects)
    }

    /// Get ALL objects in a table
    pub fn all(&self, table: &str) -> DResult<Vec<Value>> {
        let query = "SELECT data FROM docket_objects WHERE table_name = $1 ORDER BY id ASC";
        let mut query = self.conn.prepare(query)?;
        let rows = query.query_map(&[&table], |row| {
            row.get("data")
        })?;
        let mut objects: Vec<Value> = Vec::new();
        for data in rows {
            let data: String = data?;
            objects.push(json::parse(&data)?);
        }
        Ok(objects)
    }

    /// Count the objects in one table
    pub fn count(&self, table: &str) -> DResult<i64> {
        let res = self.conn.query_row_and_then("SELECT COUNT(*) AS count FROM docket_objects WHERE table_name = $1", &[&table], |row| -> DResult<i64> {
            Ok(row.get_checked("count")?)
        })?;
        Ok(res)
    }

    /// Count every object in the store (the eviction monitor's "do we have
    /// anything worth worrying about" check)
    pub fn count_all(&self) -> DResult<i64> {
        let res = self.conn.query_row_and_then("SELECT COUNT(*) AS count FROM docket_objects", &[], |row| -> DResult<i64> {
            Ok(row.get_checked("count")?)
        })?;
        Ok(res)
    }

    /// Wipe every object/index row (not kv, not the outbox). Used by the
    /// transactional full import, which runs this inside its transaction.
    pub fn clear_objects(&self) -> DResult<()> {
        self.conn.execute("DELETE FROM docket_objects", &[])?;
        self.conn.execute("DELETE FROM docket_index", &[])?;
        Ok(())
    }

    /// Patch a record's delivery bookkeeping in place. Only the replayer
    /// calls this, and only for the status/failure/timestamp fields; record
    /// payloads are never touched from the sync side.
    pub fn update_sync_status(&self, table: &str, id: &String, status: SyncStatus) -> DResult<()> {
        let mut obj = match self.get_value(table, id)? {
            Some(x) => x,
            // record got deleted locally while its write was in flight;
            // nothing to mark
            None => return Ok(()),
        };
        match status {
            SyncStatus::Synced => {
                json::set(&["sync_status"], &mut obj, &status)?;
                json::set(&["failure_count"], &mut obj, &0u32)?;
                json::set(&["last_sync_at"], &mut obj, &util::time_ms())?;
            }
            SyncStatus::Failed => {
                let count: u32 = json::get_opt(&["failure_count"], &obj).unwrap_or(0);
                json::set(&["sync_status"], &mut obj, &status)?;
                json::set(&["failure_count"], &mut obj, &(count + 1))?;
            }
            SyncStatus::Pending => {
                json::set(&["sync_status"], &mut obj, &status)?;
            }
        }
        self.store_value(table, &obj)
    }

    /// Set a value into the key/val store
    pub fn kv_set(&self, key: &str, val: &String) -> DResult<()> {
        self.conn.execute("INSERT OR REPLACE INTO docket_kv (key, value) VALUES ($1, $2)", &[&key, val])?;
        Ok(())
    }

    /// Get a value from the key/val store
    pub fn kv_get(&self, key: &str) -> DResult<Option<String>> {
        let query = "SELECT value FROM docket_kv WHERE key = $1";
        let res = self.conn.query_row_and_then(query, &[&key], |row| -> DResult<String> {
            let data: SqlValue = row.get_checked("value")?;
            match data {
                SqlValue::Text(x) => Ok(x),
                _ => Err(DError::Msg(format!("storage: kv: {}: `value` field is not a string", key))),
            }
        });
        match res {
            Ok(x) => Ok(Some(x)),
            Err(e) => match e {
                DError::Storage(e) => match e {
                    SqlError::QueryReturnedNoRows => Ok(None),
                    _ => Err(From::from(e)),
                },
                _ => Err(e),
            },
        }
    }

    /// Remove a k/v val
    pub fn kv_delete(&self, key: &str) -> DResult<()> {
        self.conn.execute("DELETE FROM docket_kv WHERE key = $1", &[&key])?;
        Ok(())
    }
}

// The connection never crosses threads bare: every Storage in the app lives
// inside an Arc<RwLock<Option<Storage>>>, so access is serialized.
unsafe impl Send for Storage {}
unsafe impl Sync for Storage {}

/// Flatten one indexed field's value into index strings.
fn index_field_values(val: Option<&Value>) -> Vec<String> {
    let mut subvals: Vec<String> = Vec::new();
    match val {
        Some(&Value::String(ref x)) => subvals.push(x.clone()),
        Some(&Value::Number(ref x)) => subvals.push(format!("{}", x)),
        Some(&Value::Bool(ref x)) => subvals.push(format!("{}", x)),
        Some(&Value::Array(ref arr)) => {
            for item in arr {
                match *item {
                    Value::String(ref s) => subvals.push(s.clone()),
                    Value::Number(ref n) => subvals.push(format!("{}", n)),
                    _ => subvals.push(String::from("")),
                }
            }
        }
        _ => subvals.push(String::from("")),
    }
    if subvals.len() == 0 { subvals.push(String::from("")); }
    subvals
}

/// Build every combination of the per-field value lists, joined with "|"
/// (multi-field indexes want one row per combination).
fn combine(acc: String, next: &[Vec<String>], final_vals: &mut Vec<String>) {
    if next.len() == 0 {
        final_vals.push(acc);
        return;
    }
    for val in &next[0] {
        let acced = if acc == "" {
            val.clone()
        } else {
            format!("{}|{}", acc, val)
        };
        combine(acced, &next[1..], final_vals);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::schema;

    fn pre_test() -> Storage {
        Storage::new(&String::from(":memory:"), schema::get_schema()).unwrap()
    }

    fn article_val(id: &str, url: &str, author: &str) -> Value {
        json!({
            "id": id,
            "url": url,
            "author": author,
            "headline": "man found dead in alley",
            "sync_status": "pending",
            "failure_count": 0,
        })
    }

    #[test]
    fn inits_idempotently() {
        let storage = pre_test();
        // a second init on a live store is a no-op, not a conflict
        storage.init().unwrap();
        storage.init().unwrap();
    }

    #[test]
    fn stores_gets_deletes() {
        let storage = pre_test();
        storage.store_value("articles", &article_val("art_001122", "http://x.com/a", "jane")).unwrap();
        let got = storage.get_value("articles", &String::from("art_001122")).unwrap().unwrap();
        assert_eq!(json::get::<String>(&["author"], &got).unwrap(), "jane");
        assert_eq!(storage.count("articles").unwrap(), 1);

        storage.delete("articles", &String::from("art_001122")).unwrap();
        assert!(storage.get_value("articles", &String::from("art_001122")).unwrap().is_none());
        assert_eq!(storage.count("articles").unwrap(), 0);
    }

    #[test]
    fn upserts_without_duplicating_indexes() {
        let storage = pre_test();
        storage.store_value("articles", &article_val("art_9999aa", "http://x.com/a", "jane")).unwrap();
        storage.store_value("articles", &article_val("art_9999aa", "http://x.com/a", "joan")).unwrap();
        assert_eq!(storage.count("articles").unwrap(), 1);
        let found = storage.find("articles", "author", &vec![String::from("joan")], 0, 0).unwrap();
        assert_eq!(found.len(), 1);
        let stale = storage.find("articles", "author", &vec![String::from("jane")], 0, 0).unwrap();
        assert_eq!(stale.len(), 0);
    }

    #[test]
    fn finds_with_limit_offset() {
        let storage = pre_test();
        for i in 0..5 {
            storage.store_value("victims", &json!({
                "id": format!("vic{}", i),
                "name": "john doe",
                "article_id": "art_0",
            })).unwrap();
        }
        let all = storage.find("victims", "name", &vec![String::from("john doe")], 0, 0).unwrap();
        assert_eq!(all.len(), 5);
        let page = storage.find("victims", "name", &vec![String::from("john doe")], 2, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(json::get::<String>(&["id"], &page[0]).unwrap(), "vic2");
    }

    #[test]
    fn indexes_array_fields() {
        let storage = pre_test();
        storage.store_value("incidents", &json!({
            "id": "inc1",
            "title": "double shooting",
            "city": "oakland",
            "victim_ids": ["vicA", "vicB"],
        })).unwrap();
        let by_vic = storage.find("incidents", "victim_ids", &vec![String::from("vicB")], 0, 0).unwrap();
        assert_eq!(by_vic.len(), 1);
    }

    #[test]
    fn requires_an_id() {
        let storage = pre_test();
        let res = storage.store_value("articles", &json!({"headline": "no id here"}));
        assert!(res.is_err());
    }

    #[test]
    fn kv_set_get() {
        let storage = pre_test();
        storage.kv_set("backup-folder", &String::from("/mnt/backups")).unwrap();
        assert_eq!(storage.kv_get("backup-folder").unwrap().unwrap(), "/mnt/backups");
        storage.kv_set("backup-folder", &String::from("/mnt/other")).unwrap();
        assert_eq!(storage.kv_get("backup-folder").unwrap().unwrap(), "/mnt/other");
        assert_eq!(storage.kv_get("doesnt_exist").unwrap(), None);
        storage.kv_delete("backup-folder").unwrap();
        assert_eq!(storage.kv_get("backup-folder").unwrap(), None);
    }

    #[test]
    fn updates_sync_bookkeeping() {
        let storage = pre_test();
        storage.store_value("articles", &article_val("art_aabbcc", "http://x.com/b", "jane")).unwrap();

        storage.update_sync_status("articles", &String::from("art_aabbcc"), SyncStatus::Failed).unwrap();
        let got = storage.get_value("articles", &String::from("art_aabbcc")).unwrap().unwrap();
        assert_eq!(json::get::<String>(&["sync_status"], &got).unwrap(), "failed");
        assert_eq!(json::get::<u32>(&["failure_count"], &got).unwrap(), 1);

        storage.update_sync_status("articles", &String::from("art_aabbcc"), SyncStatus::Synced).unwrap();
        let got = storage.get_value("articles", &String::from("art_aabbcc")).unwrap().unwrap();
        assert_eq!(json::get::<String>(&["sync_status"], &got).unwrap(), "synced");
        // synced always means the failure count went back to zero
        assert_eq!(json::get::<u32>(&["failure_count"], &got).unwrap(), 0);
        assert!(json::get::<i64>(&["last_sync_at"], &got).unwrap() > 0);

        // marking a deleted record is a no-op, not an error
        storage.update_sync_status("articles", &String::from("art_gone"), SyncStatus::Synced).unwrap();
    }

    #[test]
    fn client_id_setup_persists() {
        let storage = pre_test();
        setup_client_id(&storage).unwrap();
        let id1 = storage.kv_get("client_id").unwrap().unwrap();
        assert_eq!(id1.len(), 64);
        setup_client_id(&storage).unwrap();
        let id2 = storage.kv_get("client_id").unwrap().unwrap();
        assert_eq!(id1, id2);
    }
}
