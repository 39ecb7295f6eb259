//! The snapshot codec: turns the whole local store into portable backup
//! artifacts and restores from them. Two shapes:
//!
//! * a **full document** -- `{"version": 1, "data": {table: [records]}}` --
//!   one blob, restored transactionally (all tables or nothing);
//! * a **partitioned export** -- per-table, ordered, size-bounded chunks of
//!   gzip'd newline-delimited JSON, plus one lightweight index stream per
//!   table for cheap browsing, plus a manifest. The manifest is written
//!   LAST on purpose: its absence is how you detect an export that died
//!   halfway (each chunk is self-contained, so a partial export is safe to
//!   abandon).
//!
//! Partition restore streams line by line in bounded-memory batches and
//! skips (but counts) malformed lines.

use ::std::fs;
use ::std::io::{Read, BufRead, BufReader, Write};
use ::std::path::{Path, PathBuf};

use ::flate2::Compression;
use ::flate2::read::GzDecoder;
use ::flate2::write::GzEncoder;
use ::glob::glob;
use ::time;

use ::backup::BackupDestination;
use ::error::{DError, DResult};
use ::storage::Storage;
use ::util::json::{self, Value};

pub const SNAPSHOT_VERSION: u64 = 1;

/// How many records we upsert per transaction during a partition import.
const IMPORT_BATCH: usize = 500;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ManifestEntry {
    pub table: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub count: usize,
    #[serde(rename = "minDate")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_date: Option<String>,
    #[serde(rename = "maxDate")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_date: Option<String>,
}

/// The authoritative index for a partitioned export. Immutable once
/// written.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Manifest {
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub entries: Vec<ManifestEntry>,
}

/// What a partition import did.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PartitionImport {
    pub loaded: usize,
    /// malformed lines we stepped over (never silently: they're counted)
    pub skipped: usize,
}

fn today() -> DResult<String> {
    Ok(format!("{}", time::now_utc().strftime("%Y-%m-%d")?))
}

fn iso_now() -> DResult<String> {
    Ok(format!("{}", time::now_utc().strftime("%Y-%m-%dT%H:%M:%SZ")?))
}

/// Deterministic chunk naming: table + date + zero-padded index.
pub fn chunk_file_name(table: &str, date: &str, index: usize) -> String {
    format!("{}-{}-{:04}.ndjson.gz", table, date, index)
}

fn gzip(data: &[u8]) -> DResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Serialize every table into one versioned document.
pub fn export_full(db: &Storage) -> DResult<Value> {
    let mut data = json::obj();
    for table in db.tables() {
        let records = db.all(&table[..])?;
        json::set(&[&table[..]], &mut data, &records)?;
    }
    Ok(json!({
        "version": SNAPSHOT_VERSION,
        "data": data,
    }))
}

/// Restore a full-document snapshot. Transactional: either every table is
/// cleared and repopulated, or (on any failure) the store is untouched.
pub fn import_full(db: &Storage, doc: &Value) -> DResult<()> {
    let version: u64 = json::get_opt(&["version"], doc).unwrap_or(0);
    if version != SNAPSHOT_VERSION {
        return Err(DError::BadValue(format!("snapshot::import_full() -- unsupported snapshot version: {}", version)));
    }
    let data = json::walk(&["data"], doc)?;
    let tables = match *data {
        Value::Object(ref obj) => obj,
        _ => return Err(DError::BadValue(format!("snapshot::import_full() -- `data` is not an object"))),
    };

    db.conn.execute("BEGIN IMMEDIATE", &[])?;
    let run = || -> DResult<()> {
        db.clear_objects()?;
        for (table, records) in tables {
            let records = match *records {
                Value::Array(ref arr) => arr,
                _ => return Err(DError::BadValue(format!("snapshot::import_full() -- table `{}` is not an array", table))),
            };
            for record in records {
                db.store_value(&table[..], record)?;
            }
        }
        Ok(())
    };
    match run() {
        Ok(_) => {
            db.conn.execute("COMMIT", &[])?;
            info!("snapshot::import_full() -- restored {} tables", tables.len());
            Ok(())
        }
        Err(e) => {
            match db.conn.execute("ROLLBACK", &[]) {
                Ok(_) => {}
                Err(re) => error!("snapshot::import_full() -- rollback after failed import also failed: {}", re),
            }
            Err(e)
        }
    }
}

/// Slice every non-empty table into ordered chunks of at most
/// `max_records` records and write them (gzip'd ndjson) through the given
/// destination, along with a per-table summary index stream. The manifest
/// goes out last and is also returned.
pub fn export_partitioned(db: &Storage, max_records: usize, dest: &dyn BackupDestination) -> DResult<Manifest> {
    if max_records == 0 {
        return Err(DError::BadValue(format!("snapshot::export_partitioned() -- max_records must be >= 1")));
    }
    let date = today()?;
    let mut entries: Vec<ManifestEntry> = Vec::new();

    for table in db.tables() {
        let records = db.all(&table[..])?;
        if records.len() == 0 { continue; }

        let title_field: Option<String> = json::get_opt(&[&table[..], "summary", "title"], db.schema());
        let date_field: Option<String> = json::get_opt(&[&table[..], "summary", "date"], db.schema());
        let mut index_lines = String::new();

        for (chunk_idx, chunk) in records.chunks(max_records).enumerate() {
            let file_name = chunk_file_name(&table[..], &date[..], chunk_idx);
            let mut body = String::new();
            let mut min_date: Option<String> = None;
            let mut max_date: Option<String> = None;

            for record in chunk {
                body.push_str(&json::stringify(record)?[..]);
                body.push('\n');

                let rec_date: Option<String> = match date_field {
                    Some(ref field) => json::get_opt(&[&field[..]], record),
                    None => None,
                };
                match rec_date {
                    Some(d) => {
                        let lower = match min_date {
                            Some(ref cur) => &d < cur,
                            None => true,
                        };
                        if lower { min_date = Some(d.clone()); }
                        let higher = match max_date {
                            Some(ref cur) => &d > cur,
                            None => true,
                        };
                        if higher { max_date = Some(d); }
                    }
                    None => {}
                }

                // summary projection: enough to browse without pulling the
                // chunk itself
                let title: Option<String> = match title_field {
                    Some(ref field) => json::get_opt(&[&field[..]], record),
                    None => None,
                };
                let summary = json!({
                    "id": json::get_opt::<String>(&["id"], record),
                    "title": title,
                    "date": match date_field {
                        Some(ref field) => json::get_opt::<String>(&[&field[..]], record),
                        None => None,
                    },
                    "file": file_name,
                });
                index_lines.push_str(&json::stringify(&summary)?[..]);
                index_lines.push('\n');
            }

            dest.write(&file_name[..], &gzip(body.as_bytes())?[..])?;
            entries.push(ManifestEntry {
                table: table.clone(),
                file_name: file_name,
                count: chunk.len(),
                min_date: min_date,
                max_date: max_date,
            });
        }

        dest.write(&format!("{}-index-{}.ndjson", table, date)[..], index_lines.as_bytes())?;
    }

    let manifest = Manifest {
        created_at: iso_now()?,
        entries: entries,
    };
    // last write wins the race against an aborted export: no manifest, no
    // (believable) backup
    dest.write(&format!("manifest-{}.json", date)[..], json::stringify(&manifest)?.as_bytes())?;
    info!("snapshot::export_partitioned() -- wrote {} chunks", manifest.entries.len());
    Ok(manifest)
}

fn flush_batch(db: &Storage, table: &str, batch: &mut Vec<Value>) -> DResult<usize> {
    if batch.len() == 0 { return Ok(0); }
    db.conn.execute("BEGIN IMMEDIATE", &[])?;
    let run = || -> DResult<()> {
        for record in batch.iter() {
            db.store_value(table, record)?;
        }
        Ok(())
    };
    match run() {
        Ok(_) => {
            db.conn.execute("COMMIT", &[])?;
            let count = batch.len();
            batch.clear();
            Ok(count)
        }
        Err(e) => {
            match db.conn.execute("ROLLBACK", &[]) {
                Ok(_) => {}
                Err(re) => error!("snapshot::flush_batch() -- rollback failed: {}", re),
            }
            Err(e)
        }
    }
}

/// Stream one partition (ndjson, gzip'd or not -- detected from the file
/// name) into the named table, upserting in bounded batches. Malformed
/// lines are skipped, counted, and logged; `progress` hears the running
/// loaded-count after every batch.
pub fn import_partition<'a>(db: &Storage, table: &str, file_name: &str, source: Box<dyn Read>, mut progress: Option<&mut (dyn FnMut(usize) + 'a)>) -> DResult<PartitionImport> {
    let reader: Box<dyn BufRead> = if file_name.ends_with(".gz") {
        Box::new(BufReader::new(GzDecoder::new(source)))
    } else {
        Box::new(BufReader::new(source))
    };

    let mut stats = PartitionImport::default();
    let mut batch: Vec<Value> = Vec::with_capacity(IMPORT_BATCH);
    for line in reader.lines() {
        let line = line?;
        if line.trim().len() == 0 { continue; }
        let record: Value = match json::parse(&line) {
            Ok(x) => x,
            Err(e) => {
                warn!("snapshot::import_partition() -- {}: skipping malformed line: {}", file_name, e);
                stats.skipped += 1;
                continue;
            }
        };
        if json::get_opt::<String>(&["id"], &record).is_none() {
            warn!("snapshot::import_partition() -- {}: skipping record with no id", file_name);
            stats.skipped += 1;
            continue;
        }
        batch.push(record);
        if batch.len() >= IMPORT_BATCH {
            stats.loaded += flush_batch(db, table, &mut batch)?;
            match progress {
                Some(ref mut cb) => cb(stats.loaded),
                None => {}
            }
        }
    }
    stats.loaded += flush_batch(db, table, &mut batch)?;
    match progress {
        Some(ref mut cb) => cb(stats.loaded),
        None => {}
    }
    info!("snapshot::import_partition() -- {}: loaded {} records, skipped {}", file_name, stats.loaded, stats.skipped);
    Ok(stats)
}

/// Restore every partition a manifest names from a backup folder.
pub fn import_from_manifest(db: &Storage, dir: &Path, manifest_name: &str, mut progress: Option<&mut dyn FnMut(usize)>) -> DResult<PartitionImport> {
    let raw = fs::read_to_string(dir.join(manifest_name))?;
    let manifest: Manifest = json::parse(&raw)?;
    let mut totals = PartitionImport::default();
    for entry in &manifest.entries {
        let file = fs::File::open(dir.join(&entry.file_name))?;
        let sub_progress = progress.as_deref_mut();
        let stats = import_partition(db, &entry.table[..], &entry.file_name[..], Box::new(file), sub_progress)?;
        totals.loaded += stats.loaded;
        totals.skipped += stats.skipped;
    }
    Ok(totals)
}

/// The manifests sitting in a backup folder, oldest first. A chunk file
/// with no manifest naming it is an aborted export; we only ever offer
/// manifests.
pub fn list_manifests(dir: &Path) -> DResult<Vec<PathBuf>> {
    let pattern = format!("{}/manifest-*.json", dir.display());
    let mut found: Vec<PathBuf> = Vec::new();
    for entry in glob(&pattern[..])? {
        found.push(entry?);
    }
    found.sort();
    Ok(found)
}
