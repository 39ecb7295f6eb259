//! The durable backup sink. Snapshot artifacts (chunks, indexes, manifests,
//! full exports) are all just named blobs by the time they get here; this
//! module's whole job is finding *somewhere* durable to put them:
//!
//!   1. a previously-granted backup folder (silent, no prompting), else
//!   2. an interactive "save as" capability, if the embedding shell
//!      registered one, else
//!   3. a one-shot download into the configured download folder.
//!
//! The folder reference is an opaque, revocable capability persisted in the
//! kv store under a fixed logical key; it gets validated lazily before
//! every write and a failure falls through the chain instead of erroring.

use ::std::fs;
use ::std::io::Write;
use ::std::path::{Path, PathBuf};
use ::std::sync::{Arc, RwLock};

use ::config;
use ::error::{DError, DResult};
use ::messaging;
use ::storage::Storage;

/// The kv key our folder capability lives under.
pub const FOLDER_KEY: &'static str = "backup-folder";

/// An opaque writable destination. Consumers treat it as revocable at any
/// time: always `is_valid()` (or just try the write and fall through).
pub trait BackupDestination: Send + Sync {
    fn write(&self, name: &str, data: &[u8]) -> DResult<()>;
    fn is_valid(&self) -> bool;
    fn describe(&self) -> String;
}

/// A plain directory on disk.
pub struct FolderDestination {
    path: PathBuf,
}

impl FolderDestination {
    pub fn new<P: AsRef<Path>>(path: P) -> FolderDestination {
        FolderDestination { path: PathBuf::from(path.as_ref()) }
    }
}

impl BackupDestination for FolderDestination {
    fn write(&self, name: &str, data: &[u8]) -> DResult<()> {
        fs::create_dir_all(&self.path)?;
        let target = self.path.join(name);
        let mut file = fs::File::create(&target)?;
        file.write_all(data)?;
        // a backup that evaporates on power loss isn't a backup
        file.sync_all()?;
        Ok(())
    }

    fn is_valid(&self) -> bool {
        match fs::metadata(&self.path) {
            Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
            Err(_) => false,
        }
    }

    fn describe(&self) -> String {
        format!("{}", self.path.display())
    }
}

/// The interactive "save as" capability. The embedding shell registers one
/// of these when its environment can actually pop a folder picker; headless
/// runs just don't.
pub trait SavePrompt: Send + Sync {
    /// Ask the user for a folder to write `suggested_name` into. None means
    /// they declined.
    fn pick_folder(&self, suggested_name: &str) -> Option<PathBuf>;
}

/// Resolves blobs to a durable home, per the chain above.
pub struct BackupSink {
    /// kv store holding the folder capability (shared with the rest of the
    /// app; this is the store that survives eviction).
    kv: Arc<RwLock<Option<Storage>>>,
    prompter: RwLock<Option<Box<dyn SavePrompt>>>,
}

impl BackupSink {
    pub fn new(kv: Arc<RwLock<Option<Storage>>>) -> BackupSink {
        BackupSink {
            kv: kv,
            prompter: RwLock::new(None),
        }
    }

    /// Register (or replace) the interactive save capability.
    pub fn set_prompter(&self, prompter: Box<dyn SavePrompt>) {
        let mut guard = self.prompter.write().unwrap();
        *guard = Some(prompter);
    }

    /// Persist a granted folder as the standing backup destination and let
    /// the UI know.
    pub fn remember_folder<P: AsRef<Path>>(&self, path: P) -> DResult<()> {
        let path_str = format!("{}", path.as_ref().display());
        with_db!{ kv, self.kv, "BackupSink.remember_folder()",
            kv.kv_set(FOLDER_KEY, &path_str)?;
        }
        messaging::ui_event("backup-folder-selected", &json!({"name": path_str}))?;
        Ok(())
    }

    /// Revoke the standing destination (the user said stop).
    pub fn clear_folder(&self) -> DResult<()> {
        with_db!{ kv, self.kv, "BackupSink.clear_folder()",
            kv.kv_delete(FOLDER_KEY)?;
        }
        Ok(())
    }

    /// The remembered destination, if it still checks out. An invalid or
    /// revoked ref reads as None -- callers re-request lazily.
    pub fn destination(&self) -> DResult<Option<FolderDestination>> {
        let path = with_db!{ kv, self.kv, "BackupSink.destination()",
            kv.kv_get(FOLDER_KEY)?
        };
        match path {
            Some(p) => {
                let dest = FolderDestination::new(&p);
                if dest.is_valid() {
                    Ok(Some(dest))
                } else {
                    info!("BackupSink.destination() -- remembered folder {} no longer valid", p);
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Land a blob somewhere durable. Returns true once it's written; every
    /// step of the chain falls through on failure rather than giving up.
    pub fn save(&self, name: &str, data: &[u8]) -> DResult<bool> {
        // (1) standing folder grant: silent direct write
        match self.destination()? {
            Some(dest) => {
                match dest.write(name, data) {
                    Ok(_) => return Ok(true),
                    Err(e) => {
                        warn!("BackupSink.save() -- write to remembered folder failed ({}), falling through", e);
                    }
                }
            }
            None => {}
        }

        // (2) interactive save-as, if the shell gave us one
        {
            let guard = self.prompter.read().unwrap();
            match *guard {
                Some(ref prompter) => {
                    match prompter.pick_folder(name) {
                        Some(folder) => {
                            let dest = FolderDestination::new(&folder);
                            dest.write(name, data)?;
                            let remember: bool = config::get(&["backup", "remember_folder"]).unwrap_or(true);
                            if remember {
                                self.remember_folder(&folder)?;
                            }
                            return Ok(true);
                        }
                        None => {
                            info!("BackupSink.save() -- user declined the save prompt");
                        }
                    }
                }
                None => {}
            }
        }

        // (3) one-shot download fallback
        let download_folder: String = config::get(&["backup", "download_folder"]).unwrap_or(String::new());
        if download_folder.len() == 0 {
            return Err(DError::MissingData(format!("BackupSink.save() -- no destination, no prompter, no backup.download_folder; {} has nowhere to go", name)));
        }
        let dest = FolderDestination::new(&download_folder);
        dest.write(name, data)?;
        messaging::ui_event("backup-downloaded", &json!({"name": name, "folder": download_folder}))?;
        Ok(true)
    }
}

/// The sink is itself a destination, which is how the snapshot codec writes
/// through the resolution chain without knowing it exists.
impl BackupDestination for BackupSink {
    fn write(&self, name: &str, data: &[u8]) -> DResult<()> {
        self.save(name, data)?;
        Ok(())
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        String::from("backup sink")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::std::env;
    use ::util;
    use ::util::json;

    fn test_dir(tag: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("docket-backup-test-{}-{}", tag, util::time_ms()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn pre_test() -> BackupSink {
        let kv = Arc::new(RwLock::new(Some(Storage::new(&String::from(":memory:"), json::obj()).unwrap())));
        BackupSink::new(kv)
    }

    struct FixedPrompt {
        folder: PathBuf,
    }
    impl SavePrompt for FixedPrompt {
        fn pick_folder(&self, _suggested_name: &str) -> Option<PathBuf> {
            Some(self.folder.clone())
        }
    }

    #[test]
    fn folder_destination_round_trip() {
        let dir = test_dir("dest");
        let dest = FolderDestination::new(&dir);
        assert!(dest.is_valid());
        dest.write("backup.json", b"{\"version\":1}").unwrap();
        let read = fs::read(dir.join("backup.json")).unwrap();
        assert_eq!(&read[..], b"{\"version\":1}");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn remembered_folder_is_used_silently() {
        let dir = test_dir("remembered");
        let sink = pre_test();
        sink.remember_folder(&dir).unwrap();
        assert!(sink.save("chunk.ndjson.gz", b"data").unwrap());
        assert!(dir.join("chunk.ndjson.gz").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn revoked_folder_falls_through_to_prompt() {
        let gone = env::temp_dir().join(format!("docket-gone-{}", util::time_ms()));
        let picked = test_dir("picked");
        let sink = pre_test();
        // remember a folder that doesn't exist anymore
        {
            let guard = sink.kv.write().unwrap();
            guard.as_ref().unwrap().kv_set(FOLDER_KEY, &format!("{}", gone.display())).unwrap();
        }
        sink.set_prompter(Box::new(FixedPrompt { folder: picked.clone() }));
        assert!(sink.save("snap.json", b"{}").unwrap());
        assert!(picked.join("snap.json").exists());
        // the picked folder got remembered for next time
        let dest = sink.destination().unwrap().unwrap();
        assert_eq!(dest.describe(), format!("{}", picked.display()));
        fs::remove_dir_all(&picked).unwrap();
    }

    #[test]
    fn no_destination_at_all_is_an_error() {
        let sink = pre_test();
        let res = sink.save("orphan.json", b"{}");
        assert!(res.is_err());
    }
}
