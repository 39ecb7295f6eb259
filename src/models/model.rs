//! The Model type defines an object that maps a unit of user data (an
//! article, a victim, an incident) to a document table, plus the sync
//! bookkeeping every record carries.

use ::std::sync::RwLock;

use ::serde::ser::Serialize;
use ::serde::de::DeserializeOwned;
use ::util::json::{self, Value};
use ::error::{DError, DResult};

lazy_static! {
    /// create a static/global cid counter
    static ref CID_COUNTER: RwLock<u32> = RwLock::new(0);

    /// holds our app's client id
    static ref CLIENT_ID: RwLock<Option<String>> = RwLock::new(None);
}

/// Per-record delivery state. `Synced` implies the failure count is zero
/// (the replayer resets it on confirmation).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum SyncStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "synced")]
    Synced,
    #[serde(rename = "failed")]
    Failed,
}

impl Default for SyncStatus {
    fn default() -> SyncStatus { SyncStatus::Pending }
}

/// Get the model system's client id
pub fn get_client_id() -> Option<String> {
    let guard = (*CLIENT_ID).read().unwrap();
    (*guard).clone()
}

/// Set the model system's client id
pub fn set_client_id(id: String) -> DResult<()> {
    debug!("model -- set_client_id(): {}", id);
    let mut guard = (*CLIENT_ID).write().unwrap();
    *guard = Some(id);
    Ok(())
}

/// Create a random object id from our client id: timestamp + client id +
/// counter, all hex. Used for every record type whose identity isn't
/// content-derived.
pub fn cid() -> DResult<String> {
    let client_id = match get_client_id() {
        Some(ref x) => x.clone(),
        None => return Err(DError::MissingData(format!("model::cid() -- CLIENT_ID missing (storage::setup_client_id() not run?)"))),
    };
    let mut counter_guard = (*CID_COUNTER).write().unwrap();
    let counter: u32 = counter_guard.clone();
    (*counter_guard) += 1;
    let now = ::time::get_time();
    let millis = ((now.sec as u64) * 1000) + ((now.nsec as u64) / 1000000);
    let mut cid = format!("{:01$x}", millis, 12);
    let counter_str = format!("{:01$x}", (counter & 65535), 4);
    cid.push_str(&client_id[..]);
    cid.push_str(&counter_str[..]);
    Ok(cid)
}

/// The model trait defines an interface for (de)serializable objects that
/// carry the common id/sync fields.
pub trait Model: Serialize + DeserializeOwned + Default {
    /// Get this model's ID
    fn id<'a>(&'a self) -> Option<&'a String>;

    /// Set this model's ID
    fn set_id(&mut self, id: String);

    /// Generate an id for this model if it doesn't have one
    fn generate_id<'a>(&'a mut self) -> DResult<&'a String>;

    /// Return this model's id, or an error if it has none
    fn id_or_else(&self) -> DResult<String>;

    /// This record's delivery state
    fn sync_status(&self) -> SyncStatus;
    fn set_sync_status(&mut self, status: SyncStatus);

    /// Turn this model into a JSON string
    fn stringify(&self) -> DResult<String> {
        json::stringify(self).map_err(|e| From::from(e))
    }

    /// Turn this model into a JSON Value
    fn data(&self) -> DResult<Value> {
        json::to_val(self).map_err(|e| From::from(e))
    }

    /// Create a new model from a JSON dump
    fn clone_from(data: Value) -> DResult<Self> {
        json::from_val(data).map_err(|e| From::from(e))
    }

    /// Determine if this model has been saved already or not
    fn is_new(&self) -> bool {
        self.id().is_none()
    }
}

#[macro_export]
/// Defines a model. Adds the id and sync-state fields every record carries
/// to a struct def, and runs some simple impls for us.
macro_rules! model {
    (
        $(#[$struct_meta:meta])*
        pub struct $name:ident {
            $( $inner:tt )*
        }
    ) => {
        $(#[$struct_meta])*
        #[derive(Default)]
        pub struct $name {
            #[serde(default)]
            #[serde(skip_serializing_if = "Option::is_none")]
            pub id: Option<String>,
            #[serde(default)]
            pub sync_status: ::models::model::SyncStatus,
            #[serde(default)]
            pub failure_count: u32,
            #[serde(default)]
            pub last_sync_at: Option<i64>,
            $( $inner )*
        }

        impl $name {
            #[allow(dead_code)]
            pub fn new() -> Self {
                Default::default()
            }
        }

        impl ::models::model::Model for $name {
            fn id<'a>(&'a self) -> Option<&'a String> {
                match self.id {
                    Some(ref x) => Some(x),
                    None => None,
                }
            }

            fn set_id(&mut self, id: String) {
                self.id = Some(id);
            }

            fn generate_id<'a>(&'a mut self) -> ::error::DResult<&'a String> {
                if self.id.is_none() {
                    self.id = Some(::models::model::cid()?);
                }
                Ok(self.id.as_ref().unwrap())
            }

            fn id_or_else(&self) -> ::error::DResult<String> {
                match self.id() {
                    Some(id) => Ok(id.clone()),
                    None => Err(::error::DError::MissingField(format!("{}.id", stringify!($name)))),
                }
            }

            fn sync_status(&self) -> ::models::model::SyncStatus {
                self.sync_status
            }

            fn set_sync_status(&mut self, status: ::models::model::SyncStatus) {
                self.sync_status = status;
            }
        }
    }
}
