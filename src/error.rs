use ::std::error::Error;
use ::std::convert::From;

use ::util::json::JSONError;

quick_error! {
    #[derive(Debug)]
    /// Docket's main error object.
    pub enum DError {
        Boxed(err: Box<dyn Error + Send + Sync>) {
            description(err.description())
            display("error: {}", err)
        }
        Msg(str: String) {
            description(str)
            display("error: {}", str)
        }
        BadValue(str: String) {
            description(str)
            display("bad value: {}", str)
        }
        MissingField(str: String) {
            description(str)
            display("missing field: {}", str)
        }
        MissingData(str: String) {
            description(str)
            display("missing data: {}", str)
        }
        /// A high-confidence duplicate blocked a write. Carries the id of the
        /// existing record the candidate collided with.
        Duplicate(id: String) {
            description("duplicate record")
            display("duplicate of existing record: {}", id)
        }
        /// Local storage failures are fatal to the triggering operation.
        Storage(err: ::rusqlite::Error) {
            cause(err)
            description("storage error")
            display("storage error: {}", err)
        }
        JSON(err: JSONError) {
            cause(err)
            description("JSON error")
            display("JSON error: {}", err)
        }
        /// The remote answered with a non-2xx status.
        Api(status: ::reqwest::StatusCode) {
            description("API error")
            display("api error: {}", status.canonical_reason().unwrap_or("unknown"))
        }
        /// We never even got an answer from the remote.
        Network(str: String) {
            description(str)
            display("network error: {}", str)
        }
    }
}

/// A macro to make it easy to create From impls for DError
macro_rules! from_err {
    ($t:ty) => (
        impl From<$t> for DError {
            fn from(err: $t) -> DError {
                DError::Boxed(Box::new(err))
            }
        }
    )
}

impl From<JSONError> for DError {
    fn from(err: JSONError) -> DError {
        match err {
            JSONError::Boxed(x) => DError::Boxed(x),
            _ => DError::JSON(err),
        }
    }
}
impl From<::rusqlite::Error> for DError {
    fn from(err: ::rusqlite::Error) -> DError {
        DError::Storage(err)
    }
}
impl From<::reqwest::Error> for DError {
    fn from(err: ::reqwest::Error) -> DError {
        DError::Network(format!("{}", err))
    }
}
from_err!(::std::io::Error);
from_err!(::std::string::FromUtf8Error);
from_err!(::std::num::ParseIntError);
from_err!(::fern::InitError);
from_err!(::time::ParseError);
from_err!(::glob::PatternError);
from_err!(::glob::GlobError);

pub type DResult<T> = Result<T, DError>;

impl DError {
    /// Delivery failures (network trouble, non-2xx answers) are recoverable
    /// and recorded per queue entry; everything else aborts the operation
    /// that hit it.
    pub fn is_delivery_failure(&self) -> bool {
        match *self {
            DError::Api(..) | DError::Network(..) => true,
            _ => false,
        }
    }
}
