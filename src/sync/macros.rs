/// Grab the db out of its Arc<RwLock<Option<Storage>>> container, or bail
/// with a sane error if it's not there (it can legitimately be None during
/// startup/shutdown).
#[macro_export]
macro_rules! with_db {
    ($dbvar:ident, $dbobj:expr, $errprefix:expr, $( $rest:tt )*) => {
        {
            let db_guard__ = $dbobj.write().unwrap();
            match db_guard__.as_ref() {
                Some($dbvar) => {
                    $( $rest )*
                }
                None => {
                    return Err(::error::DError::MissingData(format!("{} -- `{}` is None", $errprefix, stringify!($dbobj))));
                }
            }
        }
    }
}
