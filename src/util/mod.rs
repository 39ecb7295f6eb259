use ::std::thread;
use ::std::time::Duration;
use ::std::fs;

use ::time;

use ::error::DResult;

pub mod event;
pub mod json;
pub mod logger;

pub fn sleep(millis: u64) {
    thread::sleep(Duration::from_millis(millis));
}

/// Current unix time, milliseconds.
pub fn time_ms() -> i64 {
    let now = time::get_time();
    (now.sec as i64) * 1000 + ((now.nsec as i64) / 1000000)
}

pub fn create_dir<P: AsRef<::std::path::Path>>(dir: P) -> DResult<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}
