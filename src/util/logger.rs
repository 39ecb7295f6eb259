use ::config;
use ::fern;
use ::log;
use ::time;
use ::error::DResult;

/// a simple wrapper that sets up logging to STDOUT via fern/log
pub fn setup_logger() -> DResult<()> {
    let levelstr: String = match config::get(&["loglevel"]) {
        Ok(x) => x,
        Err(_) => String::from("warn"),
    };
    let level = match levelstr.to_lowercase().as_ref() {
        "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => {
            println!("docket: config: bad `loglevel` value (\"{}\"), defaulting to \"warn\"", levelstr);
            log::LevelFilter::Warn
        }
    };
    let res = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                time::now().strftime("%Y-%m-%d %H:%M:%S").unwrap(),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(::std::io::stdout())
        .apply();
    match res {
        Ok(_) => {}
        // a second init (tests, embedders who set up their own logger) is fine
        Err(_) => {}
    }
    Ok(())
}
