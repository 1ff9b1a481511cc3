use std::fs::File;

use colored::Colorize;
use middleware::logger::LoggerMiddleware;

pub mod middleware {
    pub mod logger;
}

pub const LOG_FILE: &str = "qrtrack.log";

/// Installs the global logger: colored lines on stdout, plain copy in [`LOG_FILE`].
pub fn setup(is_production: bool) -> Result<(), fern::InitError> {
    File::create(LOG_FILE).map_err(fern::InitError::Io)?;

    let level = if is_production {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Debug
    };

    let console = fern::Dispatch::new()
        .format(|out, message, record| {
            let color = match record.level() {
                log::Level::Info => "green",
                log::Level::Warn => "yellow",
                log::Level::Error => "red",
                log::Level::Debug => "magenta",
                log::Level::Trace => "bright black",
            };
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                record.target(),
                record.level().to_string().color(color),
                message
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .chain(fern::log_file(LOG_FILE)?);

    fern::Dispatch::new()
        .level(level)
        .level_for("hyper", log::LevelFilter::Off)
        .level_for("sqlx::query", log::LevelFilter::Warn)
        .level_for("lettre", log::LevelFilter::Info)
        .level_for("rustls", log::LevelFilter::Warn)
        .chain(console)
        .chain(file)
        .apply()?;
    Ok(())
}

/// Request logging middleware. `enabled = false` passes requests through silently.
pub fn middleware(enabled: bool) -> LoggerMiddleware {
    LoggerMiddleware::new(enabled)
}
