use colored::Colorize;
use middleware::logger::LoggerMiddleware;

pub mod middleware {
    pub mod logger;
}

pub mod redact;

/// Installs the global logger: coloured lines on stdout, mirrored to
/// `log_file` when one is given.
pub fn setup(log_file: Option<&str>, level: log::LevelFilter) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
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
        .level(level)
        .level_for("hyper", log::LevelFilter::Off)
        .level_for("h2", log::LevelFilter::Off)
        .chain(std::io::stdout());

    if let Some(path) = log_file {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}

pub fn middleware(enabled: bool, body_limit: usize) -> LoggerMiddleware {
    LoggerMiddleware::new(enabled, body_limit)
}
