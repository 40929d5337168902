use std::path::Path;

use anyhow::Result;
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    {ContentLimit, FileRotate},
};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

/// Terminal logging at info level, plus a rolling file logger under
/// `<dir>/logs/main.log` when a directory is given.
pub fn init(log_dir: Option<&str>) -> Result<()> {
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Info,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(dir) = log_dir {
        let path = Path::new(dir).join("logs/main.log");
        let file = FileRotate::new(
            path,
            AppendTimestamp::default(FileLimit::MaxFiles(3)),
            ContentLimit::Lines(1000),
            Compression::None,
            #[cfg(unix)]
            None,
        );
        loggers.push(WriteLogger::new(LevelFilter::Info, config, file));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}
