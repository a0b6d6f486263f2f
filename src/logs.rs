use std::path::Path;

use anyhow::Result;
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    {ContentLimit, FileRotate},
};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

/// Writes to a rolling file under `log_dir`. Call once at bootstrap.
pub fn init(log_dir: &str) -> Result<()> {
    let path = Path::new(log_dir).join("wayfarer.log");
    let log = FileRotate::new(
        path,
        AppendTimestamp::default(FileLimit::MaxFiles(3)),
        ContentLimit::Lines(1000),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    WriteLogger::init(LevelFilter::Info, config, log)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    #[test]
    fn init_creates_the_log_file() {
        let temp_dir = TempDir::new("logs-init").unwrap();
        let dir = temp_dir.path().to_str().unwrap().to_string();
        super::init(&dir).unwrap();
        info!("hello from the test");
        log::logger().flush();
        assert!(temp_dir.path().join("wayfarer.log").exists());
    }
}
