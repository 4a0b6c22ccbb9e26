use std::io;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use taglog::{
    binary_log, early_log_info, log_buffer_hexdump, log_debug, log_error, log_info, log_warn,
    CachePolicy, LogLevel, LogReader, Logger, LoggerConfig,
};

lazy_static! {
    static ref CAPTURE: Mutex<Vec<u8>> = Mutex::new(Vec::new());
}

fn capture(bytes: &[u8]) -> usize {
    CAPTURE.lock().extend_from_slice(bytes);
    bytes.len()
}

fn text_demo() -> Result<(), taglog::LogError> {
    let logger = taglog::global();
    logger.clock().mark_ready();
    logger.set_level("*", LogLevel::Warn)?;
    logger.set_level("net", LogLevel::Debug)?;

    log_info!("net", "link up, %d Mbps full duplex", 100);
    log_debug!("net", "dhcp lease %s for %u s", "192.168.1.20", 86_400u32);
    log_info!("disk", "this line is filtered out");
    log_warn!("disk", "free space low: %.1f%%", 4.5);
    log_error!(None, "untagged error %#x", 0xdead_u32);
    early_log_info!("boot", "constrained call, tag check skipped");
    log_buffer_hexdump(logger, Some("net"), b"taglog hexdump demo\x00\x01\x02", LogLevel::Info);
    Ok(())
}

fn binary_demo(dump_path: Option<String>) -> io::Result<()> {
    let logger = Logger::new(
        LoggerConfig::default()
            .with_binary_mode(true)
            .with_cache_policy(CachePolicy::Array)
            .with_producer_id(7),
    );
    logger.set_vprintf(capture);
    logger.clock().mark_ready();

    let peer = String::from("10.0.0.2");
    log_info!(logger: &logger, "net", "connected to %s:%d", peer, 8080);
    log_warn!(logger: &logger, "sensor", "temperature %.2f C above %d", 71.25, 70);
    binary_log!(logger: &logger, LogLevel::Error, "net", "retries exhausted after %lld ms", 1_500i64);

    let bytes = std::mem::take(&mut *CAPTURE.lock());
    println!("-- {} bytes of binary records --", bytes.len());
    for entry in LogReader::new(&bytes) {
        match entry {
            Ok(entry) => println!("{}", entry.format()),
            Err(e) => eprintln!("decode error: {}", e),
        }
    }

    if let Some(path) = dump_path {
        std::fs::write(&path, &bytes)?;
        println!("binary stream written to {}", path);
    }
    Ok(())
}

fn main() -> io::Result<()> {
    let (writer, _guard) = tracing_appender::non_blocking(io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .init();

    if let Err(e) = text_demo() {
        tracing::error!(error = %e, "text demo failed");
    }
    binary_demo(std::env::args().nth(1))
}
