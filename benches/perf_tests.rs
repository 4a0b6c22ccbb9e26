use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Once;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lazy_static::lazy_static;
use log::LevelFilter;
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use parking_lot::Mutex;
use tempfile::tempdir;

use taglog::cache::{new_cache, TagCache};
use taglog::{log_info, log_verbose, CachePolicy, LogLevel, Logger, LoggerConfig};

static LOG4RS_INIT: Once = Once::new();

lazy_static! {
    static ref FILE_SINK: Mutex<Option<BufWriter<File>>> = Mutex::new(None);
}

static TAGS: [&str; 16] = [
    "wifi", "net", "disk", "boot", "uart", "spi", "i2c", "adc", "pwm", "gpio", "nvs", "ota",
    "ble", "http", "mqtt", "fs",
];

fn null_sink(bytes: &[u8]) -> usize {
    black_box(bytes).len()
}

fn file_sink(bytes: &[u8]) -> usize {
    match FILE_SINK.lock().as_mut().map(|w| w.write_all(bytes)) {
        Some(Ok(())) => bytes.len(),
        _ => 0,
    }
}

fn setup_log4rs(log_file: &std::path::Path) {
    LOG4RS_INIT.call_once(|| {
        let logfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{l} ({d}) {t}: {m}{n}")))
            .build(log_file)
            .unwrap();

        let config = Config::builder()
            .appender(Appender::builder().build("logfile", Box::new(logfile)))
            .build(Root::builder().appender("logfile").build(LevelFilter::Info))
            .unwrap();

        log4rs::init_config(config).unwrap();
    });
}

fn quiet_logger(config: LoggerConfig) -> Logger {
    let logger = Logger::new(config.with_colors(false));
    logger.set_vprintf(null_sink);
    logger.clock().mark_ready();
    for tag in &TAGS[..8] {
        logger.set_level(*tag, LogLevel::Info).unwrap();
    }
    logger
}

fn bench_tag_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("tag lookup");
    for policy in [CachePolicy::Array, CachePolicy::BinaryHeap, CachePolicy::Disabled] {
        let logger = quiet_logger(LoggerConfig::default().with_cache_policy(policy));
        group.bench_function(format!("{:?}", policy), |b| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % TAGS.len();
                black_box(logger.get_level(TAGS[i]))
            })
        });
    }

    group.bench_function("heap cache hit", |b| {
        let mut cache = new_cache(CachePolicy::BinaryHeap, 31, false);
        for tag in TAGS {
            cache.insert(tag, LogLevel::Info);
        }
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % TAGS.len();
            black_box(cache.get(TAGS[i]))
        })
    });
    group.finish();
}

fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");
    let text = quiet_logger(LoggerConfig::default());
    let binary = quiet_logger(LoggerConfig::default().with_binary_mode(true));
    let peer = String::from("10.0.0.2");

    group.bench_function("filtered out", |b| {
        b.iter(|| log_verbose!(logger: &text, "wifi", "rssi %d", black_box(-61)))
    });
    group.bench_function("text", |b| {
        b.iter(|| {
            log_info!(logger: &text, "net", "peer %s port %d took %.3f ms", peer, black_box(8080), 1.25)
        })
    });
    group.bench_function("binary", |b| {
        b.iter(|| {
            log_info!(logger: &binary, "net", "peer %s port %d took %.3f ms", peer, black_box(8080), 1.25)
        })
    });
    group.finish();
}

fn bench_file_comparison(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let mut group = c.benchmark_group("file output");
    group.sample_size(20);

    *FILE_SINK.lock() = Some(BufWriter::new(File::create(dir.path().join("taglog.log")).unwrap()));
    let logger = quiet_logger(LoggerConfig::default());
    logger.set_vprintf(file_sink);
    group.bench_function("taglog text", |b| {
        b.iter(|| log_info!(logger: &logger, "disk", "block %u written, %d left", black_box(42u32), 7))
    });

    *FILE_SINK.lock() = Some(BufWriter::new(File::create(dir.path().join("taglog.bin")).unwrap()));
    let logger = quiet_logger(LoggerConfig::default().with_binary_mode(true));
    logger.set_vprintf(file_sink);
    group.bench_function("taglog binary", |b| {
        b.iter(|| log_info!(logger: &logger, "disk", "block %u written, %d left", black_box(42u32), 7))
    });

    setup_log4rs(&dir.path().join("log4rs.log"));
    group.bench_function("log4rs", |b| {
        b.iter(|| log::info!(target: "disk", "block {} written, {} left", black_box(42u32), 7))
    });

    group.finish();
    if let Some(mut writer) = FILE_SINK.lock().take() {
        writer.flush().unwrap();
    }
}

criterion_group!(benches, bench_tag_lookup, bench_formatting, bench_file_comparison);
criterion_main!(benches);
