use std::io::Write;

use colored::*;
use log::{Level, LevelFilter};

/// 由 `-v` 的次数得到日志级别
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn label(level: Level) -> ColoredString {
    match level {
        Level::Error => "Error".red(),
        Level::Warn => "Warning".yellow(),
        Level::Info => "INFO".blue(),
        Level::Debug => "DEBUG".magenta(),
        Level::Trace => "TRACE".normal(),
    }
}

/// 初始化日志
///
/// 默认级别由 `verbosity` 决定，`RUST_LOG` 中的设置会覆盖它。
/// 日志写到 stderr，扫描结果只写 stdout。
pub fn init_logger(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level_for_verbosity(verbosity));
    builder.filter_module("reqwest", LevelFilter::Warn);
    builder.filter_module("hyper", LevelFilter::Warn);
    builder.filter_module("trust_dns_proto", LevelFilter::Error);
    builder.filter_module("trust_dns_resolver", LevelFilter::Warn);
    builder.parse_env("RUST_LOG");

    builder.format(|buf, record| {
        writeln!(buf, "[{}] {}", label(record.level()), record.args())
    });

    builder.try_init()
}
