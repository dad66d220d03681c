//! Logging configuration for the PrepX client.
//!
//! Output goes to stderr so command output on stdout stays pipeable. At the
//! default CLI levels a record is a single `level: message` line; debug and
//! trace runs add a timestamp and the module target.

use chrono::Local;
use env_logger::{Builder, Env, Target};
use log::{debug, Level, LevelFilter};
use std::io::Write;

/// Initialize the logging system. `PREPX_LOG` overrides `level` and
/// `PREPX_LOG_STYLE` (`auto`, `always`, `never`) controls colour.
pub fn init_logging(level: &str) {
    let env = Env::default()
        .filter_or("PREPX_LOG", level)
        .write_style_or("PREPX_LOG_STYLE", "auto");

    let mut builder = Builder::from_env(env);
    builder
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            let tag = style.value(label(record.level()));
            if is_detailed(log::max_level()) {
                writeln!(
                    buf,
                    "{} {:7} [{}] {}",
                    Local::now().format("%H:%M:%S%.3f"),
                    tag,
                    record.target(),
                    record.args()
                )
            } else {
                writeln!(buf, "{}: {}", tag, record.args())
            }
        })
        .target(Target::Stderr);

    if builder.try_init().is_ok() {
        debug!("Logging initialized at level: {}", level);
    }
}

fn is_detailed(max: LevelFilter) -> bool {
    max >= LevelFilter::Debug
}

fn label(level: Level) -> &'static str {
    match level {
        Level::Error => "error",
        Level::Warn => "warning",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
    }
}

/// Initialize test logging (for use in tests)
pub fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(LevelFilter::Debug)
        .try_init();
}
