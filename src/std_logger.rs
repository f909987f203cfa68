use chrono::Local;
use log::{max_level, LevelFilter, Metadata, Record, SetLoggerError};

pub struct StdLogger;

static LOGGER: StdLogger = StdLogger;

impl StdLogger {
  /// Installs the stdout logger once per process. Unknown level names fall back to `info`.
  pub fn init(level: &str) -> Result<LevelFilter, SetLoggerError> {
    let level_filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level_filter);
    Ok(level_filter)
  }
}

impl log::Log for StdLogger {
  fn enabled(&self, metadata: &Metadata) -> bool {
    metadata.level() <= max_level()
  }

  fn log(&self, record: &Record) {
    if self.enabled(record.metadata()) {
      let time_str = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
      println!(
        "{0} {1:<8} {2}: {3}",
        time_str,
        record.level(),
        record.target(),
        record.args()
      )
    }
  }

  fn flush(&self) {}
}
