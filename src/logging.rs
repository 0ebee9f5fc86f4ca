use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use serde::Serialize;
use std::sync::OnceLock;
use tokio::sync::broadcast;

static LOGGER: OnceLock<BridgeLogger> = OnceLock::new();

/// Capacity of the log fan-out; slow subscribers skip the oldest records
const LOG_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Serialize, Clone)]
pub struct LogMessage {
    pub level: String,
    pub message: String,
    pub timestamp: String,
}

pub struct BridgeLogger {
    level: Level,
    sender: broadcast::Sender<LogMessage>,
}

impl BridgeLogger {
    pub fn new(level: Level) -> Self {
        let (sender, _) = broadcast::channel(LOG_CHANNEL_CAPACITY);
        Self { level, sender }
    }

    /// Installs the process-wide logger. Fails if any logger is already set.
    pub fn init(level: Level) -> Result<(), SetLoggerError> {
        let logger = LOGGER.get_or_init(|| BridgeLogger::new(level));
        log::set_logger(logger).map(|()| log::set_max_level(level.to_level_filter()))
    }

    /// Log records as they are emitted, for a UI log pane
    pub fn subscribe() -> Option<broadcast::Receiver<LogMessage>> {
        LOGGER.get().map(|logger| logger.sender.subscribe())
    }

    fn emit_log(&self, record: &Record) {
        if self.sender.receiver_count() == 0 {
            return;
        }
        let log_message = LogMessage {
            level: record.level().to_string(),
            message: record.args().to_string(),
            timestamp: Local::now().to_rfc3339(),
        };
        let _ = self.sender.send(log_message);
    }
}

impl log::Log for BridgeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
            self.emit_log(record);
        }
    }

    fn flush(&self) {}
}

/// Installs `BridgeLogger`, falling back to env_logger if that fails
pub fn setup_logging(level: Level) {
    if BridgeLogger::init(level).is_err() {
        let _ = env_logger::builder()
            .filter_level(LevelFilter::Info)
            .try_init();
    }
    log::info!("Logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn forwards_enabled_records_to_subscribers() {
        let logger = BridgeLogger::new(Level::Info);
        let mut rx = logger.sender.subscribe();

        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("radio off"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .args(format_args!("too chatty"))
                .build(),
        );

        let message = rx.try_recv().unwrap();
        assert_eq!(message.level, "WARN");
        assert_eq!(message.message, "radio off");
        assert!(rx.try_recv().is_err());
    }
}
