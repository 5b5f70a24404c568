use std::{
    fs::File,
    io::{self, Write},
    sync::Mutex,
    time::Instant,
};

use chrono::Utc;
use once_cell::sync::OnceCell;

static LOGGER: OnceCell<Logger> = OnceCell::new();

/// Where the trace lines end up: console or a file in the temp directory.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum LogKind {
    /// Log to stdout, the default choice.
    Stdout,

    /// Log to /tmp/armsim-<timestamp>.log
    File,
}

struct LoggerImpl {
    sink: Box<dyn Write + Send>,
    start_instant: Instant,
}

impl LoggerImpl {
    fn new(kind: LogKind) -> Self {
        let start_instant = Instant::now();
        let sink: Box<dyn Write + Send> = match kind {
            LogKind::Stdout => Box::new(io::stdout()),
            LogKind::File => {
                let now = Utc::now();
                let filename = format!("armsim-{}.log", now.timestamp());
                let path = std::env::temp_dir().join(filename);
                Box::new(File::create(path).unwrap())
            }
        };

        Self {
            sink,
            start_instant,
        }
    }

    fn log<T>(&mut self, data: T)
    where
        T: std::fmt::Display,
    {
        let now = self.start_instant.elapsed();
        let seconds = now.as_secs();
        let hours = seconds / 3600;
        let minutes = (seconds / 60) % 60;
        let seconds = seconds % 60;
        let milliseconds = now.subsec_millis();

        writeln!(
            self.sink,
            "[{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}] {data}"
        )
        .unwrap();
    }
}

struct Logger {
    inner: Mutex<LoggerImpl>,
}

impl Logger {
    fn new(kind: LogKind) -> Self {
        Self {
            inner: Mutex::new(LoggerImpl::new(kind)),
        }
    }

    fn log<T>(&self, data: T)
    where
        T: std::fmt::Display,
    {
        if let Ok(ref mut inner) = self.inner.lock() {
            inner.log(data);
        }
    }
}

/// Picks the sink for the whole process. Later calls are ignored.
pub fn init_logger(kind: LogKind) {
    LOGGER.set(Logger::new(kind)).ok();
}

/// Emits one trace line. A no-op until [`init_logger`] has been called.
pub fn log<T>(data: T)
where
    T: std::fmt::Display,
{
    LOGGER.get().map_or((), |logger| logger.log(data));
}
