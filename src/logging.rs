use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

pub const LOG_ENV: &str = "BURROW_LOG";

/// In-memory sink for formatted log lines. The terminal belongs to the
/// session, so logs collect here until a repaint drains them.
#[derive(Clone, Default)]
pub struct LogBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> String {
        let bytes = std::mem::take(&mut *self.bytes.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }
}

pub struct LogWriter {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            bytes: Arc::clone(&self.bytes),
        }
    }
}

fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber writing into a fresh buffer. ANSI styling is
/// kept only when the buffer will be shown in the debug panel.
pub fn init(default_directive: &str, styled: bool) -> Result<LogBuffer> {
    let buffer = LogBuffer::new();
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_directive))
        .with_writer(buffer.clone())
        .with_ansi(styled)
        .with_target(false)
        .without_time()
        .try_init()
        .map_err(|err| Error::Logging(err.to_string()))?;
    Ok(buffer)
}
