use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

/// Where log lines go besides stderr. Cloned into the subscriber at
/// `init`; the copy kept by the caller picks the file once the CLI is read.
#[derive(Clone, Default)]
pub struct LogSink {
    file: Arc<Mutex<Option<File>>>,
}

impl LogSink {
    /// Start appending to `path` (creating parent dirs), or stop teeing on
    /// `None`.
    pub fn set_file(&self, path: Option<&Path>) -> io::Result<()> {
        let file = path.map(open_append).transpose()?;
        if let Ok(mut slot) = self.file.lock() {
            *slot = file;
        }
        Ok(())
    }

    fn tee(&self, f: impl FnOnce(&mut File) -> io::Result<()>) {
        if let Ok(mut slot) = self.file.lock() {
            if let Some(file) = slot.as_mut() {
                let _ = f(file);
            }
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = io::stderr().write(buf)?;
        self.tee(|file| file.write_all(&buf[..n]));
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.tee(|file| file.flush());
        io::stderr().flush()
    }
}

/// Bridge `log` into `tracing` and install the fmt subscriber
/// (`RUST_LOG`, default `info`). The returned sink controls the log file.
pub fn init() -> LogSink {
    let _ = tracing_log::LogTracer::init();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let sink = LogSink::default();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(sink.clone())
        .try_init();
    sink
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_file_receives_output() {
        let sink = LogSink::default();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("todos.log");
        sink.set_file(Some(&path)).unwrap();

        let mut out = sink.make_writer();
        out.write_all(b"hello log\n").unwrap();
        out.flush().unwrap();
        sink.set_file(None).unwrap();
        out.write_all(b"after close\n").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("hello log"));
        assert!(!contents.contains("after close"));
    }
}
