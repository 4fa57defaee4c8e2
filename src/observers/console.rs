use std::io::{self, Write};

use crate::core::{Error, Kv};
use crate::observers::Observe;

/// Observer writing structured single-line records to an owned writer.
///
/// The sink is owned explicitly instead of going through a process-wide
/// logger, so concurrent executors can write to separate targets without
/// any global state.
///
/// ```rust
/// use optex::observers::ConsoleObserver;
///
/// // Stdout by default, any `Write + Send` works.
/// let stdout = ConsoleObserver::new();
/// let buffer = ConsoleObserver::with_sink(Vec::new());
/// ```
pub struct ConsoleObserver {
    name: String,
    sink: Box<dyn Write + Send>,
}

impl ConsoleObserver {
    /// Creates an observer writing to stdout.
    pub fn new() -> Self {
        Self::with_sink(io::stdout())
    }

    /// Creates an observer writing to given sink.
    pub fn with_sink(sink: impl Write + Send + 'static) -> Self {
        Self {
            name: String::new(),
            sink: Box::new(sink),
        }
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observe for ConsoleObserver {
    fn observe_init(&mut self, name: &str) -> Result<(), Error> {
        self.name = name.to_owned();
        Ok(())
    }

    fn observe_iter(&mut self, record: &Kv) -> Result<(), Error> {
        writeln!(self.sink, "[{}] {}", self.name, record).map_err(Error::observer)?;
        self.sink.flush().map_err(Error::observer)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::kv;

    // Shared buffer so the test can read what the moved-in sink wrote.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_one_line_per_record() {
        let buffer = SharedBuffer::default();
        let mut observer = ConsoleObserver::with_sink(buffer.clone());

        observer.observe_init("progress").unwrap();
        observer.observe_iter(&kv!["iter" => 0, "cost" => 1.0]).unwrap();
        observer.observe_iter(&kv!["iter" => 1, "cost" => 0.5]).unwrap();

        let written = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "[progress] iter=0  cost=1");
        assert_eq!(lines[1], "[progress] iter=1  cost=0.5");
    }
}
