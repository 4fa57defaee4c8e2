use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::{Error, Kv};
use crate::observers::Observe;

/// Observer appending serialized records to a file, one JSON document per
/// line.
///
/// The target file is created at registration time, together with a header
/// document carrying the observer name. Every fired iteration appends one
/// record, so the file is a complete, ordered trace of the run that can be
/// post-processed line by line.
pub struct FileObserver {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

#[derive(Serialize)]
struct Header<'a> {
    observer: &'a str,
}

impl FileObserver {
    /// Creates an observer that will write to given path.
    ///
    /// The file itself (and any missing parent directory) is created when
    /// the observer is registered.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    /// Returns the target path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Observe for FileObserver {
    fn observe_init(&mut self, name: &str) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(Error::observer)?;
            }
        }

        let file = File::create(&self.path).map_err(Error::observer)?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer(&mut writer, &Header { observer: name }).map_err(Error::observer)?;
        writeln!(writer).map_err(Error::observer)?;

        self.writer = Some(writer);
        Ok(())
    }

    fn observe_iter(&mut self, record: &Kv) -> Result<(), Error> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::observer("file observer was not registered"))?;

        serde_json::to_writer(&mut *writer, record).map_err(Error::observer)?;
        writeln!(writer).map_err(Error::observer)?;
        writer.flush().map_err(Error::observer)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::kv;
    use crate::testing::scratch_path;

    #[test]
    fn header_then_one_record_per_iteration() {
        let path = scratch_path("file-observer.jsonl");
        let mut observer = FileObserver::new(&path);

        observer.observe_init("trace").unwrap();
        observer.observe_iter(&kv!["iter" => 0, "cost" => 2.0]).unwrap();
        observer.observe_iter(&kv!["iter" => 1, "cost" => 1.0]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#"{"observer":"trace"}"#);

        let record: Kv = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(record, kv!["iter" => 1, "cost" => 1.0]);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn unregistered_observer_fails_typed() {
        let mut observer = FileObserver::new(scratch_path("never-created.jsonl"));
        let error = observer.observe_iter(&kv!["iter" => 0]).unwrap_err();
        assert!(matches!(error, Error::Observer(_)));
    }
}
