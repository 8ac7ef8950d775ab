//! Append-only run log writer.

use crate::error::AppResult;
use crate::runlog::record::Record;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes one record per line and flushes after every record, so a run interrupted at
/// any point is readable up to its last completed record.
pub struct RunLogWriter {
    path: PathBuf,
    out: BufWriter<File>,
    records: usize,
}

impl RunLogWriter {
    /// Create (or truncate) the log at `path`.
    pub fn create(path: &Path) -> AppResult<Self> {
        let file = File::create(path)?;
        tracing::debug!(path = %path.display(), "Opened run log");
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            records: 0,
        })
    }

    /// Append a record and flush it to disk.
    pub fn append(&mut self, record: &Record) -> AppResult<()> {
        let line = serde_json::to_string(record)?;
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.records += 1;
        Ok(())
    }

    /// Path of the log being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Flush and sync the log, consuming the writer.
    pub fn close(mut self) -> AppResult<()> {
        self.out.flush()?;
        self.out.get_ref().sync_all()?;
        tracing::debug!(path = %self.path.display(), records = self.records, "Closed run log");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runlog::reader::load_run;
    use crate::runlog::record::{Footer, Header, ReadSample};
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn every_record_is_visible_before_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("iter_01.jl");
        let mut writer = RunLogWriter::create(&path).unwrap();

        writer
            .append(&Record::Header(Header {
                prog: "mock".into(),
                prog_dev: "2716".into(),
                datetime: Utc::now().naive_utc(),
                interval: 1.0,
                erased_threshold: 20.0,
                user: None,
                sn: Some("ee20".into()),
                eraser: None,
                bulb: None,
                read: None,
            }))
            .unwrap();
        writer
            .append(&Record::Read(ReadSample {
                iter: 1,
                seconds: 0.0,
                read: String::new(),
                read_meta: "zlib".into(),
                complete_percent: 100.0,
                erase_percent: 100.0,
                erased: true,
            }))
            .unwrap();

        // Readable mid-run: header and sample present, no footer yet
        let partial = load_run(&path).unwrap();
        assert_eq!(partial.reads.len(), 1);
        assert!(!partial.is_complete());

        writer
            .append(&Record::Footer(Footer {
                erase_time: Some(0.0),
                run_time: 0.0,
                half_erase_time: Some(0.0),
                prog_time: None,
            }))
            .unwrap();
        assert_eq!(writer.records(), 3);
        writer.close().unwrap();

        let run = load_run(&path).unwrap();
        assert!(run.is_complete());
        assert_eq!(run.header.sn.as_deref(), Some("EE20"));
    }
}
