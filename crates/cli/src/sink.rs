use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info};

use common::Result;
use sweep::{ResultSink, ScanResult, ScanSettings};

/// Appends one JSON object per result to a file per scan.
pub struct JsonLinesSink {
    dir: PathBuf,
    current: Option<(PathBuf, BufWriter<File>)>,
}

/// A result together with the device it was taken from.
#[derive(Serialize)]
struct Record<'a> {
    host: &'a str,
    interface: &'a str,
    #[serde(flatten)]
    result: &'a ScanResult,
}

impl JsonLinesSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: None,
        }
    }

    /// File receiving results of the current scan, once one was started.
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|(path, _)| path.as_path())
    }

    fn file_name(now: OffsetDateTime) -> String {
        format!(
            "scan-{:04}{:02}{:02}-{:02}{:02}{:02}-{:08x}.jsonl",
            now.year(),
            u8::from(now.month()),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
            common::random_u64() as u32,
        )
    }
}

impl ResultSink for JsonLinesSink {
    fn start_new_scan(&mut self) -> Result<()> {
        if let Some((_, mut writer)) = self.current.take() {
            writer.flush()?;
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(Self::file_name(OffsetDateTime::now_utc()));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(path = %path.display(), "writing results");
        self.current = Some((path, BufWriter::new(file)));
        Ok(())
    }

    fn save_result(&mut self, result: &ScanResult, settings: &ScanSettings) -> Result<()> {
        if self.current.is_none() {
            self.start_new_scan()?;
        }
        let Some((path, writer)) = self.current.as_mut() else {
            return Ok(());
        };

        let record = Record {
            host: &settings.host,
            interface: &settings.interface,
            result,
        };
        serde_json::to_writer(&mut *writer, &record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        debug!(path = %path.display(), status = ?result.status, "result saved");
        Ok(())
    }
}
