use std::sync::{Arc, Mutex};

use common::Result;

use crate::result::ScanResult;
use crate::settings::ScanSettings;

/// Persistence for emitted results. Errors are logged by the caller and
/// never stop a scan.
pub trait ResultSink: Send {
    /// Called once per run, before the baseline record.
    fn start_new_scan(&mut self) -> Result<()>;

    fn save_result(&mut self, result: &ScanResult, settings: &ScanSettings) -> Result<()>;
}

/// Keeps results in memory; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    scans: Arc<Mutex<Vec<Vec<ScanResult>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results of the most recent run.
    pub fn results(&self) -> Vec<ScanResult> {
        self.lock().last().cloned().unwrap_or_default()
    }

    pub fn scan_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<ScanResult>>> {
        self.scans.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResultSink for MemorySink {
    fn start_new_scan(&mut self) -> Result<()> {
        self.lock().push(Vec::new());
        Ok(())
    }

    fn save_result(&mut self, result: &ScanResult, _settings: &ScanSettings) -> Result<()> {
        let mut scans = self.lock();
        if scans.is_empty() {
            scans.push(Vec::new());
        }
        if let Some(current) = scans.last_mut() {
            current.push(result.clone());
        }
        Ok(())
    }
}
