//! Implements the `Store` trait using in-memory data.
//!
//! Note: this is compiled even in the "production" version of this app so
//! that we can run the whole app, top-to-bottom, without touching Google
//! Sheets (see `Mode::from_env`).

use crate::store::{PartitionStatus, Store};
use crate::Result;
use anyhow::bail;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    partitions: HashMap<String, Vec<Vec<String>>>,
    create_calls: usize,
    fail_lookups: bool,
    fail_reads: bool,
    fail_appends: bool,
}

/// An in-memory `Store`. Clones share the same data, so a test can keep a
/// handle while the ledger owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// The rows of a partition, header included, or `None` if it was never
    /// created.
    pub fn rows(&self, label: &str) -> Option<Vec<Vec<String>>> {
        self.lock().partitions.get(label).cloned()
    }

    /// How many partitions have been created so far.
    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    /// Makes every subsequent lookup fail.
    pub fn fail_lookups(&self) {
        self.lock().fail_lookups = true;
    }

    /// Makes every subsequent column-range read fail.
    pub fn fail_reads(&self) {
        self.lock().fail_reads = true;
    }

    /// Makes every subsequent append fail.
    pub fn fail_appends(&self) {
        self.lock().fail_appends = true;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get_partition(&mut self, label: &str) -> Result<PartitionStatus> {
        let inner = self.lock();
        if inner.fail_lookups {
            bail!("lookup failure (injected)");
        }
        Ok(if inner.partitions.contains_key(label) {
            PartitionStatus::Found
        } else {
            PartitionStatus::NotFound
        })
    }

    async fn create_partition(
        &mut self,
        label: &str,
        _column_count: i64,
        _row_capacity: i64,
    ) -> Result<()> {
        let mut inner = self.lock();
        inner.create_calls += 1;
        inner.partitions.insert(label.to_string(), Vec::new());
        Ok(())
    }

    async fn write_row(&mut self, label: &str, _range: &str, row: Vec<String>) -> Result<()> {
        let mut inner = self.lock();
        match inner.partitions.get_mut(label) {
            Some(rows) => {
                if rows.is_empty() {
                    rows.push(row);
                } else {
                    rows[0] = row;
                }
                Ok(())
            }
            None => bail!("Partition '{label}' not found"),
        }
    }

    async fn append_row(&mut self, label: &str, row: Vec<String>) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_appends {
            bail!("append failure (injected)");
        }
        match inner.partitions.get_mut(label) {
            Some(rows) => {
                rows.push(row);
                Ok(())
            }
            None => bail!("Partition '{label}' not found"),
        }
    }

    async fn read_column_range(&mut self, label: &str, _columns: &str) -> Result<Vec<Vec<String>>> {
        let inner = self.lock();
        if inner.fail_reads {
            bail!("read failure (injected)");
        }
        match inner.partitions.get(label) {
            Some(rows) => Ok(rows.clone()),
            None => bail!("Partition '{label}' not found"),
        }
    }
}
