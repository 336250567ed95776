//! Builds ledger entries and persists them to the month partition for "now",
//! maintaining the running monthly total.

use crate::category::Category;
use crate::error::WriteError;
use crate::store::{PartitionStatus, Store, COLUMN_COUNT, HEADER, ROW_CAPACITY};
use chrono::Local;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

/// Timestamp format written to the store: day/month/year, 24-hour clock.
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// Zero-based index of the Amount column within a row.
const AMOUNT_COLUMN: usize = 3;

/// One fully computed expense record, exactly as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub timestamp: String,
    pub sender: String,
    pub description: String,
    pub amount: Decimal,
    pub category: Category,
    /// Cumulative amount for the month partition, this entry included.
    pub running_sum: Decimal,
}

impl LedgerEntry {
    fn row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.sender.clone(),
            self.description.clone(),
            self.amount.to_string(),
            self.category.to_string(),
            self.running_sum.to_string(),
        ]
    }
}

/// Appends entries to the store, one month partition at a time.
pub struct Ledger {
    store: Box<dyn Store>,
}

impl Ledger {
    pub fn new(store: Box<dyn Store>) -> Self {
        Self { store }
    }

    /// Persists one entry: resolves the current month partition, creates it
    /// with its header row if needed, computes the running sum and appends.
    ///
    /// The sum read and the append are two separate store calls with no
    /// transaction between them. This process is assumed to be the sole
    /// writer to a partition; concurrent external writers can double-read
    /// the same prior sum.
    pub async fn record(
        &mut self,
        sender: &str,
        description: &str,
        amount: Decimal,
        category: Category,
    ) -> Result<LedgerEntry, WriteError> {
        let now = Local::now();
        let label = now.format("%B").to_string();

        self.ensure_partition(&label).await?;
        let prior = self.prior_sum(&label).await;

        let entry = LedgerEntry {
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            sender: sender.to_string(),
            description: description.to_string(),
            amount,
            category,
            running_sum: prior + amount,
        };
        self.store
            .append_row(&label, entry.row())
            .await
            .map_err(WriteError::Append)?;
        debug!(
            "Saved to {label}: {} - {} - ${} - {} - running sum ${}",
            entry.sender, entry.description, entry.amount, entry.category, entry.running_sum
        );
        Ok(entry)
    }

    /// Creates the partition and its header row if the partition is absent.
    /// A lookup failure aborts without attempting creation.
    async fn ensure_partition(&mut self, label: &str) -> Result<(), WriteError> {
        match self
            .store
            .get_partition(label)
            .await
            .map_err(WriteError::PartitionLookup)?
        {
            PartitionStatus::Found => Ok(()),
            PartitionStatus::NotFound => {
                self.store
                    .create_partition(label, COLUMN_COUNT, ROW_CAPACITY)
                    .await
                    .map_err(WriteError::PartitionCreate)?;
                let header = HEADER.iter().map(|s| s.to_string()).collect();
                self.store
                    .write_row(label, "A1:F1", header)
                    .await
                    .map_err(WriteError::PartitionCreate)
            }
        }
    }

    /// Sums the Amount column over previously persisted rows, skipping the
    /// header. Missing or non-numeric cells contribute zero, and a failed
    /// read degrades to zero rather than blocking the append.
    async fn prior_sum(&mut self, label: &str) -> Decimal {
        let rows = match self.store.read_column_range(label, "A:F").await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Error calculating running sum for {label}, treating it as zero: {e:#}");
                return Decimal::ZERO;
            }
        };
        rows.iter()
            .skip(1)
            .filter_map(|row| row.get(AMOUNT_COLUMN))
            .filter_map(|cell| Decimal::from_str(cell).ok())
            .sum()
    }
}
