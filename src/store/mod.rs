//! The external tabular store: one named, append-only partition per calendar
//! month.

mod memory;
mod sheets;

pub use memory::MemoryStore;
pub use sheets::GoogleStore;

use crate::Result;

/// Column labels for the header row of every month partition, in column order.
pub const HEADER: [&str; 6] = [
    "Timestamp",
    "Sender",
    "Description",
    "Amount",
    "Category",
    "Running Sum",
];

/// Column count for newly created partitions.
pub const COLUMN_COUNT: i64 = 6;

/// Row capacity hint for newly created partitions.
pub const ROW_CAPACITY: i64 = 1000;

/// Result of a partition lookup. `NotFound` is a normal answer; a failed
/// lookup is an `Err` from [`Store::get_partition`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStatus {
    Found,
    NotFound,
}

/// Operations the ledger needs from the tabular store.
///
/// Implementations are not expected to be transactional: the ledger reads the
/// prior sum and appends as two separate calls.
#[async_trait::async_trait]
pub trait Store: Send {
    /// Looks up a partition by label. An `Err` means the lookup itself
    /// failed, which callers must not treat as "absent".
    async fn get_partition(&mut self, label: &str) -> Result<PartitionStatus>;

    /// Creates an empty partition with the given shape.
    async fn create_partition(
        &mut self,
        label: &str,
        column_count: i64,
        row_capacity: i64,
    ) -> Result<()>;

    /// Overwrites the given range. Used only to place the header row of a
    /// freshly created partition.
    async fn write_row(&mut self, label: &str, range: &str, row: Vec<String>) -> Result<()>;

    /// Appends one row after the last data row, never overwriting existing
    /// rows.
    async fn append_row(&mut self, label: &str, row: Vec<String>) -> Result<()>;

    /// Reads all rows of the given column range, header row included.
    async fn read_column_range(&mut self, label: &str, columns: &str) -> Result<Vec<Vec<String>>>;
}
