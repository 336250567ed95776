//! Error types for the expense pipeline.
//!
//! The core taxonomy is typed so the dispatcher can tell a bad line from a
//! failed write; everything at the application boundary is `anyhow` with
//! context strings.

use thiserror::Error;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// A line of chat text that could not be interpreted as an expense.
///
/// Carries the original line so the rejection can be echoed back verbatim.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unrecognized expense line: {0:?}")]
    MalformedLine(String),
}

/// A failure while persisting one ledger entry.
///
/// Lookup and create failures abort the entry before anything is written;
/// an append failure aborts after the partition is known to exist. A failed
/// running-sum read is deliberately absent here: it degrades to zero instead
/// of failing the write.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("partition lookup failed")]
    PartitionLookup(#[source] anyhow::Error),

    #[error("partition create failed")]
    PartitionCreate(#[source] anyhow::Error),

    #[error("row append failed")]
    Append(#[source] anyhow::Error),
}
