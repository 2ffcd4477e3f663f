use thiserror::Error;

/// Top-level error type for the `pttlink-api` crate.
///
/// Covers every failure a host platform can report back to the client:
/// service binding, content queries, outbound delivery and message encoding.
/// `pttlink-core` never surfaces these to callers of command methods; it
/// logs them and degrades to defaults.
#[derive(Debug, Error)]
pub enum Error {
    // ── Packages ────────────────────────────────────────────────────
    /// The named package is not installed on the host.
    #[error("Package not installed: {0}")]
    PackageNotFound(String),

    // ── Service binding ─────────────────────────────────────────────
    /// The controller refused (or could not complete) a service binding.
    #[error("Binding to {service} in {package} was refused")]
    BindRefused { package: String, service: String },

    // ── Content queries ─────────────────────────────────────────────
    /// The content source at `address` could not be queried.
    #[error("Query failed for {address}: {message}")]
    Query { address: String, message: String },

    /// Row index outside the cursor's result set.
    #[error("Row {row} out of range (count {count})")]
    RowOutOfRange { row: usize, count: usize },

    /// Column index outside the cursor's projection.
    #[error("Column {0} out of range")]
    ColumnOutOfRange(usize),

    /// The cell holds a value of a different kind than requested.
    #[error("Column {column} does not hold {expected}")]
    ColumnType {
        column: usize,
        expected: &'static str,
    },

    // ── Outbound delivery ───────────────────────────────────────────
    /// A broadcast could not be delivered to the bus.
    #[error("Broadcast delivery failed: {0}")]
    Broadcast(String),

    /// A launch request was rejected (no such component, etc.)
    #[error("Launch failed for {package}: {message}")]
    Launch { package: String, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON encoding or decoding of a bus message failed.
    #[error("Message encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if this error came from a content query or cursor read.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::Query { .. }
                | Self::RowOutOfRange { .. }
                | Self::ColumnOutOfRange(_)
                | Self::ColumnType { .. }
        )
    }

    /// Returns `true` if the controller side is missing or refused us.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::PackageNotFound(_) | Self::BindRefused { .. })
    }
}
