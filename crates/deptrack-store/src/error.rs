use deptrack_types::TypeError;

/// Errors from graph store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A write was attempted on a store opened without a write pool.
    #[error("store is read-only: no write handle bound")]
    Unsupported,

    /// One or more items in a `put` batch failed after every item was
    /// attempted. Individual failures are logged; the batch is retryable
    /// as a whole because per-item writes are idempotent.
    #[error("partial insertion: {failed} of {total} items failed")]
    PartialInsertion { failed: usize, total: usize },

    /// One or more items in a `delete` batch failed after every item was
    /// attempted.
    #[error("partial deletion: {failed} of {total} items failed")]
    PartialDeletion { failed: usize, total: usize },

    /// A stored row could not be mapped back into a graph item.
    #[error("corrupt row: {0}")]
    CorruptRow(#[from] TypeError),

    /// Error from the underlying relational engine.
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    /// Error opening the store's pools.
    #[error(transparent)]
    Connection(#[from] crate::connection::ConnectionError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
