use deptrack_store::StoreError;
use deptrack_types::TypeError;

/// Errors from the domain services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The dependency lookup's underlying query failed. Not used for
    /// zero results — an empty list is success.
    #[error("module not found")]
    ModuleNotFound,

    /// A stored item did not decode into its typed record.
    #[error(transparent)]
    Decode(#[from] TypeError),

    /// A pair carried an entity kind the operation did not expect.
    #[error("unexpected entity for item type {item_type}")]
    UnexpectedEntity { item_type: String },

    /// A graph store operation failed; fatal to the request, or to the
    /// stream when raised mid-traversal.
    #[error("graph store operation failed: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
