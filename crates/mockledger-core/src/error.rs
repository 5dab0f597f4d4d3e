use thiserror::Error;

/// Core error type shared across mockledger crates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// An attribute type name outside the closed catalog.
    #[error("unknown attribute type '{0}'")]
    UnknownAttributeType(String),
    /// An entity kind name outside the closed catalog.
    #[error("unknown entity kind '{0}'")]
    UnknownEntityKind(String),
    /// An item mode name that is not system_only, line_only or both.
    #[error("unknown item mode '{0}'")]
    UnknownItemMode(String),
}

/// Convenience alias for results returned by mockledger crates.
pub type Result<T> = std::result::Result<T, Error>;
