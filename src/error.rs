//! Service error taxonomy / 服务错误类型

use thiserror::Error;

/// Typed failure returned by every public operation / 对外操作的错误
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("indexing is already running")]
    AlreadyRunning,

    #[error("indexing is not running")]
    NotRunning,

    #[error("page address is not specified")]
    NoAddress,

    #[error("page address is malformed")]
    MalformedAddress,

    #[error("page is outside the sites listed in the configuration file")]
    OutsideConfiguredSites,

    #[error("site indexing is already running")]
    AlreadyIndexing,

    #[error("search query is empty")]
    EmptyQuery,

    #[error("no pages found")]
    NoResults,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl ServiceError {
    /// Stable machine-readable code / 稳定的错误码
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::AlreadyRunning => "already_running",
            ServiceError::NotRunning => "not_running",
            ServiceError::NoAddress => "no_address",
            ServiceError::MalformedAddress => "malformed_address",
            ServiceError::OutsideConfiguredSites => "outside_configured_sites",
            ServiceError::AlreadyIndexing => "already_indexing",
            ServiceError::EmptyQuery => "empty_query",
            ServiceError::NoResults => "no_results",
            ServiceError::Storage(_) => "storage",
        }
    }

    /// User/validation errors, as opposed to infrastructure failures / 是否为用户错误
    pub fn is_user_error(&self) -> bool {
        !matches!(self, ServiceError::Storage(_))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ServiceError::AlreadyRunning.code(), "already_running");
        assert_eq!(ServiceError::OutsideConfiguredSites.code(), "outside_configured_sites");
        assert_eq!(ServiceError::NoResults.code(), "no_results");
        assert_eq!(ServiceError::Storage(sqlx::Error::RowNotFound).code(), "storage");
    }

    #[test]
    fn test_user_error_classification() {
        assert!(ServiceError::EmptyQuery.is_user_error());
        assert!(!ServiceError::Storage(sqlx::Error::PoolClosed).is_user_error());
    }
}
