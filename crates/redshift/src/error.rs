use dbcli_core::BackendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedshiftError {
    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("Cannot extract cluster identifier from host")]
    MissingClusterIdentifier,

    #[error("Failed to get IAM credentials: {0}")]
    Iam(String),
}

impl From<RedshiftError> for BackendError {
    fn from(err: RedshiftError) -> Self {
        match err {
            RedshiftError::Database(sqlx::Error::Database(db)) => {
                BackendError::Query(db.message().to_string())
            }
            RedshiftError::Database(other) => BackendError::Connection(other.to_string()),
            RedshiftError::MissingClusterIdentifier | RedshiftError::Iam(_) => {
                BackendError::Credentials(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iam_errors_are_credential_errors() {
        let err: BackendError = RedshiftError::MissingClusterIdentifier.into();
        assert!(matches!(err, BackendError::Credentials(_)));
        assert_eq!(
            err.to_string(),
            "Credential error: Cannot extract cluster identifier from host"
        );
    }

    #[test]
    fn pool_errors_are_connection_errors() {
        let err: BackendError = RedshiftError::Database(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, BackendError::Connection(_)));
    }
}
