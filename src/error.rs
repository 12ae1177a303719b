//! Error taxonomy for a diagnosis run.
//!
//! Every store round trip error terminates the run; nothing is retried.

use std::io;

use thiserror::Error;

use crate::proto::ParseError;

/// Error returned by the diagnosis engine and its collaborators.
#[derive(Debug, Error)]
pub enum DoctorError {
    /// Store unreachable, connection dropped or authentication refused.
    #[error("connection error: {0}")]
    Connection(String),
    /// The store answered a command with an error reply.
    #[error("command error: {0}")]
    Command(String),
    /// A store reply could not be decoded.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// Cardinality requested for a type the engine does not know.
    #[error("unsupported redis data type: {0}")]
    UnsupportedType(String),
    /// Symptom selector outside of `bigkey`, `hotkey`, `slowlog`.
    #[error("unknown symptom: {0}")]
    UnknownSymptom(String),
    /// Diagnosis options rejected before touching the store.
    #[error("invalid option: {0}")]
    InvalidOption(String),
    /// Reply shape does not line up with the request (count or kind).
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("diagnosis cancelled")]
    Cancelled,
    #[error("diagnosis deadline exceeded")]
    DeadlineExceeded,
    /// Writing to the output stream failed.
    #[error("output error: {0}")]
    Output(#[from] io::Error),
}

impl From<redis::RedisError> for DoctorError {
    fn from(err: redis::RedisError) -> Self {
        let lost = err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
            || err.kind() == redis::ErrorKind::AuthenticationFailed;
        if lost {
            DoctorError::Connection(err.to_string())
        } else {
            DoctorError::Command(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_error_classification() {
        let auth: DoctorError =
            redis::RedisError::from((redis::ErrorKind::AuthenticationFailed, "WRONGPASS")).into();
        assert!(matches!(auth, DoctorError::Connection(_)));

        let reply: DoctorError =
            redis::RedisError::from((redis::ErrorKind::ResponseError, "ERR unknown command"))
                .into();
        assert!(matches!(reply, DoctorError::Command(_)));

        let io_err: DoctorError =
            redis::RedisError::from(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
                .into();
        assert!(matches!(io_err, DoctorError::Connection(_)));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DoctorError::UnsupportedType("stream".to_string()).to_string(),
            "unsupported redis data type: stream"
        );
        assert_eq!(
            DoctorError::UnknownSymptom("fever".to_string()).to_string(),
            "unknown symptom: fever"
        );
    }
}
