use poem::http::StatusCode;

use crate::domain::errors::{DomainError, StateError};

/// Picks the status code from the domain error carried by `err`, if any.
pub fn map_error(err: anyhow::Error) -> poem::Error {
    let status = if let Some(domain) = err.downcast_ref::<DomainError>() {
        match domain {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::AlreadyExists(_) => StatusCode::CONFLICT,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    } else if err.downcast_ref::<StateError>().is_some() {
        StatusCode::CONFLICT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "request failed");
    }
    poem::Error::from_string(err.to_string(), status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_status() {
        let cases = [
            (DomainError::NotFound("x".into()).into(), StatusCode::NOT_FOUND),
            (DomainError::AlreadyExists("x".into()).into(), StatusCode::CONFLICT),
            (DomainError::Validation("x".into()).into(), StatusCode::BAD_REQUEST),
            (StateError::NotLaunched.into(), StatusCode::CONFLICT),
            (StateError::RunInProgress.into(), StatusCode::CONFLICT),
            (anyhow::anyhow!("db down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(map_error(err).status(), expected);
        }
    }
}
