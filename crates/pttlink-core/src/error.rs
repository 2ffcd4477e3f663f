// ── Core error types ──
//
// Host-facing errors from pttlink-core. Only argument validation is ever
// returned from a command method; platform failures are translated here
// so they can be logged in domain terms and then absorbed.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Controller errors ────────────────────────────────────────────
    #[error("Controller unavailable: {package}")]
    ControllerUnavailable { package: String },

    #[error("Controller refused binding to {service} in {package}")]
    BindingRefused { package: String, service: String },

    // ── Argument errors ──────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Platform errors (wrapped, not exposed raw) ───────────────────
    #[error("Roster query failed: {message}")]
    Query { message: String },

    #[error("Delivery failed: {message}")]
    Delivery { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

// ── Conversion from platform errors ─────────────────────────────────

impl From<pttlink_api::Error> for CoreError {
    fn from(err: pttlink_api::Error) -> Self {
        match err {
            pttlink_api::Error::PackageNotFound(package) => {
                CoreError::ControllerUnavailable { package }
            }
            pttlink_api::Error::BindRefused { package, service } => {
                CoreError::BindingRefused { package, service }
            }
            e @ (pttlink_api::Error::Query { .. }
            | pttlink_api::Error::RowOutOfRange { .. }
            | pttlink_api::Error::ColumnOutOfRange(_)
            | pttlink_api::Error::ColumnType { .. }) => CoreError::Query {
                message: e.to_string(),
            },
            e @ (pttlink_api::Error::Broadcast(_) | pttlink_api::Error::Launch { .. }) => {
                CoreError::Delivery {
                    message: e.to_string(),
                }
            }
            pttlink_api::Error::Encoding(e) => CoreError::Internal(format!("Encoding error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_errors_map_to_domain_variants() {
        let err = CoreError::from(pttlink_api::Error::PackageNotFound("net.loudtalks".into()));
        assert!(matches!(err, CoreError::ControllerUnavailable { package } if package == "net.loudtalks"));

        let err = CoreError::from(pttlink_api::Error::ColumnOutOfRange(9));
        assert!(matches!(err, CoreError::Query { .. }));

        let err = CoreError::from(pttlink_api::Error::Broadcast("bus closed".into()));
        assert_eq!(err.to_string(), "Delivery failed: Broadcast delivery failed: bus closed");
    }
}
