//! Navigation engine errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the navigation crates.
pub type Result<T> = anyhow::Result<T, Error>;

/// Domain level error type returned by the navigation components.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// A coordinate outside the valid latitude/longitude range was supplied.
    #[error("code: invalid_location, description: {0}")]
    InvalidLocation(String),

    /// Every route variant failed or the routing service returned no routes.
    #[error("code: no_route_found, description: {0}")]
    NoRouteFound(String),

    /// The requested route id is not among the last computed candidates.
    #[error("code: route_not_found, description: {0}")]
    RouteNotFound(String),

    /// Guidance was started without a route.
    #[error("code: missing_route")]
    MissingRoute,

    /// An upstream dependency failed or returned an unusable payload.
    #[error("code: bad_gateway, description: {0}")]
    BadGateway(String),

    /// A non recoverable internal error occurred.
    #[error("code: server_error, description: {0}")]
    ServerError(String),
}

impl Error {
    /// Returns the stable error code associated with the variant.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::InvalidLocation(_) => "invalid_location",
            Self::NoRouteFound(_) => "no_route_found",
            Self::RouteNotFound(_) => "route_not_found",
            Self::MissingRoute => "missing_route",
            Self::BadGateway(_) => "bad_gateway",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the error description.
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        let chain = err.chain().map(ToString::to_string).collect::<Vec<_>>().join(" -> ");

        // if type is Error, return it with the newly added context
        if let Some(inner) = err.downcast_ref::<Self>() {
            tracing::debug!("Error: {err}, caused by: {inner}");

            return match inner {
                Self::InvalidLocation(_) => Self::InvalidLocation(chain),
                Self::NoRouteFound(_) => Self::NoRouteFound(chain),
                Self::RouteNotFound(_) => Self::RouteNotFound(chain),
                Self::BadGateway(_) => Self::BadGateway(chain),
                Self::ServerError(e) => Self::ServerError(format!("{err}: {e}")),
                Self::MissingRoute => Self::MissingRoute,
            };
        }

        // otherwise, return a ServerError
        Self::ServerError(chain)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::BadGateway(err.to_string())
    }
}

/// Construct an `Error::InvalidLocation` from a format string.
#[macro_export]
macro_rules! invalid_location {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::InvalidLocation(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::InvalidLocation(format!($err))
    };
}

/// Construct an `Error::NoRouteFound` from a format string.
#[macro_export]
macro_rules! no_route_found {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::NoRouteFound(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::NoRouteFound(format!($err))
    };
}

#[cfg(test)]
mod tests {
    use anyhow::{Context, Result, anyhow};
    use serde_json::Value;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Registry, fmt};

    use super::Error;

    #[test]
    fn error_display() {
        let err = Error::InvalidLocation("latitude 95 out of range".to_string());
        assert_eq!(
            format!("{err}"),
            "code: invalid_location, description: latitude 95 out of range"
        );
        assert_eq!(err.code(), "invalid_location");
    }

    #[test]
    fn with_context() {
        let _ = Registry::default().with(EnvFilter::new("debug")).with(fmt::layer()).try_init();

        let context_error = || -> Result<(), Error> {
            Err(Error::NoRouteFound("all variants failed".to_string()))
                .context("computing route")
                .context("setting destination")?;
            Ok(())
        };

        let result = context_error();
        assert_eq!(
            result.unwrap_err(),
            Error::NoRouteFound(
                "setting destination -> computing route -> code: no_route_found, \
                 description: all variants failed"
                    .to_string()
            )
        );
    }

    #[test]
    fn unit_variant_survives_context() {
        let result = Err::<(), Error>(Error::MissingRoute).context("starting guidance");
        let err: Error = result.unwrap_err().into();
        assert_eq!(err, Error::MissingRoute);
    }

    #[test]
    fn anyhow_context() {
        let result = Err::<(), anyhow::Error>(anyhow!("one-off error")).context("error context");
        let err: Error = result.unwrap_err().into();

        assert_eq!(
            err.to_string(),
            "code: server_error, description: error context -> one-off error"
        );
    }

    #[test]
    fn serde_error() {
        let err: Error = serde_json::from_str::<Value>(r#"{"routes": ["#).unwrap_err().into();
        assert_eq!(err.code(), "bad_gateway");
    }
}
