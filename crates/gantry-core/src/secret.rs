//! Deploy credential handling.
//!
//! The token is injected into the deploy job's child environment at spawn
//! time and nowhere else: never argv, never events, never serialized.

use secrecy::{ExposeSecret, SecretString};

/// The deploy credential, redacted in all output.
#[derive(Clone)]
pub struct DeployToken {
    inner: SecretString,
}

impl DeployToken {
    /// Wrap a token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: SecretString::from(value.into()),
        }
    }

    /// Read the token from an environment variable, if set.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var).ok().map(Self::new)
    }

    /// Expose the token for injection into a child environment.
    ///
    /// The returned reference must not be logged or stored.
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }
}

impl std::fmt::Debug for DeployToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeployToken([REDACTED])")
    }
}

impl std::fmt::Display for DeployToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_redacted() {
        let token = DeployToken::new("fly-tok-12345");
        assert!(!format!("{:?}", token).contains("fly-tok-12345"));
        assert!(!format!("{}", token).contains("fly-tok-12345"));
        assert!(format!("{:?}", token).contains("REDACTED"));
    }

    #[test]
    fn test_expose_returns_the_value() {
        let token = DeployToken::new("fly-tok-12345");
        assert_eq!(token.expose(), "fly-tok-12345");
    }

    #[test]
    fn test_from_env_missing_var_is_none() {
        assert!(DeployToken::from_env("GANTRY_DEFINITELY_UNSET_VAR").is_none());
    }
}
