//! Build matrix axis: toolchain channels.

use serde::{Deserialize, Serialize};

/// A toolchain channel the matrix builds against.
///
/// A tagged value, not a capability: the variant only parameterizes
/// which toolchain the external installer selects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Toolchain {
    Stable,
    Beta,
}

impl Toolchain {
    /// Channel name as passed to the toolchain installer.
    pub fn name(&self) -> &'static str {
        match self {
            Toolchain::Stable => "stable",
            Toolchain::Beta => "beta",
        }
    }

    /// The default matrix axis: stable and beta.
    pub fn default_axis() -> Vec<Toolchain> {
        vec![Toolchain::Stable, Toolchain::Beta]
    }
}

impl std::fmt::Display for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Toolchain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Toolchain::Stable),
            "beta" => Ok(Toolchain::Beta),
            other => Err(format!("unknown toolchain channel: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toolchain_names() {
        assert_eq!(Toolchain::Stable.name(), "stable");
        assert_eq!(Toolchain::Beta.name(), "beta");
    }

    #[test]
    fn test_default_axis_has_both_channels() {
        let axis = Toolchain::default_axis();
        assert_eq!(axis, vec![Toolchain::Stable, Toolchain::Beta]);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("stable".parse::<Toolchain>().unwrap(), Toolchain::Stable);
        assert_eq!("beta".parse::<Toolchain>().unwrap(), Toolchain::Beta);
        assert!("nightly".parse::<Toolchain>().is_err());
    }
}
