use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Outcome of classifying a foreground window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Productive,
    Distracting,
}

impl Classification {
    /// Label used on the wire by the prediction service
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::Productive => "productive",
            Self::Distracting => "distracting",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Label that is neither `productive` nor `distracting`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown classification label '{0}'")]
pub struct UnknownLabel(pub String);

impl FromStr for Classification {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "productive" => Ok(Self::Productive),
            "distracting" => Ok(Self::Distracting),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}
