use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Signal category. Selects which upstream model handles a capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    #[default]
    Audio,
    Eeg,
    Ligo,
    Grace,
}

impl Domain {
    pub const ALL: [Domain; 4] = [Domain::Audio, Domain::Eeg, Domain::Ligo, Domain::Grace];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Audio => "audio",
            Domain::Eeg => "eeg",
            Domain::Ligo => "ligo",
            Domain::Grace => "grace",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown domain: {0} (expected audio|eeg|ligo|grace)")]
pub struct UnknownDomain(pub String);

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "audio" => Ok(Domain::Audio),
            "eeg" => Ok(Domain::Eeg),
            "ligo" => Ok(Domain::Ligo),
            "grace" => Ok(Domain::Grace),
            _ => Err(UnknownDomain(s.to_string())),
        }
    }
}

/// One file's prediction outcome as returned by the prediction backend.
///
/// The collapse-time estimate may arrive under several field names depending
/// on which model path produced it; `pick_ct` defines the precedence.
/// Rows the backend could not analyze carry `error: true` and, usually, an
/// `error_message`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ct_pred: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kitab_ct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ct_proxy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lam: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ResultRow {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_parses_case_insensitively() {
        assert_eq!("LIGO".parse::<Domain>().unwrap(), Domain::Ligo);
        assert_eq!("audio".parse::<Domain>().unwrap(), Domain::Audio);
        assert!("seismic".parse::<Domain>().is_err());
    }

    #[test]
    fn domain_serializes_lowercase() {
        assert_eq!(Domain::Grace.to_string(), "grace");
        assert_eq!(Domain::Eeg.as_str(), "eeg");
    }
}
