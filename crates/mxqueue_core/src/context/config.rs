//! Collect context configuration.
//!
//! # Responsibility
//! - Describe session, proposal and beamline settings loaded at start-up.
//! - Validate values before they reach the context.
//!
//! # Invariants
//! - `precision` is within `1..=MAX_PRECISION`.
//! - Suffixes are plain file extensions (no path separators).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Suffix used for image files when nothing else is configured.
pub const DEFAULT_SUFFIX: &str = "img";
/// Zero-padding width of image indices in file names.
pub const DEFAULT_PRECISION: usize = 4;
pub const MAX_PRECISION: usize = 9;

static SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid suffix regex"));

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration text is not valid JSON for `ContextConfig`.
    Parse(serde_json::Error),
    /// Index padding width outside the supported range.
    InvalidPrecision(usize),
    /// Suffix is empty or contains characters not allowed in an extension.
    InvalidSuffix(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid context configuration: {err}"),
            Self::InvalidPrecision(value) => write!(
                f,
                "precision must be between 1 and {MAX_PRECISION}, got {value}"
            ),
            Self::InvalidSuffix(value) => write!(f, "invalid file suffix: `{value}`"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::InvalidPrecision(_) => None,
            Self::InvalidSuffix(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// One proposal treated as in-house staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InHouseProposal {
    pub code: String,
    pub number: String,
}

/// Optional hardware features of the beamline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamlineCapabilities {
    pub has_shutterless: bool,
    pub tunable_wavelength: bool,
}

/// Start-up settings for a `CollectContext`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub session_id: Option<i64>,
    pub proposal_code: Option<String>,
    pub proposal_number: Option<String>,
    pub proposal_id: Option<i64>,
    pub in_house: Vec<InHouseProposal>,
    pub exp_hutch: String,
    pub default_suffix: String,
    pub precision: usize,
    /// Session-wide suffix override.
    pub suffix: Option<String>,
    pub beamline: BeamlineCapabilities,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            session_id: None,
            proposal_code: None,
            proposal_number: None,
            proposal_id: None,
            in_house: Vec::new(),
            exp_hutch: String::new(),
            default_suffix: DEFAULT_SUFFIX.to_string(),
            precision: DEFAULT_PRECISION,
            suffix: None,
            beamline: BeamlineCapabilities::default(),
        }
    }
}

impl ContextConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.precision == 0 || self.precision > MAX_PRECISION {
            return Err(ConfigError::InvalidPrecision(self.precision));
        }
        validate_suffix(&self.default_suffix)?;
        if let Some(suffix) = &self.suffix {
            validate_suffix(suffix)?;
        }
        Ok(())
    }
}

/// Checks that `value` can be used as a file extension.
pub fn validate_suffix(value: &str) -> Result<(), ConfigError> {
    if SUFFIX_RE.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidSuffix(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ContextConfig, DEFAULT_PRECISION, DEFAULT_SUFFIX};

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = ContextConfig::from_json_str(r#"{"exp_hutch": "id30a1"}"#).unwrap();
        assert_eq!(config.exp_hutch, "id30a1");
        assert_eq!(config.default_suffix, DEFAULT_SUFFIX);
        assert_eq!(config.precision, DEFAULT_PRECISION);
        assert!(config.in_house.is_empty());
        assert!(!config.beamline.has_shutterless);
    }

    #[test]
    fn parses_in_house_list_and_capabilities() {
        let config = ContextConfig::from_json_str(
            r#"{
                "proposal_code": "mx",
                "proposal_number": "123",
                "in_house": [{"code": "mx", "number": "123"}],
                "beamline": {"has_shutterless": true}
            }"#,
        )
        .unwrap();
        assert_eq!(config.in_house.len(), 1);
        assert!(config.beamline.has_shutterless);
        assert!(!config.beamline.tunable_wavelength);
    }

    #[test]
    fn rejects_out_of_range_precision() {
        let err = ContextConfig::from_json_str(r#"{"precision": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrecision(0)));
    }

    #[test]
    fn rejects_suffix_with_path_separator() {
        let err = ContextConfig::from_json_str(r#"{"suffix": "../img"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSuffix(value) if value == "../img"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = ContextConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
