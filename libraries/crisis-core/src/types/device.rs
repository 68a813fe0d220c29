/// Device capability classification
use serde::{Deserialize, Serialize};

/// Physical form factor of the host device
///
/// Only used once, at startup, to derive the [`DeviceClass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFactor {
    Phone,
    Tablet,
}

impl FormFactor {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Tablet => "tablet",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "phone" => Some(Self::Phone),
            "tablet" => Some(Self::Tablet),
            _ => None,
        }
    }
}

impl std::fmt::Display for FormFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Programmatic volume capability tier of the device
///
/// Determined once at startup and fixed for the lifetime of a run.
/// Tablets expose full bidirectional control over the output level;
/// phones only honor programmatic *reductions* and ignore increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// Bidirectional programmatic level control
    FullControl,

    /// Programmatic reductions only; increases are ignored by the platform
    ReduceOnly,
}

impl DeviceClass {
    /// Classify a device from its form factor
    #[must_use]
    pub fn classify(form_factor: FormFactor) -> Self {
        match form_factor {
            FormFactor::Tablet => Self::FullControl,
            FormFactor::Phone => Self::ReduceOnly,
        }
    }

    /// Whether the platform honors programmatic level increases
    #[must_use]
    pub fn allows_increase(&self) -> bool {
        matches!(self, Self::FullControl)
    }

    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullControl => "full_control",
            Self::ReduceOnly => "reduce_only",
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
