//! Network quality classification and the preload strategy derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Effective connection class, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NetworkClass {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

/// How much of the next track to fetch ahead of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadStrategy {
    /// Set the source only; fetch nothing until it plays
    SourceOnly,
    MetadataOnly,
    Full,
}

impl NetworkClass {
    /// Classify from an estimated downlink in Mbps.
    ///
    /// Thresholds mirror the effective-type buckets browsers use.
    pub fn from_downlink(mbps: f64) -> Self {
        if !mbps.is_finite() || mbps <= 0.0 {
            NetworkClass::Unknown
        } else if mbps < 0.05 {
            NetworkClass::Slow2g
        } else if mbps < 0.07 {
            NetworkClass::TwoG
        } else if mbps < 0.7 {
            NetworkClass::ThreeG
        } else {
            NetworkClass::FourG
        }
    }

    /// Very slow networks skip the payload entirely; medium ones fetch
    /// metadata; everything else buffers fully.
    pub fn preload_strategy(self) -> PreloadStrategy {
        match self {
            NetworkClass::Slow2g | NetworkClass::TwoG => PreloadStrategy::SourceOnly,
            NetworkClass::ThreeG => PreloadStrategy::MetadataOnly,
            NetworkClass::FourG | NetworkClass::Unknown => PreloadStrategy::Full,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkClass::Slow2g => "slow-2g",
            NetworkClass::TwoG => "2g",
            NetworkClass::ThreeG => "3g",
            NetworkClass::FourG => "4g",
            NetworkClass::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NetworkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow-2g" | "slow2g" => Ok(NetworkClass::Slow2g),
            "2g" => Ok(NetworkClass::TwoG),
            "3g" => Ok(NetworkClass::ThreeG),
            "4g" => Ok(NetworkClass::FourG),
            "unknown" | "" => Ok(NetworkClass::Unknown),
            other => Err(format!("unknown network class: {other}")),
        }
    }
}

/// Source of connection information (the platform's connection API).
pub trait NetworkProbe: Send {
    /// Effective type string such as "4g", if the platform reports one.
    fn effective_type(&self) -> Option<String>;

    /// Estimated downlink in Mbps.
    fn downlink_mbps(&self) -> Option<f64>;

    /// Effective type when reported, else classification by downlink.
    fn classify(&self) -> NetworkClass {
        self.effective_type()
            .and_then(|t| t.parse().ok())
            .filter(|c| *c != NetworkClass::Unknown)
            .or_else(|| self.downlink_mbps().map(NetworkClass::from_downlink))
            .unwrap_or_default()
    }
}

/// A fixed network reading.
#[derive(Debug, Clone, Default)]
pub struct StaticNetwork {
    pub effective_type: Option<String>,
    pub downlink_mbps: Option<f64>,
}

impl StaticNetwork {
    pub fn new(class: NetworkClass, downlink_mbps: Option<f64>) -> Self {
        Self {
            effective_type: (class != NetworkClass::Unknown).then(|| class.as_str().to_string()),
            downlink_mbps,
        }
    }
}

impl NetworkProbe for StaticNetwork {
    fn effective_type(&self) -> Option<String> {
        self.effective_type.clone()
    }

    fn downlink_mbps(&self) -> Option<f64> {
        self.downlink_mbps
    }
}
