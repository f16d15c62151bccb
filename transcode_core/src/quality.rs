//! Fixed catalog of transcode quality tiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the server's transcode presets.
///
/// The discriminant is the `video_quality_number` sent on the wire, so a
/// request can only ever carry a catalog id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum QualityTier {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
}

impl QualityTier {
    /// The whole catalog, in id order
    pub const ALL: [QualityTier; 3] = [QualityTier::Low, QualityTier::Medium, QualityTier::High];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Low => "Low",
            QualityTier::Medium => "Medium",
            QualityTier::High => "High",
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.id() == id)
    }
}

impl From<QualityTier> for u8 {
    fn from(q: QualityTier) -> Self {
        q.id()
    }
}

impl TryFrom<u8> for QualityTier {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        QualityTier::from_id(id).ok_or_else(|| format!("unknown quality id {}", id))
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
