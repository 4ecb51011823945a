use std::fmt;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// The four upstream extracts. Nearly every conditional in the pipeline is
/// keyed on this discriminator, so it is a closed enum rather than free
/// text: a row can only belong to one of these, and every match over it is
/// exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "Motor_KPI")]
    MotorKpi,
    #[serde(rename = "CAM_Run_Tracker")]
    CamRunTracker,
    #[serde(rename = "POG_CAM_Usage")]
    PogCamUsage,
    #[serde(rename = "POG_MM_Usage")]
    PogMmUsage,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::MotorKpi,
        SourceKind::CamRunTracker,
        SourceKind::PogCamUsage,
        SourceKind::PogMmUsage,
    ];

    /// The identifier written into the `SOURCE` column and used as the row
    /// key of the mapping specification.
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::MotorKpi => "Motor_KPI",
            SourceKind::CamRunTracker => "CAM_Run_Tracker",
            SourceKind::PogCamUsage => "POG_CAM_Usage",
            SourceKind::PogMmUsage => "POG_MM_Usage",
        }
    }

    /// Case-insensitive parse of a source identifier.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.id().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| anyhow!("Unknown source identifier '{trimmed}'"))
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
