//! Label-driven task durations.

use serde::{Deserialize, Serialize};

use super::Task;

/// Used only when the tier table is empty.
pub const FALLBACK_MINUTES: i64 = 15;

/// One row of the duration table: a label and the minutes it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationTier {
    pub label: String,
    pub minutes: i64,
}

impl DurationTier {
    pub fn new(label: impl Into<String>, minutes: i64) -> Self {
        Self {
            label: label.into(),
            minutes,
        }
    }
}

/// Default table: xs:10, s:20, m:30, l:60, xl:120.
pub fn default_tiers() -> Vec<DurationTier> {
    vec![
        DurationTier::new("xs", 10),
        DurationTier::new("s", 20),
        DurationTier::new("m", 30),
        DurationTier::new("l", 60),
        DurationTier::new("xl", 120),
    ]
}

/// Maps a task's labels to a duration in minutes.
///
/// Tiers are scanned in declaration order and the first tier whose label the
/// task carries wins, regardless of the order of the task's own labels.
/// Tasks matching no tier get the smallest tier's duration.
#[derive(Debug, Clone)]
pub struct DurationResolver {
    tiers: Vec<DurationTier>,
    default_minutes: i64,
}

impl DurationResolver {
    pub fn new(tiers: Vec<DurationTier>) -> Self {
        let default_minutes = tiers
            .iter()
            .map(|t| t.minutes)
            .min()
            .unwrap_or(FALLBACK_MINUTES);
        Self {
            tiers,
            default_minutes,
        }
    }

    pub fn resolve(&self, task: &Task) -> i64 {
        self.tiers
            .iter()
            .find(|tier| task.has_label(&tier.label))
            .map(|tier| tier.minutes)
            .unwrap_or(self.default_minutes)
    }

    pub fn default_minutes(&self) -> i64 {
        self.default_minutes
    }
}

impl Default for DurationResolver {
    fn default() -> Self {
        Self::new(default_tiers())
    }
}
