//! Risk Tier Thresholds & Recommendations
//!
//! Buckets the primary scalar output of every task into Low / Medium / High
//! and maps task + tier to the follow-up text shown to clinicians.

use serde::{Deserialize, Serialize};

use crate::constants::{HIGH_TIER_THRESHOLD, MEDIUM_TIER_THRESHOLD, NOSHOW_REMINDER_THRESHOLD};
use crate::logic::features::TaskKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Medium, RiskTier::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier boundaries (both strict: a score equal to a boundary falls below it)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub high: f64,
    pub medium: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            high: HIGH_TIER_THRESHOLD,
            medium: MEDIUM_TIER_THRESHOLD,
        }
    }
}

impl ThresholdConfig {
    pub fn tier(&self, score: f64) -> RiskTier {
        if score > self.high {
            RiskTier::High
        } else if score > self.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

/// Tier with the default thresholds
pub fn risk_tier(score: f64) -> RiskTier {
    ThresholdConfig::default().tier(score)
}

/// Follow-up text for a task's prediction.
///
/// `score` is the primary scalar (top-class probability, risk score, or
/// no-show probability). No-show keys off the reminder threshold, not the tier.
pub fn recommendation(task: TaskKind, tier: RiskTier, score: f64) -> &'static str {
    match task {
        TaskKind::Disease => match tier {
            RiskTier::High => "Confirm diagnosis with laboratory tests",
            RiskTier::Medium => "Consider differential diagnosis",
            RiskTier::Low => "Insufficient confidence; clinical assessment required",
        },
        TaskKind::Risk => match tier {
            RiskTier::High => "Immediate medical attention required",
            RiskTier::Medium => "Regular monitoring recommended",
            RiskTier::Low => "Continue routine checkups",
        },
        TaskKind::NoShow => {
            if score > NOSHOW_REMINDER_THRESHOLD {
                "Send reminder SMS"
            } else {
                "No action needed"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(risk_tier(0.71), RiskTier::High);
        assert_eq!(risk_tier(0.55), RiskTier::Medium);
        assert_eq!(risk_tier(0.39), RiskTier::Low);
        // Boundaries are exclusive
        assert_eq!(risk_tier(0.7), RiskTier::Medium);
        assert_eq!(risk_tier(0.4), RiskTier::Low);
    }

    #[test]
    fn test_risk_recommendations() {
        assert_eq!(
            recommendation(TaskKind::Risk, risk_tier(0.9), 0.9),
            "Immediate medical attention required"
        );
        assert_eq!(
            recommendation(TaskKind::Risk, risk_tier(0.5), 0.5),
            "Regular monitoring recommended"
        );
        assert_eq!(
            recommendation(TaskKind::Risk, risk_tier(0.1), 0.1),
            "Continue routine checkups"
        );
    }

    #[test]
    fn test_noshow_uses_reminder_threshold() {
        // 0.55 is Medium but still above the reminder threshold
        assert_eq!(recommendation(TaskKind::NoShow, RiskTier::Medium, 0.55), "Send reminder SMS");
        assert_eq!(recommendation(TaskKind::NoShow, RiskTier::Medium, 0.45), "No action needed");
        assert_eq!(recommendation(TaskKind::NoShow, RiskTier::Low, 0.5), "No action needed");
    }

    #[test]
    fn test_disease_low_confidence() {
        assert_eq!(
            recommendation(TaskKind::Disease, RiskTier::Low, 0.3),
            "Insufficient confidence; clinical assessment required"
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let config = ThresholdConfig { high: 0.9, medium: 0.5 };
        assert_eq!(config.tier(0.8), RiskTier::Medium);
        assert_eq!(config.tier(0.95), RiskTier::High);
    }
}
