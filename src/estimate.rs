//! Stitching time estimates.
//!
//! Hours scale with stitch count and slow down with every extra floss color
//! (1% each) and every confetti level above 1 (15% each).

use crate::error::ValidationError;
use crate::grid::{color_groups, Grid};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SkillLevel {
    Beginner = 1,
    Novice = 2,
    Intermediate = 3,
    Advanced = 4,
    Expert = 5,
}

impl SkillLevel {
    pub const ALL: [SkillLevel; 5] = [
        SkillLevel::Beginner,
        SkillLevel::Novice,
        SkillLevel::Intermediate,
        SkillLevel::Advanced,
        SkillLevel::Expert,
    ];

    /// Stitches per hour before penalties.
    pub fn base_rate(self) -> f64 {
        match self {
            SkillLevel::Beginner => 150.0,
            SkillLevel::Novice => 180.0,
            SkillLevel::Intermediate => 210.0,
            SkillLevel::Advanced => 240.0,
            SkillLevel::Expert => 270.0,
        }
    }
}

impl TryFrom<u8> for SkillLevel {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(SkillLevel::Beginner),
            2 => Ok(SkillLevel::Novice),
            3 => Ok(SkillLevel::Intermediate),
            4 => Ok(SkillLevel::Advanced),
            5 => Ok(SkillLevel::Expert),
            other => Err(format!("Skill level must be between 1 and 5, got {other}")),
        }
    }
}

impl From<SkillLevel> for u8 {
    fn from(level: SkillLevel) -> Self {
        level as u8
    }
}

pub const MIN_CONFETTI_LEVEL: u32 = 1;
pub const MAX_CONFETTI_LEVEL: u32 = 10;

/// Hours to finish, rounded to one decimal place.
pub fn estimate_hours(
    total_stitches: usize,
    floss_colors: usize,
    confetti_level: u32,
    skill: SkillLevel,
) -> Result<f64, ValidationError> {
    if !(MIN_CONFETTI_LEVEL..=MAX_CONFETTI_LEVEL).contains(&confetti_level) {
        return Err(ValidationError::ConfettiOutOfRange(confetti_level));
    }

    let color_penalty = if floss_colors > 1 {
        1.0 + (floss_colors - 1) as f64 * 0.01
    } else {
        1.0
    };
    let confetti_penalty = if confetti_level > 1 {
        1.0 + (confetti_level - 1) as f64 * 0.15
    } else {
        1.0
    };

    let adjusted_rate = skill.base_rate() / (color_penalty * confetti_penalty);
    let hours = total_stitches as f64 / adjusted_rate;
    Ok((hours * 10.0).round() / 10.0)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkillEstimate {
    pub skill_level: SkillLevel,
    pub hours: f64,
}

/// One estimate per skill level, beginner first.
pub fn estimate_range(
    total_stitches: usize,
    floss_colors: usize,
    confetti_level: u32,
) -> Result<Vec<SkillEstimate>, ValidationError> {
    SkillLevel::ALL
        .iter()
        .map(|skill| -> Result<SkillEstimate, ValidationError> {
            Ok(SkillEstimate {
                skill_level: *skill,
                hours: estimate_hours(total_stitches, floss_colors, confetti_level, *skill)?,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatternEstimate {
    pub total_stitches: usize,
    pub floss_colors: usize,
    pub confetti_level: u32,
    pub estimates: Vec<SkillEstimate>,
}

pub fn estimate_pattern(grid: &Grid, confetti_level: u32) -> Result<PatternEstimate, ValidationError> {
    let total_stitches = grid.populated_count();
    let floss_colors = color_groups(grid).len();
    Ok(PatternEstimate {
        total_stitches,
        floss_colors,
        confetti_level,
        estimates: estimate_range(total_stitches, floss_colors, confetti_level)?,
    })
}
