//! Ratings attached to task outputs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::task::Task;

/// Minimum five-star value considered high quality.
pub const HIGH_QUALITY_STARS: f64 = 4.0;

/// Scale a rating value is expressed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingType {
    #[default]
    FiveStar,
    PassFail,
    PassFailCritical,
    Custom,
}

impl fmt::Display for RatingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RatingType::FiveStar => "five_star",
            RatingType::PassFail => "pass_fail",
            RatingType::PassFailCritical => "pass_fail_critical",
            RatingType::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

impl RatingType {
    /// Checks that `value` lies in this scale's domain.
    pub fn check_value(&self, value: f64, context: &str) -> Result<(), ValidationError> {
        let valid = match self {
            RatingType::FiveStar => value.fract() == 0.0 && (1.0..=5.0).contains(&value),
            RatingType::PassFail => value == 0.0 || value == 1.0,
            RatingType::PassFailCritical => value == -1.0 || value == 0.0 || value == 1.0,
            RatingType::Custom => true,
        };
        if valid {
            Ok(())
        } else {
            Err(ValidationError::invariant(format!(
                "{} value {} is out of range for {} rating",
                context, value, self
            )))
        }
    }

    /// Whether `value` counts as a high-quality rating on this scale.
    pub fn is_high_quality(&self, value: f64) -> bool {
        match self {
            RatingType::FiveStar => value >= HIGH_QUALITY_STARS,
            RatingType::PassFail | RatingType::PassFailCritical => value == 1.0,
            RatingType::Custom => false,
        }
    }
}

/// A rating of a task output, overall and per requirement.
///
/// Requirement scores are keyed by requirement id; every key must name a
/// requirement of the owning task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskOutputRating {
    #[serde(rename = "type", default)]
    pub rating_type: RatingType,
    pub value: Option<f64>,
    #[serde(default)]
    pub requirement_ratings: BTreeMap<String, f64>,
}

impl TaskOutputRating {
    pub fn new(rating_type: RatingType, value: f64) -> Self {
        Self {
            rating_type,
            value: Some(value),
            requirement_ratings: BTreeMap::new(),
        }
    }

    pub fn five_star(stars: f64) -> Self {
        Self::new(RatingType::FiveStar, stars)
    }

    pub fn pass_fail(passed: bool) -> Self {
        Self::new(RatingType::PassFail, if passed { 1.0 } else { 0.0 })
    }

    pub fn with_requirement_rating(mut self, requirement_id: impl Into<String>, score: f64) -> Self {
        self.requirement_ratings.insert(requirement_id.into(), score);
        self
    }

    pub fn is_high_quality(&self) -> bool {
        self.value
            .map(|v| self.rating_type.is_high_quality(v))
            .unwrap_or(false)
    }

    /// Validates the rating against the requirements of `task`.
    pub fn validate(&self, task: &Task) -> Result<(), ValidationError> {
        if let Some(value) = self.value {
            self.rating_type.check_value(value, "Overall rating")?;
        }

        for (requirement_id, score) in &self.requirement_ratings {
            let requirement = task.requirement(requirement_id).ok_or_else(|| {
                ValidationError::invariant(format!(
                    "Requirement ID '{}' is not a valid requirement ID for this task",
                    requirement_id
                ))
            })?;
            requirement
                .rating_type
                .check_value(*score, &format!("Requirement '{}'", requirement.name))?;
        }

        Ok(())
    }
}
