use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A bounded multi-day session in which a user logs meals and symptoms.
/// At most one period per user may be incomplete at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingPeriod {
    pub id: i64,
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewTrackingPeriod {
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// One logged meal, identified by its day within the period and its slot.
/// The tuple (user, period, day, slot) is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealEntry {
    pub id: i64,
    pub user_id: i64,
    pub tracking_period_id: i64,
    pub tracking_day: i64,
    pub meal_slot: String,
    pub meal_time: String,
    pub meal_duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub portion_size: String,
    pub is_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewMealEntry {
    pub user_id: i64,
    pub tracking_period_id: i64,
    pub tracking_day: i64,
    pub meal_slot: String,
    pub meal_time: String,
    pub meal_duration: String,
    pub notes: Option<String>,
    pub portion_size: String,
}

/// A shared catalog food, owned by no user. Names are unique catalog-wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewFoodItem {
    pub name: String,
    pub category: String,
}

/// A join row linking a meal entry to a catalog food. Not deduplicated:
/// logging the same food twice for one meal creates two rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealFood {
    pub id: i64,
    pub meal_entry_id: i64,
    pub food_item_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A free-text food scoped to a single meal entry, for foods outside the
/// catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFood {
    pub id: i64,
    pub meal_entry_id: i64,
    pub name: String,
    pub portion: String,
    pub preparation: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewCustomFood {
    pub meal_entry_id: i64,
    pub name: String,
    pub portion: String,
    pub preparation: String,
}

/// A symptom recorded against a meal. The tuple (meal entry, type, overnight)
/// is unique; recording the same tuple again overwrites the severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symptom {
    pub id: i64,
    pub meal_entry_id: i64,
    pub symptom_type: String,
    pub severity: i64,
    pub is_overnight: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewSymptom {
    pub meal_entry_id: i64,
    pub symptom_type: String,
    pub severity: i64,
    pub is_overnight: bool,
}

pub const MEAL_SLOTS: &[&str] = &["breakfast", "lunch", "snack", "dinner"];

/// Days within a tracking period run 1 through 5.
pub const TRACKING_DAY_MAX: i64 = 5;

/// Severity is recorded on a 0 to 180 scale.
pub const SEVERITY_MAX: i64 = 180;

pub fn validate_meal_slot(slot: &str) -> Result<String> {
    let lower = slot.to_lowercase();
    if MEAL_SLOTS.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        Err(CoreError::InvalidInput(format!(
            "Invalid meal slot '{slot}'. Must be one of: {}",
            MEAL_SLOTS.join(", ")
        )))
    }
}

pub fn validate_tracking_day(day: i64) -> Result<i64> {
    if (1..=TRACKING_DAY_MAX).contains(&day) {
        Ok(day)
    } else {
        Err(CoreError::InvalidInput(format!(
            "Invalid tracking day {day}. Must be between 1 and {TRACKING_DAY_MAX}"
        )))
    }
}

pub fn validate_severity(severity: i64) -> Result<i64> {
    if (0..=SEVERITY_MAX).contains(&severity) {
        Ok(severity)
    } else {
        Err(CoreError::InvalidInput(format!(
            "Invalid severity {severity}. Must be between 0 and {SEVERITY_MAX}"
        )))
    }
}

/// Symptom types are free-form but must not be blank.
pub fn validate_symptom_type(symptom_type: &str) -> Result<String> {
    let trimmed = symptom_type.trim();
    if trimmed.is_empty() {
        Err(CoreError::InvalidInput(
            "Symptom type must not be empty".to_string(),
        ))
    } else {
        Ok(trimmed.to_string())
    }
}
