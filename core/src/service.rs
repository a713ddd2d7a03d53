use std::path::Path;

use chrono::NaiveDate;

use crate::db::Database;
use crate::error::Result;
use crate::models::{
    CustomFood, FoodItem, MealEntry, MealFood, NewCustomFood, NewFoodItem, NewMealEntry,
    NewSymptom, NewTrackingPeriod, Symptom, TrackingPeriod, validate_meal_slot, validate_severity,
    validate_symptom_type, validate_tracking_day,
};

/// The in-process operation surface handed to the API layer.
///
/// Thin delegation over [`Database`]; the loosely-typed domain fields (meal
/// slot, tracking day, severity, symptom type) are validated and canonicalized
/// here so the natural keys underneath only ever see canonical values.
pub struct TrackerService {
    db: Database,
}

impl TrackerService {
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Database::open(Path::new(db_path))?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    // --- Tracking periods ---

    /// Starts a period, or returns the user's active one if it exists
    /// (the supplied dates are ignored in that case).
    pub fn start_period(
        &self,
        user_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<TrackingPeriod> {
        self.db.start_tracking_period(&NewTrackingPeriod {
            user_id,
            start_date,
            end_date,
        })
    }

    pub fn get_period(&self, id: i64) -> Result<TrackingPeriod> {
        self.db.get_tracking_period(id)
    }

    pub fn get_active_period(&self, user_id: i64) -> Result<TrackingPeriod> {
        self.db.get_active_period(user_id)
    }

    pub fn get_last_completed_period(&self, user_id: i64) -> Result<TrackingPeriod> {
        self.db.get_last_completed_period(user_id)
    }

    pub fn list_periods(&self, user_id: i64) -> Result<Vec<TrackingPeriod>> {
        self.db.list_tracking_periods(user_id)
    }

    pub fn update_period(&self, period: &TrackingPeriod) -> Result<TrackingPeriod> {
        self.db.update_tracking_period(period)
    }

    pub fn complete_period(&self, id: i64) -> Result<()> {
        self.db.complete_tracking_period(id)
    }

    // --- Meal entries ---

    /// Get-or-create for the (user, period, day, slot) tuple. Callers must
    /// not assume the returned row reflects the fields just passed unless it
    /// is newly created.
    pub fn create_entry(&self, entry: &NewMealEntry) -> Result<MealEntry> {
        let mut entry = entry.clone();
        entry.meal_slot = validate_meal_slot(&entry.meal_slot)?;
        entry.tracking_day = validate_tracking_day(entry.tracking_day)?;
        self.db.create_meal_entry(&entry)
    }

    pub fn get_entry(&self, id: i64) -> Result<MealEntry> {
        self.db.get_meal_entry(id)
    }

    pub fn get_entry_by_details(
        &self,
        user_id: i64,
        period_id: i64,
        day: i64,
        meal_slot: &str,
    ) -> Result<MealEntry> {
        let slot = validate_meal_slot(meal_slot)?;
        let day = validate_tracking_day(day)?;
        self.db
            .get_meal_entry_by_details(user_id, period_id, day, &slot)
    }

    pub fn list_entries_for_period(&self, user_id: i64, period_id: i64) -> Result<Vec<MealEntry>> {
        self.db.list_meal_entries(user_id, period_id)
    }

    pub fn update_entry(&self, entry: &MealEntry) -> Result<MealEntry> {
        let mut entry = entry.clone();
        entry.meal_slot = validate_meal_slot(&entry.meal_slot)?;
        entry.tracking_day = validate_tracking_day(entry.tracking_day)?;
        self.db.update_meal_entry(&entry)
    }

    pub fn complete_entry(&self, id: i64) -> Result<()> {
        self.db.complete_meal_entry(id)
    }

    /// Deleting an entry is a two-step protocol: the entry's food links,
    /// custom foods, and symptoms are removed first, then the row itself.
    /// The db layer never cascades on its own.
    pub fn delete_entry(&self, id: i64) -> Result<bool> {
        self.db.delete_meal_foods_for_meal(id)?;
        self.db.delete_custom_foods_for_meal(id)?;
        self.db.delete_symptoms_for_meal(id)?;
        self.db.delete_meal_entry(id)
    }

    // --- Food catalog ---

    /// Plain insert; a duplicate name surfaces as a conflict. Callers that
    /// want dedup check `get_food_item_by_name` first.
    pub fn create_food_item(&self, name: &str, category: &str) -> Result<FoodItem> {
        self.db.insert_food_item(&NewFoodItem {
            name: name.to_string(),
            category: category.to_string(),
        })
    }

    pub fn get_food_item(&self, id: i64) -> Result<FoodItem> {
        self.db.get_food_item(id)
    }

    pub fn get_food_item_by_name(&self, name: &str) -> Result<FoodItem> {
        self.db.get_food_item_by_name(name)
    }

    pub fn list_food_items(&self) -> Result<Vec<FoodItem>> {
        self.db.list_food_items()
    }

    pub fn list_food_items_by_category(&self, category: &str) -> Result<Vec<FoodItem>> {
        self.db.list_food_items_by_category(category)
    }

    pub fn update_food_item(&self, item: &FoodItem) -> Result<FoodItem> {
        self.db.update_food_item(item)
    }

    pub fn delete_food_item(&self, id: i64) -> Result<bool> {
        self.db.delete_food_item(id)
    }

    // --- Meal food associations ---

    pub fn add_food_to_meal(&self, meal_entry_id: i64, food_item_id: i64) -> Result<MealFood> {
        self.db.add_meal_food(meal_entry_id, food_item_id)
    }

    pub fn list_foods_for_meal(&self, meal_entry_id: i64) -> Result<Vec<MealFood>> {
        self.db.list_meal_foods(meal_entry_id)
    }

    pub fn remove_food_link(&self, id: i64) -> Result<bool> {
        self.db.delete_meal_food(id)
    }

    pub fn remove_all_food_links_for_meal(&self, meal_entry_id: i64) -> Result<usize> {
        self.db.delete_meal_foods_for_meal(meal_entry_id)
    }

    pub fn add_custom_food(&self, food: &NewCustomFood) -> Result<CustomFood> {
        self.db.add_custom_food(food)
    }

    pub fn list_custom_foods_for_meal(&self, meal_entry_id: i64) -> Result<Vec<CustomFood>> {
        self.db.list_custom_foods(meal_entry_id)
    }

    pub fn update_custom_food(&self, food: &CustomFood) -> Result<CustomFood> {
        self.db.update_custom_food(food)
    }

    pub fn remove_custom_food(&self, id: i64) -> Result<bool> {
        self.db.delete_custom_food(id)
    }

    pub fn remove_all_custom_foods_for_meal(&self, meal_entry_id: i64) -> Result<usize> {
        self.db.delete_custom_foods_for_meal(meal_entry_id)
    }

    // --- Symptom ledger ---

    /// Records a symptom against a meal. A repeat of the same (type,
    /// overnight) tuple overwrites the severity of the existing row.
    pub fn record_symptom(
        &self,
        meal_entry_id: i64,
        symptom_type: &str,
        severity: i64,
        overnight: bool,
    ) -> Result<Symptom> {
        let symptom_type = validate_symptom_type(symptom_type)?;
        let severity = validate_severity(severity)?;
        self.db.record_symptom(&NewSymptom {
            meal_entry_id,
            symptom_type,
            severity,
            is_overnight: overnight,
        })
    }

    pub fn get_symptom(&self, id: i64) -> Result<Symptom> {
        self.db.get_symptom(id)
    }

    /// Looks up by type alone, ignoring the overnight flag; see the db-layer
    /// note on which row wins when both exist.
    pub fn get_symptom_by_type_for_meal(
        &self,
        meal_entry_id: i64,
        symptom_type: &str,
    ) -> Result<Symptom> {
        self.db
            .get_symptom_by_type_for_meal(meal_entry_id, symptom_type)
    }

    pub fn list_symptoms_for_meal(&self, meal_entry_id: i64) -> Result<Vec<Symptom>> {
        self.db.list_symptoms_for_meal(meal_entry_id)
    }

    pub fn update_symptom(&self, symptom: &Symptom) -> Result<Symptom> {
        let mut symptom = symptom.clone();
        symptom.symptom_type = validate_symptom_type(&symptom.symptom_type)?;
        symptom.severity = validate_severity(symptom.severity)?;
        self.db.update_symptom(&symptom)
    }

    pub fn delete_symptom(&self, id: i64) -> Result<bool> {
        self.db.delete_symptom(id)
    }

    pub fn delete_all_symptoms_for_meal(&self, meal_entry_id: i64) -> Result<usize> {
        self.db.delete_symptoms_for_meal(meal_entry_id)
    }
}
