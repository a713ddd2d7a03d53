use std::path::Path;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use rusqlite::{Connection, params};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::models::{
    CustomFood, FoodItem, MealEntry, MealFood, NewCustomFood, NewFoodItem, NewMealEntry,
    NewSymptom, NewTrackingPeriod, Symptom, TrackingPeriod,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        // Multiple connections may share the file; writers wait out the lock
        // instead of failing fast.
        conn.busy_timeout(Duration::from_secs(5))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    #[allow(clippy::too_many_lines)]
    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            debug!("applying schema version 1");
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS tracking_periods (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL,
                    start_date TEXT NOT NULL,
                    end_date TEXT NOT NULL,
                    is_completed INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tracking_periods_user
                    ON tracking_periods(user_id);

                -- One incomplete period per user, enforced by the store.
                CREATE UNIQUE INDEX IF NOT EXISTS idx_tracking_periods_active
                    ON tracking_periods(user_id) WHERE is_completed = 0;

                CREATE TABLE IF NOT EXISTS meal_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL,
                    tracking_period_id INTEGER NOT NULL REFERENCES tracking_periods(id),
                    tracking_day INTEGER NOT NULL,
                    meal_slot TEXT NOT NULL,
                    meal_time TEXT NOT NULL,
                    meal_duration TEXT NOT NULL,
                    notes TEXT,
                    portion_size TEXT NOT NULL,
                    is_completed INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE(user_id, tracking_period_id, tracking_day, meal_slot)
                );

                CREATE INDEX IF NOT EXISTS idx_meal_entries_period
                    ON meal_entries(tracking_period_id);

                CREATE TABLE IF NOT EXISTS food_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    category TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_foods (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    meal_entry_id INTEGER NOT NULL REFERENCES meal_entries(id),
                    food_item_id INTEGER NOT NULL REFERENCES food_items(id),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_meal_foods_meal
                    ON meal_foods(meal_entry_id);

                CREATE TABLE IF NOT EXISTS custom_foods (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    meal_entry_id INTEGER NOT NULL REFERENCES meal_entries(id),
                    name TEXT NOT NULL,
                    portion TEXT NOT NULL,
                    preparation TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_custom_foods_meal
                    ON custom_foods(meal_entry_id);

                CREATE TABLE IF NOT EXISTS symptoms (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    meal_entry_id INTEGER NOT NULL REFERENCES meal_entries(id),
                    symptom_type TEXT NOT NULL,
                    severity INTEGER NOT NULL,
                    is_overnight INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE(meal_entry_id, symptom_type, is_overnight)
                );

                CREATE INDEX IF NOT EXISTS idx_symptoms_meal
                    ON symptoms(meal_entry_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn date_from_text(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(2000, 1, 1).expect("valid date"))
    }

    fn tracking_period_from_row(row: &rusqlite::Row) -> rusqlite::Result<TrackingPeriod> {
        let start: String = row.get(2)?;
        let end: String = row.get(3)?;
        Ok(TrackingPeriod {
            id: row.get(0)?,
            user_id: row.get(1)?,
            start_date: Self::date_from_text(&start),
            end_date: Self::date_from_text(&end),
            is_completed: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn meal_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealEntry> {
        Ok(MealEntry {
            id: row.get(0)?,
            user_id: row.get(1)?,
            tracking_period_id: row.get(2)?,
            tracking_day: row.get(3)?,
            meal_slot: row.get(4)?,
            meal_time: row.get(5)?,
            meal_duration: row.get(6)?,
            notes: row.get(7)?,
            portion_size: row.get(8)?,
            is_completed: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn food_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<FoodItem> {
        Ok(FoodItem {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn meal_food_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealFood> {
        Ok(MealFood {
            id: row.get(0)?,
            meal_entry_id: row.get(1)?,
            food_item_id: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn custom_food_from_row(row: &rusqlite::Row) -> rusqlite::Result<CustomFood> {
        Ok(CustomFood {
            id: row.get(0)?,
            meal_entry_id: row.get(1)?,
            name: row.get(2)?,
            portion: row.get(3)?,
            preparation: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn symptom_from_row(row: &rusqlite::Row) -> rusqlite::Result<Symptom> {
        Ok(Symptom {
            id: row.get(0)?,
            meal_entry_id: row.get(1)?,
            symptom_type: row.get(2)?,
            severity: row.get(3)?,
            is_overnight: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    // --- Tracking Periods ---

    /// Starts a tracking period for the user, or returns the active one if it
    /// already exists. The insert is guarded by the partial unique index on
    /// incomplete periods, so concurrent calls cannot create two active rows;
    /// the supplied dates are ignored when an active period wins the race.
    pub fn start_tracking_period(&self, period: &NewTrackingPeriod) -> Result<TrackingPeriod> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "INSERT INTO tracking_periods (user_id, start_date, end_date, is_completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?4)
             ON CONFLICT(user_id) WHERE is_completed = 0 DO NOTHING",
            params![
                period.user_id,
                period.start_date.format("%Y-%m-%d").to_string(),
                period.end_date.format("%Y-%m-%d").to_string(),
                now,
            ],
        )?;
        if rows == 0 {
            debug!(
                "user {} already has an active tracking period",
                period.user_id
            );
            return self.get_active_period(period.user_id);
        }
        self.get_tracking_period(self.conn.last_insert_rowid())
    }

    pub fn get_tracking_period(&self, id: i64) -> Result<TrackingPeriod> {
        self.conn
            .query_row(
                "SELECT id, user_id, start_date, end_date, is_completed, created_at, updated_at
                 FROM tracking_periods WHERE id = ?1",
                params![id],
                Self::tracking_period_from_row,
            )
            .map_err(CoreError::from_lookup)
    }

    pub fn get_active_period(&self, user_id: i64) -> Result<TrackingPeriod> {
        self.conn
            .query_row(
                "SELECT id, user_id, start_date, end_date, is_completed, created_at, updated_at
                 FROM tracking_periods WHERE user_id = ?1 AND is_completed = 0",
                params![user_id],
                Self::tracking_period_from_row,
            )
            .map_err(CoreError::from_lookup)
    }

    pub fn get_last_completed_period(&self, user_id: i64) -> Result<TrackingPeriod> {
        self.conn
            .query_row(
                "SELECT id, user_id, start_date, end_date, is_completed, created_at, updated_at
                 FROM tracking_periods
                 WHERE user_id = ?1 AND is_completed = 1
                 ORDER BY end_date DESC",
                params![user_id],
                Self::tracking_period_from_row,
            )
            .map_err(CoreError::from_lookup)
    }

    pub fn list_tracking_periods(&self, user_id: i64) -> Result<Vec<TrackingPeriod>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, start_date, end_date, is_completed, created_at, updated_at
             FROM tracking_periods WHERE user_id = ?1
             ORDER BY start_date DESC",
        )?;
        let periods = stmt
            .query_map(params![user_id], Self::tracking_period_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(periods)
    }

    pub fn update_tracking_period(&self, period: &TrackingPeriod) -> Result<TrackingPeriod> {
        let now = Local::now().to_rfc3339();
        let rows = self
            .conn
            .execute(
                "UPDATE tracking_periods
                 SET user_id = ?1, start_date = ?2, end_date = ?3, is_completed = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    period.user_id,
                    period.start_date.format("%Y-%m-%d").to_string(),
                    period.end_date.format("%Y-%m-%d").to_string(),
                    period.is_completed,
                    now,
                    period.id,
                ],
            )
            .map_err(|err| {
                constraint_conflict(err, "user already has an active tracking period")
            })?;
        if rows == 0 {
            return Err(CoreError::NotFound);
        }
        self.get_tracking_period(period.id)
    }

    /// Idempotent: completing an already-completed period is a no-op.
    pub fn complete_tracking_period(&self, id: i64) -> Result<()> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE tracking_periods SET is_completed = 1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        if rows == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    // --- Meal Entries ---

    /// Get-or-create on the natural key (user, period, day, slot). When the
    /// slot is already logged the existing row comes back unchanged and the
    /// supplied field values are ignored. The insert is guarded by the unique
    /// constraint, so concurrent calls for one slot yield one row.
    pub fn create_meal_entry(&self, entry: &NewMealEntry) -> Result<MealEntry> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "INSERT INTO meal_entries (user_id, tracking_period_id, tracking_day, meal_slot,
                                       meal_time, meal_duration, notes, portion_size,
                                       is_completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9)
             ON CONFLICT(user_id, tracking_period_id, tracking_day, meal_slot) DO NOTHING",
            params![
                entry.user_id,
                entry.tracking_period_id,
                entry.tracking_day,
                entry.meal_slot,
                entry.meal_time,
                entry.meal_duration,
                entry.notes,
                entry.portion_size,
                now,
            ],
        )?;
        if rows == 0 {
            debug!(
                "meal entry already exists for user {} period {} day {} slot {}",
                entry.user_id, entry.tracking_period_id, entry.tracking_day, entry.meal_slot
            );
            return self.get_meal_entry_by_details(
                entry.user_id,
                entry.tracking_period_id,
                entry.tracking_day,
                &entry.meal_slot,
            );
        }
        self.get_meal_entry(self.conn.last_insert_rowid())
    }

    pub fn get_meal_entry(&self, id: i64) -> Result<MealEntry> {
        self.conn
            .query_row(
                "SELECT id, user_id, tracking_period_id, tracking_day, meal_slot, meal_time,
                        meal_duration, notes, portion_size, is_completed, created_at, updated_at
                 FROM meal_entries WHERE id = ?1",
                params![id],
                Self::meal_entry_from_row,
            )
            .map_err(CoreError::from_lookup)
    }

    pub fn get_meal_entry_by_details(
        &self,
        user_id: i64,
        tracking_period_id: i64,
        tracking_day: i64,
        meal_slot: &str,
    ) -> Result<MealEntry> {
        self.conn
            .query_row(
                "SELECT id, user_id, tracking_period_id, tracking_day, meal_slot, meal_time,
                        meal_duration, notes, portion_size, is_completed, created_at, updated_at
                 FROM meal_entries
                 WHERE user_id = ?1 AND tracking_period_id = ?2
                   AND tracking_day = ?3 AND meal_slot = ?4",
                params![user_id, tracking_period_id, tracking_day, meal_slot],
                Self::meal_entry_from_row,
            )
            .map_err(CoreError::from_lookup)
    }

    pub fn list_meal_entries(
        &self,
        user_id: i64,
        tracking_period_id: i64,
    ) -> Result<Vec<MealEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, tracking_period_id, tracking_day, meal_slot, meal_time,
                    meal_duration, notes, portion_size, is_completed, created_at, updated_at
             FROM meal_entries
             WHERE user_id = ?1 AND tracking_period_id = ?2
             ORDER BY tracking_day, meal_slot",
        )?;
        let entries = stmt
            .query_map(
                params![user_id, tracking_period_id],
                Self::meal_entry_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn update_meal_entry(&self, entry: &MealEntry) -> Result<MealEntry> {
        let now = Local::now().to_rfc3339();
        let rows = self
            .conn
            .execute(
                "UPDATE meal_entries
                 SET user_id = ?1, tracking_period_id = ?2, tracking_day = ?3, meal_slot = ?4,
                     meal_time = ?5, meal_duration = ?6, notes = ?7, portion_size = ?8,
                     is_completed = ?9, updated_at = ?10
                 WHERE id = ?11",
                params![
                    entry.user_id,
                    entry.tracking_period_id,
                    entry.tracking_day,
                    entry.meal_slot,
                    entry.meal_time,
                    entry.meal_duration,
                    entry.notes,
                    entry.portion_size,
                    entry.is_completed,
                    now,
                    entry.id,
                ],
            )
            .map_err(|err| {
                constraint_conflict(err, "a meal entry already exists for this day and slot")
            })?;
        if rows == 0 {
            return Err(CoreError::NotFound);
        }
        self.get_meal_entry(entry.id)
    }

    /// Idempotent: completing an already-completed entry is a no-op.
    pub fn complete_meal_entry(&self, id: i64) -> Result<()> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE meal_entries SET is_completed = 1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        if rows == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    /// Removes the entry row only. Food links, custom foods, and symptoms
    /// under the entry are left in place; the service layer owns the deletion
    /// protocol that clears them first.
    pub fn delete_meal_entry(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM meal_entries WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Food Items ---

    /// Plain insert. A duplicate name is a `Conflict`, never a silent dedup;
    /// callers wanting get-or-create must look up by name first.
    pub fn insert_food_item(&self, item: &NewFoodItem) -> Result<FoodItem> {
        let now = Local::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO food_items (name, category, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![item.name, item.category, now],
            )
            .map_err(|err| {
                constraint_conflict(err, &format!("food item '{}' already exists", item.name))
            })?;
        self.get_food_item(self.conn.last_insert_rowid())
    }

    pub fn get_food_item(&self, id: i64) -> Result<FoodItem> {
        self.conn
            .query_row(
                "SELECT id, name, category, created_at, updated_at
                 FROM food_items WHERE id = ?1",
                params![id],
                Self::food_item_from_row,
            )
            .map_err(CoreError::from_lookup)
    }

    pub fn get_food_item_by_name(&self, name: &str) -> Result<FoodItem> {
        self.conn
            .query_row(
                "SELECT id, name, category, created_at, updated_at
                 FROM food_items WHERE name = ?1",
                params![name],
                Self::food_item_from_row,
            )
            .map_err(CoreError::from_lookup)
    }

    pub fn list_food_items(&self) -> Result<Vec<FoodItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category, created_at, updated_at
             FROM food_items ORDER BY name",
        )?;
        let items = stmt
            .query_map([], Self::food_item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn list_food_items_by_category(&self, category: &str) -> Result<Vec<FoodItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category, created_at, updated_at
             FROM food_items WHERE category = ?1 ORDER BY name",
        )?;
        let items = stmt
            .query_map(params![category], Self::food_item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn update_food_item(&self, item: &FoodItem) -> Result<FoodItem> {
        let now = Local::now().to_rfc3339();
        let rows = self
            .conn
            .execute(
                "UPDATE food_items SET name = ?1, category = ?2, updated_at = ?3 WHERE id = ?4",
                params![item.name, item.category, now, item.id],
            )
            .map_err(|err| {
                constraint_conflict(err, &format!("food item '{}' already exists", item.name))
            })?;
        if rows == 0 {
            return Err(CoreError::NotFound);
        }
        self.get_food_item(item.id)
    }

    pub fn delete_food_item(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM food_items WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Meal Foods ---

    /// Always inserts a fresh join row; the same food may be linked to one
    /// meal more than once.
    pub fn add_meal_food(&self, meal_entry_id: i64, food_item_id: i64) -> Result<MealFood> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO meal_foods (meal_entry_id, food_item_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![meal_entry_id, food_item_id, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(MealFood {
            id,
            meal_entry_id,
            food_item_id,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn list_meal_foods(&self, meal_entry_id: i64) -> Result<Vec<MealFood>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, meal_entry_id, food_item_id, created_at, updated_at
             FROM meal_foods WHERE meal_entry_id = ?1 ORDER BY id",
        )?;
        let foods = stmt
            .query_map(params![meal_entry_id], Self::meal_food_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    pub fn delete_meal_food(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM meal_foods WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn delete_meal_foods_for_meal(&self, meal_entry_id: i64) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM meal_foods WHERE meal_entry_id = ?1",
            params![meal_entry_id],
        )?;
        Ok(rows)
    }

    // --- Custom Foods ---

    pub fn add_custom_food(&self, food: &NewCustomFood) -> Result<CustomFood> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO custom_foods (meal_entry_id, name, portion, preparation, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![food.meal_entry_id, food.name, food.portion, food.preparation, now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(CustomFood {
            id,
            meal_entry_id: food.meal_entry_id,
            name: food.name.clone(),
            portion: food.portion.clone(),
            preparation: food.preparation.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn list_custom_foods(&self, meal_entry_id: i64) -> Result<Vec<CustomFood>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, meal_entry_id, name, portion, preparation, created_at, updated_at
             FROM custom_foods WHERE meal_entry_id = ?1 ORDER BY id",
        )?;
        let foods = stmt
            .query_map(params![meal_entry_id], Self::custom_food_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    pub fn update_custom_food(&self, food: &CustomFood) -> Result<CustomFood> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE custom_foods
             SET meal_entry_id = ?1, name = ?2, portion = ?3, preparation = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                food.meal_entry_id,
                food.name,
                food.portion,
                food.preparation,
                now,
                food.id,
            ],
        )?;
        if rows == 0 {
            return Err(CoreError::NotFound);
        }
        self.conn
            .query_row(
                "SELECT id, meal_entry_id, name, portion, preparation, created_at, updated_at
                 FROM custom_foods WHERE id = ?1",
                params![food.id],
                Self::custom_food_from_row,
            )
            .map_err(CoreError::from_lookup)
    }

    pub fn delete_custom_food(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM custom_foods WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn delete_custom_foods_for_meal(&self, meal_entry_id: i64) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM custom_foods WHERE meal_entry_id = ?1",
            params![meal_entry_id],
        )?;
        Ok(rows)
    }

    // --- Symptoms ---

    /// Insert-or-merge on the tuple (meal entry, type, overnight): a repeat
    /// recording overwrites the severity of the existing row in the same
    /// statement that would otherwise insert, so concurrent calls cannot
    /// produce duplicates.
    pub fn record_symptom(&self, symptom: &NewSymptom) -> Result<Symptom> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO symptoms (meal_entry_id, symptom_type, severity, is_overnight, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(meal_entry_id, symptom_type, is_overnight) DO UPDATE SET
                severity = excluded.severity,
                updated_at = excluded.updated_at",
            params![
                symptom.meal_entry_id,
                symptom.symptom_type,
                symptom.severity,
                symptom.is_overnight,
                now,
            ],
        )?;
        self.conn
            .query_row(
                "SELECT id, meal_entry_id, symptom_type, severity, is_overnight, created_at, updated_at
                 FROM symptoms
                 WHERE meal_entry_id = ?1 AND symptom_type = ?2 AND is_overnight = ?3",
                params![symptom.meal_entry_id, symptom.symptom_type, symptom.is_overnight],
                Self::symptom_from_row,
            )
            .map_err(CoreError::from_lookup)
    }

    pub fn get_symptom(&self, id: i64) -> Result<Symptom> {
        self.conn
            .query_row(
                "SELECT id, meal_entry_id, symptom_type, severity, is_overnight, created_at, updated_at
                 FROM symptoms WHERE id = ?1",
                params![id],
                Self::symptom_from_row,
            )
            .map_err(CoreError::from_lookup)
    }

    /// Matches on type alone. The overnight flag is part of the uniqueness
    /// key but not of this lookup, so when both a day and an overnight row
    /// exist for the type, the lower-id row comes back.
    pub fn get_symptom_by_type_for_meal(
        &self,
        meal_entry_id: i64,
        symptom_type: &str,
    ) -> Result<Symptom> {
        self.conn
            .query_row(
                "SELECT id, meal_entry_id, symptom_type, severity, is_overnight, created_at, updated_at
                 FROM symptoms
                 WHERE meal_entry_id = ?1 AND symptom_type = ?2
                 ORDER BY id",
                params![meal_entry_id, symptom_type],
                Self::symptom_from_row,
            )
            .map_err(CoreError::from_lookup)
    }

    pub fn list_symptoms_for_meal(&self, meal_entry_id: i64) -> Result<Vec<Symptom>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, meal_entry_id, symptom_type, severity, is_overnight, created_at, updated_at
             FROM symptoms WHERE meal_entry_id = ?1 ORDER BY id",
        )?;
        let symptoms = stmt
            .query_map(params![meal_entry_id], Self::symptom_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(symptoms)
    }

    pub fn update_symptom(&self, symptom: &Symptom) -> Result<Symptom> {
        let now = Local::now().to_rfc3339();
        let rows = self
            .conn
            .execute(
                "UPDATE symptoms
                 SET meal_entry_id = ?1, symptom_type = ?2, severity = ?3, is_overnight = ?4,
                     updated_at = ?5
                 WHERE id = ?6",
                params![
                    symptom.meal_entry_id,
                    symptom.symptom_type,
                    symptom.severity,
                    symptom.is_overnight,
                    now,
                    symptom.id,
                ],
            )
            .map_err(|err| {
                constraint_conflict(
                    err,
                    "a symptom of this type already exists for this meal",
                )
            })?;
        if rows == 0 {
            return Err(CoreError::NotFound);
        }
        self.get_symptom(symptom.id)
    }

    pub fn delete_symptom(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM symptoms WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn delete_symptoms_for_meal(&self, meal_entry_id: i64) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM symptoms WHERE meal_entry_id = ?1",
            params![meal_entry_id],
        )?;
        Ok(rows)
    }
}

fn unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn constraint_conflict(err: rusqlite::Error, message: &str) -> CoreError {
    if unique_violation(&err) {
        CoreError::Conflict(message.to_string())
    } else {
        CoreError::Storage(err)
    }
}
