use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::models::{
    ActivityLevel, Budget, BudgetType, CaloricData, Expense, ExpenseCategory, Goal, Ingredient,
    Meal, NewExpense, NewMeal, NewUser, NewWeightEntry, ProfileChanges, User, UserId, WeightEntry,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Escape `LIKE` wildcards so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
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

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE,
                    name TEXT,
                    address TEXT,
                    phone TEXT,
                    activity_level TEXT,
                    goal TEXT,
                    bmr REAL,
                    tdee REAL,
                    target_calories REAL,
                    budget_type TEXT,
                    budget_amount_cents INTEGER,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS expenses (
                    id TEXT PRIMARY KEY,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
                    description TEXT NOT NULL,
                    category TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS weight_entries (
                    id TEXT PRIMARY KEY,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    date TEXT NOT NULL,
                    weight_kg REAL NOT NULL CHECK (weight_kg > 0),
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meals (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    total_calories REAL NOT NULL,
                    total_protein REAL NOT NULL DEFAULT 0,
                    total_carbs REAL NOT NULL DEFAULT 0,
                    total_fats REAL NOT NULL DEFAULT 0,
                    estimated_cost REAL NOT NULL DEFAULT 0,
                    ingredients TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS favorites (
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    meal_id INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, meal_id)
                );

                CREATE INDEX IF NOT EXISTS idx_expenses_user ON expenses(user_id);
                CREATE INDEX IF NOT EXISTS idx_weight_entries_user_date ON weight_entries(user_id, date);
                CREATE INDEX IF NOT EXISTS idx_meals_name ON meals(name);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Users ---

    pub fn create_user(&self, user: &NewUser) -> Result<User> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO users (email, name, address, phone, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![user.email, user.name, user.address, user.phone, now, now],
            )
            .with_context(|| format!("Failed to create user {}", user.email))?;
        let id = UserId::from_raw(self.conn.last_insert_rowid());
        self.get_user(id)?.context("User not found after insert")
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, name, address, phone, activity_level, goal,
                        bmr, tdee, target_calories, budget_type, budget_amount_cents,
                        created_at, updated_at
                 FROM users WHERE id = ?1",
                params![id.get()],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, name, address, phone, activity_level, goal,
                        bmr, tdee, target_calories, budget_type, budget_amount_cents,
                        created_at, updated_at
                 FROM users WHERE email = ?1",
                params![email],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, name, address, phone, activity_level, goal,
                    bmr, tdee, target_calories, budget_type, budget_amount_cents,
                    created_at, updated_at
             FROM users ORDER BY id",
        )?;
        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn user_exists(&self, id: UserId) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![id.get()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Returns false when the user does not exist.
    pub fn save_caloric_data(
        &self,
        id: UserId,
        data: &CaloricData,
        activity_level: ActivityLevel,
        goal: Goal,
    ) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE users SET bmr = ?1, tdee = ?2, target_calories = ?3,
                activity_level = ?4, goal = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                data.bmr,
                data.tdee,
                data.target_calories,
                activity_level.as_str(),
                goal.as_str(),
                now,
                id.get(),
            ],
        )?;
        Ok(rows > 0)
    }

    /// Apply a partial profile edit. Returns false when the user does not exist.
    pub fn update_user_profile(&self, id: UserId, changes: &ProfileChanges) -> Result<bool> {
        let Some(current) = self.get_user(id)? else {
            return Ok(false);
        };
        let email = changes.email.as_deref().unwrap_or(&current.email);
        let name = changes.name.as_ref().unwrap_or(&current.name);
        let address = changes.address.as_ref().unwrap_or(&current.address);
        let phone = changes.phone.as_ref().unwrap_or(&current.phone);
        let activity_level = changes.activity_level.or(current.activity_level);
        let goal = changes.goal.or(current.goal);

        let now = Utc::now().to_rfc3339();
        let rows = self
            .conn
            .execute(
                "UPDATE users SET email = ?1, name = ?2, address = ?3, phone = ?4,
                    activity_level = ?5, goal = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    email,
                    name,
                    address,
                    phone,
                    activity_level.map(ActivityLevel::as_str),
                    goal.map(Goal::as_str),
                    now,
                    id.get(),
                ],
            )
            .with_context(|| format!("Failed to update user {id}"))?;
        Ok(rows > 0)
    }

    /// Replace the budget configuration. Expenses are untouched.
    pub fn set_budget(&self, id: UserId, budget_type: BudgetType, amount_cents: i64) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE users SET budget_type = ?1, budget_amount_cents = ?2, updated_at = ?3
             WHERE id = ?4",
            params![budget_type.as_str(), amount_cents, now, id.get()],
        )?;
        Ok(rows > 0)
    }

    pub fn get_budget(&self, id: UserId) -> Result<Option<Budget>> {
        Ok(self.get_user(id)?.and_then(|u| u.budget))
    }

    fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let activity_level: Option<String> = row.get(5)?;
        let goal: Option<String> = row.get(6)?;
        let bmr: Option<f64> = row.get(7)?;
        let tdee: Option<f64> = row.get(8)?;
        let target_calories: Option<f64> = row.get(9)?;
        let budget_type: Option<String> = row.get(10)?;
        let budget_amount_cents: Option<i64> = row.get(11)?;

        let caloric_data = match (bmr, tdee, target_calories) {
            (Some(bmr), Some(tdee), Some(target_calories)) => Some(CaloricData {
                bmr,
                tdee,
                target_calories,
            }),
            _ => None,
        };
        let budget = budget_type
            .and_then(|t| t.parse::<BudgetType>().ok())
            .map(|budget_type| Budget {
                budget_type,
                amount_cents: budget_amount_cents.unwrap_or(0),
            });

        Ok(User {
            id: UserId::from_raw(row.get(0)?),
            email: row.get(1)?,
            name: row.get(2)?,
            address: row.get(3)?,
            phone: row.get(4)?,
            activity_level: activity_level.and_then(|a| a.parse().ok()),
            goal: goal.and_then(|g| g.parse().ok()),
            caloric_data,
            budget,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    // --- Expenses ---

    pub fn add_expense(&self, id: UserId, expense: &NewExpense) -> Result<Expense> {
        let now = Utc::now().to_rfc3339();
        let expense_id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO expenses (id, user_id, amount_cents, description, category, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                expense_id,
                id.get(),
                expense.amount_cents,
                expense.description,
                expense.category.as_str(),
                now,
            ],
        )?;
        Ok(Expense {
            id: expense_id,
            amount_cents: expense.amount_cents,
            description: expense.description.clone(),
            category: Some(expense.category),
            created_at: now,
        })
    }

    /// Expenses in insertion order.
    pub fn list_expenses(&self, id: UserId) -> Result<Vec<Expense>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, amount_cents, description, category, created_at
             FROM expenses WHERE user_id = ?1 ORDER BY rowid",
        )?;
        let expenses = stmt
            .query_map(params![id.get()], Self::expense_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(expenses)
    }

    pub fn delete_expense(&self, id: UserId, expense_id: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM expenses WHERE id = ?1 AND user_id = ?2",
            params![expense_id, id.get()],
        )?;
        Ok(rows > 0)
    }

    fn expense_from_row(row: &rusqlite::Row) -> rusqlite::Result<Expense> {
        let category: Option<String> = row.get(3)?;
        Ok(Expense {
            id: row.get(0)?,
            amount_cents: row.get(1)?,
            description: row.get(2)?,
            category: category.and_then(|c| c.parse::<ExpenseCategory>().ok()),
            created_at: row.get(4)?,
        })
    }

    // --- Weight Entries ---

    pub fn add_weight(&self, id: UserId, entry: &NewWeightEntry) -> Result<WeightEntry> {
        let now = Utc::now().to_rfc3339();
        let entry_id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO weight_entries (id, user_id, date, weight_kg, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry_id,
                id.get(),
                entry.date.format(DATE_FORMAT).to_string(),
                entry.weight_kg,
                now,
            ],
        )?;
        Ok(WeightEntry {
            id: entry_id,
            date: entry.date,
            weight_kg: entry.weight_kg,
            created_at: now,
        })
    }

    /// Append all entries in one transaction. Either every row lands or none do.
    pub fn import_weights(&self, id: UserId, entries: &[NewWeightEntry]) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO weight_entries (id, user_id, date, weight_kg, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    id.get(),
                    entry.date.format(DATE_FORMAT).to_string(),
                    entry.weight_kg,
                    now,
                ])?;
            }
        }
        tx.commit().context("Failed to commit weight import")?;
        Ok(entries.len())
    }

    /// Ascending by date; entries on the same date keep insertion order.
    pub fn list_weights(&self, id: UserId) -> Result<Vec<WeightEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, weight_kg, created_at
             FROM weight_entries WHERE user_id = ?1 ORDER BY date, rowid",
        )?;
        let entries = stmt
            .query_map(params![id.get()], Self::weight_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn delete_weight(&self, id: UserId, entry_id: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM weight_entries WHERE id = ?1 AND user_id = ?2",
            params![entry_id, id.get()],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_all_weights(&self, id: UserId) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM weight_entries WHERE user_id = ?1",
            params![id.get()],
        )?;
        Ok(rows)
    }

    fn weight_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<WeightEntry> {
        let date_str: String = row.get(1)?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
        Ok(WeightEntry {
            id: row.get(0)?,
            date,
            weight_kg: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    // --- Favorites ---

    pub fn add_favorite(&self, id: UserId, meal_id: i64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO favorites (user_id, meal_id, created_at) VALUES (?1, ?2, ?3)",
            params![id.get(), meal_id, now],
        )?;
        Ok(())
    }

    pub fn remove_favorite(&self, id: UserId, meal_id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM favorites WHERE user_id = ?1 AND meal_id = ?2",
            params![id.get(), meal_id],
        )?;
        Ok(())
    }

    pub fn count_favorites(&self, id: UserId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM favorites WHERE user_id = ?1",
            params![id.get()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Favorite meals in the order they were added. Ids with no catalog entry are skipped.
    pub fn list_favorite_meals(&self, id: UserId) -> Result<Vec<Meal>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.name, m.total_calories, m.total_protein, m.total_carbs,
                    m.total_fats, m.estimated_cost, m.ingredients
             FROM favorites f
             JOIN meals m ON m.id = f.meal_id
             WHERE f.user_id = ?1
             ORDER BY f.rowid",
        )?;
        let meals = stmt
            .query_map(params![id.get()], Self::meal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(meals)
    }

    // --- Meal catalog ---

    pub fn insert_meal(&self, meal: &NewMeal) -> Result<Meal> {
        let now = Utc::now().to_rfc3339();
        let ingredients = serde_json::to_string(&meal.ingredients)?;
        self.conn.execute(
            "INSERT INTO meals (name, total_calories, total_protein, total_carbs, total_fats,
                                estimated_cost, ingredients, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                meal.name.trim(),
                meal.total_calories,
                meal.total_protein,
                meal.total_carbs,
                meal.total_fats,
                meal.estimated_cost,
                ingredients,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_meal(id)?.context("Meal not found after insert")
    }

    pub fn import_meals(&self, meals: &[NewMeal]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for meal in meals {
            self.insert_meal(meal)?;
        }
        tx.commit().context("Failed to commit meal import")?;
        Ok(meals.len())
    }

    pub fn get_meal(&self, id: i64) -> Result<Option<Meal>> {
        let meal = self
            .conn
            .query_row(
                "SELECT id, name, total_calories, total_protein, total_carbs,
                        total_fats, estimated_cost, ingredients
                 FROM meals WHERE id = ?1",
                params![id],
                Self::meal_from_row,
            )
            .optional()?;
        Ok(meal)
    }

    pub fn list_meals(&self, query: Option<&str>) -> Result<Vec<Meal>> {
        let pattern = format!("%{}%", escape_like(query.unwrap_or("").trim()));
        let mut stmt = self.conn.prepare(
            "SELECT id, name, total_calories, total_protein, total_carbs,
                    total_fats, estimated_cost, ingredients
             FROM meals WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name, id",
        )?;
        let meals = stmt
            .query_map(params![pattern], Self::meal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(meals)
    }

    fn meal_from_row(row: &rusqlite::Row) -> rusqlite::Result<Meal> {
        let ingredients_json: String = row.get(7)?;
        let ingredients: Vec<Ingredient> = serde_json::from_str(&ingredients_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
        Ok(Meal {
            id: row.get(0)?,
            name: row.get(1)?,
            total_calories: row.get(2)?,
            total_protein: row.get(3)?,
            total_carbs: row.get(4)?,
            total_fats: row.get(5)?,
            estimated_cost: row.get(6)?,
            ingredients,
        })
    }
}
