use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use chrono::Duration;
use tracing::{debug, warn};

use crate::auth::AuthGate;
use crate::budget;
use crate::calories::{self, CalorieRequest};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    BudgetRequest, BudgetSummary, CaloricData, Expense, ExpenseRequest, Meal, MealSuggestions,
    NewExpense, NewMeal, NewUser, NewWeightEntry, Profile, ProfileUpdate, RawWeightSample,
    SaveCaloricData, User, UserId, WeightEntry, WeightImportSummary, validate_meal,
};
use crate::weight_import;

/// Account-scoped facade over storage.
///
/// Every method taking a [`UserId`] expects one obtained from
/// [`NourishService::authenticate`].
pub struct NourishService {
    db: Database,
    auth: AuthGate,
}

impl NourishService {
    pub fn new(db_path: &Path, token_secret: &[u8]) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self {
            db,
            auth: AuthGate::new(token_secret),
        })
    }

    pub fn new_in_memory(token_secret: &[u8]) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db,
            auth: AuthGate::new(token_secret),
        })
    }

    // --- Identity ---

    /// Resolve a credential and confirm the account still exists.
    pub fn authenticate(&self, credential: Option<&str>) -> Result<UserId> {
        let user = self.auth.resolve_identity(credential)?;
        if !self.db.user_exists(user)? {
            debug!(user = %user, "token for unknown user");
            return Err(Error::Unauthenticated);
        }
        Ok(user)
    }

    pub fn issue_token(&self, user: UserId, ttl: Duration) -> Result<String> {
        self.auth.issue(user, ttl)
    }

    pub fn create_user(&self, new_user: &NewUser) -> Result<User> {
        let new_user = new_user.validated()?;
        if self.db.get_user_by_email(&new_user.email)?.is_some() {
            return Err(Error::validation(format!(
                "An account for {} already exists",
                new_user.email
            )));
        }
        let user = self.db.create_user(&new_user)?;
        debug!(user = %user.id, "created user");
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        self.db
            .get_user_by_email(&email)?
            .ok_or_else(|| Error::not_found(format!("No account for {email}")))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.db.list_users()?)
    }

    fn user(&self, user: UserId) -> Result<User> {
        self.db
            .get_user(user)?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    // --- Calories ---

    pub fn compute_calories(&self, req: &CalorieRequest) -> Result<CaloricData> {
        calories::compute_from_request(req)
    }

    pub fn save_calories(&self, user: UserId, req: &SaveCaloricData) -> Result<()> {
        let (data, activity_level, goal) = req.parse()?;
        if !self.db.save_caloric_data(user, &data, activity_level, goal)? {
            return Err(Error::not_found("User not found"));
        }
        debug!(user = %user, target = data.target_calories, "saved caloric data");
        Ok(())
    }

    pub fn profile(&self, user: UserId) -> Result<Profile> {
        let record = self.user(user)?;
        let remaining_budget = match &record.budget {
            Some(b) => {
                let expenses = self.db.list_expenses(user)?;
                Some(budget::from_cents(budget::remaining_cents(Some(b), &expenses)))
            }
            None => None,
        };
        Ok(Profile {
            remaining_budget,
            favorite_count: self.db.count_favorites(user)?,
            weight_entry_count: self.db.list_weights(user)?.len(),
            user: record,
        })
    }

    /// Edit contact details and preferences. Caloric data is untouched.
    pub fn update_profile(&self, user: UserId, update: &ProfileUpdate) -> Result<User> {
        let changes = update.parse()?;
        if let Some(email) = &changes.email {
            if let Some(existing) = self.db.get_user_by_email(email)? {
                if existing.id != user {
                    return Err(Error::validation(format!(
                        "An account for {email} already exists"
                    )));
                }
            }
        }
        if !self.db.update_user_profile(user, &changes)? {
            return Err(Error::not_found("User not found"));
        }
        debug!(user = %user, "updated profile");
        self.user(user)
    }

    // --- Budget ---

    pub fn set_budget(&self, user: UserId, req: &BudgetRequest) -> Result<()> {
        let (budget_type, amount_cents) = req.parse()?;
        if !self.db.set_budget(user, budget_type, amount_cents)? {
            return Err(Error::not_found("User not found"));
        }
        debug!(user = %user, budget_type = budget_type.as_str(), amount_cents, "set budget");
        Ok(())
    }

    pub fn budget_summary(&self, user: UserId) -> Result<BudgetSummary> {
        let budget = self.db.get_budget(user)?;
        let expenses = self.db.list_expenses(user)?;
        Ok(budget::summarize(budget.as_ref(), expenses))
    }

    pub fn add_expense(&self, user: UserId, req: &ExpenseRequest) -> Result<Expense> {
        let new_expense = NewExpense::parse(req)?;
        if self.db.get_budget(user)?.is_none() {
            return Err(Error::validation(
                "Set a budget before adding expenses",
            ));
        }
        let expense = self.db.add_expense(user, &new_expense)?;
        debug!(user = %user, expense = %expense.id, amount_cents = expense.amount_cents, "added expense");
        Ok(expense)
    }

    pub fn remove_expense(&self, user: UserId, expense_id: &str) -> Result<()> {
        if self.db.get_budget(user)?.is_none() {
            return Err(Error::not_found("No budget found"));
        }
        if !self.db.delete_expense(user, expense_id)? {
            return Err(Error::not_found(format!("Expense {expense_id} not found")));
        }
        debug!(user = %user, expense = expense_id, "removed expense");
        Ok(())
    }

    pub fn remaining_budget(&self, user: UserId) -> Result<f64> {
        let budget = self.db.get_budget(user)?;
        let expenses = self.db.list_expenses(user)?;
        Ok(budget::from_cents(budget::remaining_cents(
            budget.as_ref(),
            &expenses,
        )))
    }

    pub fn expenses_by_category(&self, user: UserId) -> Result<BTreeMap<String, f64>> {
        let expenses = self.db.list_expenses(user)?;
        Ok(budget::by_category_cents(&expenses)
            .into_iter()
            .map(|(k, v)| (k, budget::from_cents(v)))
            .collect())
    }

    // --- Weight history ---

    pub fn append_weight(&self, user: UserId, sample: &RawWeightSample) -> Result<WeightEntry> {
        let date = sample
            .date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| Error::validation("date is required"))?;
        let date = weight_import::parse_sample_date(date)
            .ok_or_else(|| Error::validation(format!("Invalid date '{date}'")))?;
        let weight = sample
            .weight
            .as_ref()
            .and_then(weight_import::parse_sample_weight)
            .ok_or_else(|| Error::validation("weight must be a number"))?;
        let entry = NewWeightEntry::new(date, weight)?;
        let saved = self.db.add_weight(user, &entry)?;
        debug!(user = %user, date = %saved.date, weight = saved.weight_kg, "appended weight");
        Ok(saved)
    }

    /// Persist every well-formed sample in one transaction; malformed rows are skipped.
    pub fn import_weights(
        &self,
        user: UserId,
        samples: &[RawWeightSample],
    ) -> Result<WeightImportSummary> {
        let mut valid = Vec::with_capacity(samples.len());
        for (i, raw) in samples.iter().enumerate() {
            match weight_import::parse_sample(raw) {
                Some(entry) => valid.push(entry),
                None => warn!(
                    user = %user,
                    row = i + 1,
                    date = ?raw.date,
                    weight = ?raw.weight,
                    "skipping malformed weight sample"
                ),
            }
        }
        let imported = self.db.import_weights(user, &valid)?;
        debug!(user = %user, imported, received = samples.len(), "imported weights");
        Ok(WeightImportSummary {
            rows_received: samples.len(),
            imported,
            skipped: samples.len() - imported,
        })
    }

    pub fn import_weights_csv<R: Read>(&self, user: UserId, reader: R) -> Result<WeightImportSummary> {
        let rows = weight_import::parse_weight_csv(reader)
            .map_err(|e| Error::validation(format!("{e:#}")))?;
        self.import_weights(user, &rows)
    }

    pub fn export_weights_csv<W: Write>(&self, user: UserId, writer: W) -> Result<()> {
        let entries = self.db.list_weights(user)?;
        weight_import::write_weight_csv(writer, &entries)?;
        Ok(())
    }

    pub fn list_weights(&self, user: UserId) -> Result<Vec<WeightEntry>> {
        Ok(self.db.list_weights(user)?)
    }

    pub fn remove_weight(&self, user: UserId, entry_id: &str) -> Result<()> {
        if !self.db.delete_weight(user, entry_id)? {
            return Err(Error::not_found(format!("Weight entry {entry_id} not found")));
        }
        debug!(user = %user, entry = entry_id, "removed weight entry");
        Ok(())
    }

    pub fn remove_all_weights(&self, user: UserId) -> Result<usize> {
        let removed = self.db.delete_all_weights(user)?;
        debug!(user = %user, removed, "cleared weight history");
        Ok(removed)
    }

    // --- Favorites ---

    pub fn add_favorite(&self, user: UserId, meal_id: i64) -> Result<()> {
        self.db.add_favorite(user, meal_id)?;
        debug!(user = %user, meal_id, "added favorite");
        Ok(())
    }

    pub fn remove_favorite(&self, user: UserId, meal_id: i64) -> Result<()> {
        self.db.remove_favorite(user, meal_id)?;
        debug!(user = %user, meal_id, "removed favorite");
        Ok(())
    }

    pub fn list_favorites(&self, user: UserId) -> Result<Vec<Meal>> {
        Ok(self.db.list_favorite_meals(user)?)
    }

    // --- Meal catalog ---

    pub fn list_meals(&self, query: Option<&str>) -> Result<Vec<Meal>> {
        Ok(self.db.list_meals(query)?)
    }

    /// Meals within the saved calorie target and the remaining budget.
    ///
    /// A missing target or budget lifts that limit.
    pub fn personalized_meals(&self, user: UserId) -> Result<MealSuggestions> {
        let record = self.user(user)?;
        let calorie_limit = record.caloric_data.map(|c| c.target_calories);
        let cost_limit = match &record.budget {
            Some(b) => {
                let expenses = self.db.list_expenses(user)?;
                Some(budget::from_cents(budget::remaining_cents(Some(b), &expenses)))
            }
            None => None,
        };
        let meals = self
            .db
            .list_meals(None)?
            .into_iter()
            .filter(|m| calorie_limit.is_none_or(|limit| m.total_calories <= limit))
            .filter(|m| cost_limit.is_none_or(|limit| m.estimated_cost <= limit))
            .collect();
        Ok(MealSuggestions {
            calorie_limit,
            cost_limit,
            meals,
        })
    }

    pub fn get_meal(&self, id: i64) -> Result<Meal> {
        self.db
            .get_meal(id)?
            .ok_or_else(|| Error::not_found(format!("Meal {id} not found")))
    }

    pub fn add_meal(&self, meal: &NewMeal) -> Result<Meal> {
        validate_meal(meal)?;
        let meal = self.db.insert_meal(meal)?;
        debug!(meal_id = meal.id, name = %meal.name, "added meal");
        Ok(meal)
    }

    /// Import a JSON array of meals. All entries are validated before any is written.
    pub fn import_meals_json<R: Read>(&self, reader: R) -> Result<usize> {
        let meals: Vec<NewMeal> = serde_json::from_reader(reader)
            .map_err(|e| Error::validation(format!("Invalid meal JSON: {e}")))?;
        for meal in &meals {
            validate_meal(meal)?;
        }
        let count = self.db.import_meals(&meals)?;
        debug!(count, "imported meals");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetType, ExpenseCategory, UNCATEGORIZED};

    const SECRET: &[u8] = b"service-test-secret";

    fn service_with_user() -> (NourishService, UserId) {
        let svc = NourishService::new_in_memory(SECRET).unwrap();
        let user = svc
            .create_user(&NewUser {
                email: "ada@example.com".to_string(),
                name: Some("Ada".to_string()),
                address: None,
                phone: None,
            })
            .unwrap();
        (svc, user.id)
    }

    fn expense(amount: f64, category: &str) -> ExpenseRequest {
        ExpenseRequest {
            amount: Some(amount),
            description: Some("item".to_string()),
            category: Some(category.to_string()),
        }
    }

    fn sample(date: &str, weight: serde_json::Value) -> RawWeightSample {
        RawWeightSample {
            date: Some(date.to_string()),
            weight: Some(weight),
        }
    }

    fn weekly(amount: f64) -> BudgetRequest {
        BudgetRequest {
            budget_type: Some("weekly".to_string()),
            budget_amount: Some(amount),
        }
    }

    #[test]
    fn test_authenticate_round_trip() {
        let (svc, user) = service_with_user();
        let token = svc.issue_token(user, Duration::days(1)).unwrap();
        assert_eq!(svc.authenticate(Some(&token)).unwrap(), user);
        assert!(matches!(svc.authenticate(None), Err(Error::Unauthenticated)));
    }

    #[test]
    fn test_authenticate_unknown_user() {
        let (svc, _) = service_with_user();
        let token = svc
            .issue_token(UserId::from_raw(999), Duration::days(1))
            .unwrap();
        assert!(matches!(
            svc.authenticate(Some(&token)),
            Err(Error::Unauthenticated)
        ));
    }

    #[test]
    fn test_duplicate_user_is_validation_error() {
        let (svc, _) = service_with_user();
        let dup = svc.create_user(&NewUser {
            email: "ADA@example.com".to_string(),
            name: None,
            address: None,
            phone: None,
        });
        assert!(matches!(dup, Err(Error::Validation(_))));
    }

    #[test]
    fn test_budget_scenario() {
        let (svc, user) = service_with_user();
        svc.set_budget(user, &weekly(100.0)).unwrap();
        let thirty = svc.add_expense(user, &expense(30.0, "Food")).unwrap();
        svc.add_expense(user, &expense(20.0, "Transport")).unwrap();
        assert!((svc.remaining_budget(user).unwrap() - 50.0).abs() < f64::EPSILON);

        svc.remove_expense(user, &thirty.id).unwrap();
        assert!((svc.remaining_budget(user).unwrap() - 80.0).abs() < f64::EPSILON);

        assert!(matches!(
            svc.remove_expense(user, &thirty.id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_budget_scenario_remove_twenty() {
        let (svc, user) = service_with_user();
        svc.set_budget(user, &weekly(100.0)).unwrap();
        svc.add_expense(user, &expense(30.0, "Food")).unwrap();
        let twenty = svc.add_expense(user, &expense(20.0, "Food")).unwrap();
        svc.remove_expense(user, &twenty.id).unwrap();
        assert!((svc.remaining_budget(user).unwrap() - 70.0).abs() < f64::EPSILON);
        let summary = svc.budget_summary(user).unwrap();
        assert_eq!(summary.budget_type, Some(BudgetType::Weekly));
        assert_eq!(summary.expenses.len(), 1);
    }

    #[test]
    fn test_expense_requires_budget() {
        let (svc, user) = service_with_user();
        assert!(matches!(
            svc.add_expense(user, &expense(5.0, "Food")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            svc.remove_expense(user, "missing"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_by_category_exact_cents() {
        let (svc, user) = service_with_user();
        svc.set_budget(user, &weekly(10.0)).unwrap();
        for _ in 0..3 {
            svc.add_expense(user, &expense(0.1, "Uncategorized")).unwrap();
        }
        svc.add_expense(user, &expense(0.2, "food")).unwrap();
        let totals = svc.expenses_by_category(user).unwrap();
        assert!((totals[UNCATEGORIZED] - 0.3).abs() < f64::EPSILON);
        assert!((totals[ExpenseCategory::Food.as_str()] - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_budget_keeps_expenses() {
        let (svc, user) = service_with_user();
        svc.set_budget(user, &weekly(50.0)).unwrap();
        svc.add_expense(user, &expense(10.0, "Other")).unwrap();
        svc.set_budget(
            user,
            &BudgetRequest {
                budget_type: Some("monthly".to_string()),
                budget_amount: Some(200.0),
            },
        )
        .unwrap();
        assert!((svc.remaining_budget(user).unwrap() - 190.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_save_calories_and_profile() {
        let (svc, user) = service_with_user();
        let data = svc
            .compute_calories(&CalorieRequest {
                gender: Some("male".to_string()),
                weight_kg: Some(70.0),
                height_cm: Some(175.0),
                age: Some(25),
                activity_level: Some("sedentary".to_string()),
                goal: Some("maintain".to_string()),
                specific_goal: None,
            })
            .unwrap();
        svc.save_calories(
            user,
            &SaveCaloricData {
                bmr: data.bmr,
                tdee: data.tdee,
                target_calories: data.target_calories,
                activity_level: "sedentary".to_string(),
                goal: "maintain".to_string(),
            },
        )
        .unwrap();

        let profile = svc.profile(user).unwrap();
        assert_eq!(profile.user.caloric_data, Some(data));
        assert!(profile.remaining_budget.is_none());
    }

    #[test]
    fn test_save_calories_rejects_bad_goal() {
        let (svc, user) = service_with_user();
        let err = svc
            .save_calories(
                user,
                &SaveCaloricData {
                    bmr: 1500.0,
                    tdee: 1800.0,
                    target_calories: 1800.0,
                    activity_level: "sedentary".to_string(),
                    goal: "bulk".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(svc.profile(user).unwrap().user.caloric_data.is_none());
    }

    #[test]
    fn test_weight_list_sorted_and_remove_all() {
        let (svc, user) = service_with_user();
        svc.append_weight(user, &sample("2024-05-03", serde_json::json!(70.0)))
            .unwrap();
        svc.append_weight(user, &sample("01-05-2024", serde_json::json!(71.0)))
            .unwrap();
        svc.append_weight(user, &sample("02/05/2024", serde_json::json!("70.5")))
            .unwrap();

        let days: Vec<_> = svc
            .list_weights(user)
            .unwrap()
            .iter()
            .map(|e| e.date.to_string())
            .collect();
        assert_eq!(days, vec!["2024-05-01", "2024-05-02", "2024-05-03"]);

        assert_eq!(svc.remove_all_weights(user).unwrap(), 3);
        assert!(svc.list_weights(user).unwrap().is_empty());
    }

    #[test]
    fn test_append_weight_validation() {
        let (svc, user) = service_with_user();
        assert!(matches!(
            svc.append_weight(user, &sample("2024-05-03", serde_json::json!(-1))),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            svc.append_weight(user, &sample("yesterday-ish", serde_json::json!(70))),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_bulk_import_skips_malformed() {
        let (svc, user) = service_with_user();
        let summary = svc
            .import_weights(
                user,
                &[
                    sample("2024-01-01", serde_json::json!(80)),
                    sample("garbage", serde_json::json!(80)),
                    sample("2024-01-02", serde_json::json!("n/a")),
                    sample("2024-01-03", serde_json::json!(0)),
                    sample("2024-01-04", serde_json::json!(79.2)),
                ],
            )
            .unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 3);
        assert_eq!(svc.list_weights(user).unwrap().len(), 2);
    }

    #[test]
    fn test_csv_import_export() {
        let (svc, user) = service_with_user();
        let csv = "Date,Weight (kg)\n03-01-2024,80\n01-01-2024,81\nbad,1\n";
        let summary = svc.import_weights_csv(user, csv.as_bytes()).unwrap();
        assert_eq!(summary.imported, 2);

        let mut out = Vec::new();
        svc.export_weights_csv(user, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Date,Weight (kg)\n01-01-2024,81\n03-01-2024,80\n");
    }

    #[test]
    fn test_remove_weight_not_found() {
        let (svc, user) = service_with_user();
        assert!(matches!(
            svc.remove_weight(user, "nope"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_favorites() {
        let (svc, user) = service_with_user();
        let meal = svc
            .add_meal(&NewMeal {
                name: "Lentil soup".to_string(),
                total_calories: 320.0,
                total_protein: 18.0,
                total_carbs: 45.0,
                total_fats: 6.0,
                estimated_cost: 2.1,
                ingredients: vec![],
            })
            .unwrap();

        svc.add_favorite(user, meal.id).unwrap();
        svc.add_favorite(user, meal.id).unwrap();
        assert_eq!(svc.list_favorites(user).unwrap().len(), 1);

        svc.remove_favorite(user, 424_242).unwrap();
        svc.remove_favorite(user, meal.id).unwrap();
        assert!(svc.list_favorites(user).unwrap().is_empty());
    }

    fn catalog_meal(svc: &NourishService, name: &str, calories: f64, cost: f64) {
        svc.add_meal(&NewMeal {
            name: name.to_string(),
            total_calories: calories,
            total_protein: 0.0,
            total_carbs: 0.0,
            total_fats: 0.0,
            estimated_cost: cost,
            ingredients: vec![],
        })
        .unwrap();
    }

    #[test]
    fn test_personalized_meals() {
        let (svc, user) = service_with_user();
        catalog_meal(&svc, "Burrito bowl", 900.0, 8.0);
        catalog_meal(&svc, "Oatmeal", 350.0, 1.5);
        catalog_meal(&svc, "Sushi platter", 600.0, 25.0);

        let open = svc.personalized_meals(user).unwrap();
        assert!(open.calorie_limit.is_none());
        assert!(open.cost_limit.is_none());
        assert_eq!(open.meals.len(), 3);

        svc.save_calories(
            user,
            &SaveCaloricData {
                bmr: 1200.0,
                tdee: 1400.0,
                target_calories: 700.0,
                activity_level: "sedentary".to_string(),
                goal: "weight_loss".to_string(),
            },
        )
        .unwrap();
        let names: Vec<_> = svc
            .personalized_meals(user)
            .unwrap()
            .meals
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Oatmeal", "Sushi platter"]);

        svc.set_budget(user, &weekly(30.0)).unwrap();
        svc.add_expense(user, &expense(10.0, "Food")).unwrap();
        let fitted = svc.personalized_meals(user).unwrap();
        assert_eq!(fitted.cost_limit, Some(20.0));
        assert_eq!(fitted.meals.len(), 1);
        assert_eq!(fitted.meals[0].name, "Oatmeal");
    }

    #[test]
    fn test_update_profile_preferences_only() {
        let (svc, user) = service_with_user();
        let updated = svc
            .update_profile(
                user,
                &ProfileUpdate {
                    activity_level: Some("light".to_string()),
                    goal: Some("weight_gain".to_string()),
                    address: Some("1 Main St".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.activity_level, Some(crate::models::ActivityLevel::Light));
        assert_eq!(updated.goal, Some(crate::models::Goal::WeightGain));
        assert_eq!(updated.address.as_deref(), Some("1 Main St"));
        assert!(updated.caloric_data.is_none());
    }

    #[test]
    fn test_update_profile_email_conflict() {
        let (svc, user) = service_with_user();
        svc.create_user(&NewUser {
            email: "grace@example.com".to_string(),
            name: None,
            address: None,
            phone: None,
        })
        .unwrap();

        let taken = ProfileUpdate {
            email: Some("Grace@example.com".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(matches!(
            svc.update_profile(user, &taken),
            Err(Error::Validation(_))
        ));

        let same = ProfileUpdate {
            email: Some("ADA@example.com".to_string()),
            ..ProfileUpdate::default()
        };
        assert_eq!(svc.update_profile(user, &same).unwrap().email, "ada@example.com");
    }

    #[test]
    fn test_import_meals_json() {
        let svc = NourishService::new_in_memory(SECRET).unwrap();
        let json = r#"[
            {"name": "Tofu stir fry", "total_calories": 450, "estimated_cost": 3.5,
             "ingredients": [{"name": "Tofu", "quantity": 200, "unit": "g"}]},
            {"name": "Greek salad", "total_calories": 280}
        ]"#;
        assert_eq!(svc.import_meals_json(json.as_bytes()).unwrap(), 2);
        assert_eq!(svc.list_meals(Some("salad")).unwrap().len(), 1);

        let bad = r#"[{"name": "", "total_calories": 100}]"#;
        assert!(matches!(
            svc.import_meals_json(bad.as_bytes()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(svc.get_meal(9999), Err(Error::NotFound(_))));
    }
}
