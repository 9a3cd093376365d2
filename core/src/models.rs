use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};

// --- Identity ---

/// Account identifier. Minted only by storage and by the auth gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub(crate) fn from_raw(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// --- Enumerations ---

fn parse_choice<T: Copy>(value: &str, choices: &[(&str, T)]) -> Option<T> {
    let value = value.trim();
    choices
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|(_, v)| *v)
}

fn choice_names<T>(choices: &[(&str, T)]) -> String {
    choices
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    const CHOICES: [(&'static str, Self); 2] = [("male", Self::Male), ("female", Self::Female)];

    /// Sex-specific constant of the Mifflin-St Jeor equation.
    #[must_use]
    pub fn bmr_offset(self) -> f64 {
        match self {
            Self::Male => 5.0,
            Self::Female => -161.0,
        }
    }
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice(s, &Self::CHOICES).ok_or_else(|| {
            Error::invalid_input(format!(
                "Invalid gender '{s}'. Must be one of: {}",
                choice_names(&Self::CHOICES)
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    const CHOICES: [(&'static str, Self); 5] = [
        ("sedentary", Self::Sedentary),
        ("light", Self::Light),
        ("moderate", Self::Moderate),
        ("active", Self::Active),
        ("very_active", Self::VeryActive),
    ];

    /// Multiplier applied to BMR to obtain TDEE.
    #[must_use]
    pub fn factor(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Moderate => 1.55,
            Self::Active => 1.725,
            Self::VeryActive => 1.9,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sedentary => "sedentary",
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Active => "active",
            Self::VeryActive => "very_active",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice(s, &Self::CHOICES).ok_or_else(|| {
            Error::validation(format!(
                "Invalid activity level '{s}'. Must be one of: {}",
                choice_names(&Self::CHOICES)
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Maintain,
    WeightLoss,
    WeightGain,
}

impl Goal {
    const CHOICES: [(&'static str, Self); 3] = [
        ("maintain", Self::Maintain),
        ("weight_loss", Self::WeightLoss),
        ("weight_gain", Self::WeightGain),
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Maintain => "maintain",
            Self::WeightLoss => "weight_loss",
            Self::WeightGain => "weight_gain",
        }
    }
}

impl FromStr for Goal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice(s, &Self::CHOICES).ok_or_else(|| {
            Error::validation(format!(
                "Invalid goal '{s}'. Must be one of: {}",
                choice_names(&Self::CHOICES)
            ))
        })
    }
}

/// Weekly rate-of-change tier layered on a loss or gain goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecificGoal {
    /// 0.25 kg/week
    MildWeightLoss,
    /// 0.5 kg/week
    WeightLoss,
    /// 1 kg/week
    ExtremeWeightLoss,
    MildWeightGain,
    WeightGain,
    ExtremeWeightGain,
}

impl SpecificGoal {
    const CHOICES: [(&'static str, Self); 6] = [
        ("mild_weight_loss", Self::MildWeightLoss),
        ("weight_loss", Self::WeightLoss),
        ("extreme_weight_loss", Self::ExtremeWeightLoss),
        ("mild_weight_gain", Self::MildWeightGain),
        ("weight_gain", Self::WeightGain),
        ("extreme_weight_gain", Self::ExtremeWeightGain),
    ];

    /// Daily calorie adjustment relative to TDEE.
    #[must_use]
    pub fn daily_delta(self) -> f64 {
        match self {
            Self::MildWeightLoss => -250.0,
            Self::WeightLoss => -500.0,
            Self::ExtremeWeightLoss => -1000.0,
            Self::MildWeightGain => 250.0,
            Self::WeightGain => 500.0,
            Self::ExtremeWeightGain => 1000.0,
        }
    }

    /// The goal direction this tier belongs to.
    #[must_use]
    pub fn direction(self) -> Goal {
        match self {
            Self::MildWeightLoss | Self::WeightLoss | Self::ExtremeWeightLoss => Goal::WeightLoss,
            Self::MildWeightGain | Self::WeightGain | Self::ExtremeWeightGain => Goal::WeightGain,
        }
    }
}

impl FromStr for SpecificGoal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice(s, &Self::CHOICES).ok_or_else(|| {
            Error::invalid_input(format!(
                "Invalid specific goal '{s}'. Must be one of: {}",
                choice_names(&Self::CHOICES)
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetType {
    Weekly,
    Monthly,
}

impl BudgetType {
    const CHOICES: [(&'static str, Self); 2] =
        [("weekly", Self::Weekly), ("monthly", Self::Monthly)];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl FromStr for BudgetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice(s, &Self::CHOICES).ok_or_else(|| {
            Error::validation(format!(
                "Invalid budget type '{s}'. Must be one of: {}",
                choice_names(&Self::CHOICES)
            ))
        })
    }
}

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Food,
    Transport,
    Entertainment,
    Shopping,
    Other,
    Uncategorized,
}

impl ExpenseCategory {
    const CHOICES: [(&'static str, Self); 6] = [
        ("Food", Self::Food),
        ("Transport", Self::Transport),
        ("Entertainment", Self::Entertainment),
        ("Shopping", Self::Shopping),
        ("Other", Self::Other),
        (UNCATEGORIZED, Self::Uncategorized),
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transport => "Transport",
            Self::Entertainment => "Entertainment",
            Self::Shopping => "Shopping",
            Self::Other => "Other",
            Self::Uncategorized => UNCATEGORIZED,
        }
    }
}

impl FromStr for ExpenseCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice(s, &Self::CHOICES).ok_or_else(|| {
            Error::validation(format!(
                "Invalid category '{s}'. Must be one of: {}",
                choice_names(&Self::CHOICES)
            ))
        })
    }
}

// --- Money ---

fn serialize_cents<S: Serializer>(cents: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(crate::budget::from_cents(*cents))
}

// --- Users ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaloricData {
    pub bmr: f64,
    pub tdee: f64,
    pub target_calories: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Budget {
    pub budget_type: BudgetType,
    #[serde(rename = "budget_amount", serialize_with = "serialize_cents")]
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<ActivityLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caloric_data: Option<CaloricData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl NewUser {
    /// Trim fields and check the email shape.
    pub fn validated(&self) -> Result<Self> {
        Ok(Self {
            email: normalize_email(&self.email)?,
            name: clean_text(self.name.as_deref()),
            address: clean_text(self.address.as_deref()),
            phone: clean_text(self.phone.as_deref()),
        })
    }
}

/// Lowercase, trim and check the rough `local@domain.tld` shape.
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(Error::validation("email must not be empty"));
    }
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(Error::validation(format!("Invalid email '{email}'")));
    }
    Ok(email)
}

fn clean_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Partial edit of account details and preferences.
///
/// Absent fields are left unchanged. An empty string clears name, address or phone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub activity_level: Option<String>,
    pub goal: Option<String>,
}

/// Validated `ProfileUpdate`. An outer `None` leaves the column alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub name: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub activity_level: Option<ActivityLevel>,
    pub goal: Option<Goal>,
}

impl ProfileUpdate {
    pub fn parse(&self) -> Result<ProfileChanges> {
        let changes = ProfileChanges {
            email: self.email.as_deref().map(normalize_email).transpose()?,
            name: self.name.as_deref().map(|v| clean_text(Some(v))),
            address: self.address.as_deref().map(|v| clean_text(Some(v))),
            phone: self.phone.as_deref().map(|v| clean_text(Some(v))),
            activity_level: self
                .activity_level
                .as_deref()
                .map(str::parse::<ActivityLevel>)
                .transpose()?,
            goal: self.goal.as_deref().map(str::parse::<Goal>).transpose()?,
        };
        if changes == ProfileChanges::default() {
            return Err(Error::validation("Nothing to update"));
        }
        Ok(changes)
    }
}

/// Payload of the "save calories to profile" operation.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveCaloricData {
    pub bmr: f64,
    pub tdee: f64,
    pub target_calories: f64,
    pub activity_level: String,
    pub goal: String,
}

impl SaveCaloricData {
    pub fn parse(&self) -> Result<(CaloricData, ActivityLevel, Goal)> {
        for (name, value) in [
            ("bmr", self.bmr),
            ("tdee", self.tdee),
            ("target_calories", self.target_calories),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::validation(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
        let activity_level = self.activity_level.parse::<ActivityLevel>()?;
        let goal = self.goal.parse::<Goal>()?;
        Ok((
            CaloricData {
                bmr: self.bmr,
                tdee: self.tdee,
                target_calories: self.target_calories,
            },
            activity_level,
            goal,
        ))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_budget: Option<f64>,
    pub favorite_count: usize,
    pub weight_entry_count: usize,
}

// --- Budget ---

#[derive(Debug, Clone, Serialize)]
pub struct Expense {
    pub id: String,
    #[serde(rename = "amount", serialize_with = "serialize_cents")]
    pub amount_cents: i64,
    pub description: String,
    pub category: Option<ExpenseCategory>,
    pub created_at: String,
}

impl Expense {
    /// Category label used for aggregation.
    #[must_use]
    pub fn category_label(&self) -> &'static str {
        self.category.map_or(UNCATEGORIZED, ExpenseCategory::as_str)
    }
}

/// Raw expense input as received from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseRequest {
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub amount_cents: i64,
    pub description: String,
    pub category: ExpenseCategory,
}

impl NewExpense {
    pub fn parse(req: &ExpenseRequest) -> Result<Self> {
        let amount = req
            .amount
            .ok_or_else(|| Error::validation("amount is required"))?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::validation("amount must be greater than 0"));
        }
        let amount_cents = crate::budget::to_cents(amount)?;
        if amount_cents == 0 {
            return Err(Error::validation("amount must be at least 0.01"));
        }
        let description = req
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| Error::validation("description must not be empty"))?
            .to_string();
        let category = req
            .category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::validation("category is required"))?
            .parse::<ExpenseCategory>()?;
        Ok(Self {
            amount_cents,
            description,
            category,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetRequest {
    pub budget_type: Option<String>,
    pub budget_amount: Option<f64>,
}

impl BudgetRequest {
    pub fn parse(&self) -> Result<(BudgetType, i64)> {
        let budget_type = self
            .budget_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::validation("budget_type is required"))?
            .parse::<BudgetType>()?;
        let amount = self
            .budget_amount
            .ok_or_else(|| Error::validation("budget_amount is required"))?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::validation("budget_amount must not be negative"));
        }
        Ok((budget_type, crate::budget::to_cents(amount)?))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_type: Option<BudgetType>,
    pub budget_amount: f64,
    pub total_spent: f64,
    pub remaining_budget: f64,
    pub by_category: BTreeMap<String, f64>,
    pub expenses: Vec<Expense>,
}

// --- Weight tracking types ---

#[derive(Debug, Clone, Serialize)]
pub struct WeightEntry {
    pub id: String,
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewWeightEntry {
    pub date: NaiveDate,
    pub weight_kg: f64,
}

impl NewWeightEntry {
    pub fn new(date: NaiveDate, weight_kg: f64) -> Result<Self> {
        if !weight_kg.is_finite() || weight_kg <= 0.0 {
            return Err(Error::validation("weight must be greater than 0"));
        }
        Ok(Self { date, weight_kg })
    }
}

/// One unvalidated sample from a bulk import. Fields stay loose so a bad
/// row can be skipped instead of failing the whole batch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWeightSample {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub weight: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeightImportSummary {
    pub rows_received: usize,
    pub imported: usize,
    pub skipped: usize,
}

// --- Meal catalog ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meal {
    pub id: i64,
    pub name: String,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fats: f64,
    pub estimated_cost: f64,
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMeal {
    pub name: String,
    pub total_calories: f64,
    #[serde(default)]
    pub total_protein: f64,
    #[serde(default)]
    pub total_carbs: f64,
    #[serde(default)]
    pub total_fats: f64,
    #[serde(default)]
    pub estimated_cost: f64,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

/// Catalog meals that fit a user's saved calorie target and remaining budget.
#[derive(Debug, Clone, Serialize)]
pub struct MealSuggestions {
    /// `None` when no calorie target is saved.
    pub calorie_limit: Option<f64>,
    /// `None` when no budget is configured.
    pub cost_limit: Option<f64>,
    pub meals: Vec<Meal>,
}

/// Validate a catalog entry: name must not be empty, numbers must not be negative.
pub fn validate_meal(meal: &NewMeal) -> Result<()> {
    if meal.name.trim().is_empty() {
        return Err(Error::validation("Meal name must not be empty"));
    }
    for (name, value) in [
        ("total_calories", meal.total_calories),
        ("total_protein", meal.total_protein),
        ("total_carbs", meal.total_carbs),
        ("total_fats", meal.total_fats),
        ("estimated_cost", meal.estimated_cost),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::validation(format!("{name} must not be negative")));
        }
    }
    if let Some(bad) = meal
        .ingredients
        .iter()
        .find(|i| i.name.trim().is_empty() || !i.quantity.is_finite() || i.quantity < 0.0)
    {
        return Err(Error::validation(format!(
            "Invalid ingredient '{}' in meal '{}'",
            bad.name, meal.name
        )));
    }
    Ok(())
}
