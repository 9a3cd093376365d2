//! Caloric needs engine.
//!
//! BMR uses the Mifflin-St Jeor equation, TDEE scales it by an activity
//! factor, and the target shifts TDEE by a fixed daily delta for loss/gain goals.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{ActivityLevel, CaloricData, Gender, Goal, SpecificGoal};

/// Unvalidated calculator input as received from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalorieRequest {
    pub gender: Option<String>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub age: Option<i64>,
    pub activity_level: Option<String>,
    pub goal: Option<String>,
    #[serde(default)]
    pub specific_goal: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalorieInputs {
    pub gender: Gender,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: u32,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    pub specific_goal: Option<SpecificGoal>,
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::invalid_input(format!("{name} is required")))
}

fn positive(value: Option<f64>, name: &str) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        Some(_) => Err(Error::invalid_input(format!(
            "{name} must be a positive number"
        ))),
        None => Err(Error::invalid_input(format!("{name} is required"))),
    }
}

impl TryFrom<&CalorieRequest> for CalorieInputs {
    type Error = Error;

    fn try_from(req: &CalorieRequest) -> Result<Self> {
        let gender = required(req.gender.as_deref(), "gender")?.parse::<Gender>()?;
        let weight_kg = positive(req.weight_kg, "weight_kg")?;
        let height_cm = positive(req.height_cm, "height_cm")?;
        let age = match req.age {
            Some(a) if a > 0 => u32::try_from(a)
                .map_err(|_| Error::invalid_input("age is out of range"))?,
            Some(_) => return Err(Error::invalid_input("age must be a positive integer")),
            None => return Err(Error::invalid_input("age is required")),
        };
        // Calculator input errors are InvalidInput, not the profile's Validation.
        let activity_level = required(req.activity_level.as_deref(), "activity_level")?
            .parse::<ActivityLevel>()
            .map_err(|e| Error::invalid_input(e.to_string()))?;
        let goal = required(req.goal.as_deref(), "goal")?
            .parse::<Goal>()
            .map_err(|e| Error::invalid_input(e.to_string()))?;
        let specific_goal = match req.specific_goal.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(s.parse::<SpecificGoal>()?),
            _ => None,
        };
        Ok(Self {
            gender,
            weight_kg,
            height_cm,
            age,
            activity_level,
            goal,
            specific_goal,
        })
    }
}

/// Basal metabolic rate in kcal/day.
#[must_use]
pub fn bmr(gender: Gender, weight_kg: f64, height_cm: f64, age: u32) -> f64 {
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age) + gender.bmr_offset()
}

/// Total daily energy expenditure.
#[must_use]
pub fn tdee(bmr: f64, activity_level: ActivityLevel) -> f64 {
    bmr * activity_level.factor()
}

/// Goal-adjusted daily calorie target.
pub fn target_calories(tdee: f64, goal: Goal, specific_goal: Option<SpecificGoal>) -> Result<f64> {
    match goal {
        Goal::Maintain => Ok(tdee),
        Goal::WeightLoss | Goal::WeightGain => {
            let specific = specific_goal.ok_or_else(|| {
                Error::invalid_input(format!("specific_goal is required for {}", goal.as_str()))
            })?;
            if specific.direction() != goal {
                return Err(Error::invalid_input(format!(
                    "specific goal does not match {}",
                    goal.as_str()
                )));
            }
            Ok(tdee + specific.daily_delta())
        }
    }
}

pub fn compute(inputs: &CalorieInputs) -> Result<CaloricData> {
    if !inputs.weight_kg.is_finite() || inputs.weight_kg <= 0.0 {
        return Err(Error::invalid_input("weight_kg must be a positive number"));
    }
    if !inputs.height_cm.is_finite() || inputs.height_cm <= 0.0 {
        return Err(Error::invalid_input("height_cm must be a positive number"));
    }
    if inputs.age == 0 {
        return Err(Error::invalid_input("age must be a positive integer"));
    }

    let bmr = bmr(inputs.gender, inputs.weight_kg, inputs.height_cm, inputs.age);
    if !bmr.is_finite() || bmr <= 0.0 {
        return Err(Error::invalid_input(
            "inputs produce a non-positive basal metabolic rate",
        ));
    }
    let tdee = tdee(bmr, inputs.activity_level);
    let target_calories = target_calories(tdee, inputs.goal, inputs.specific_goal)?;
    if !tdee.is_finite() || !target_calories.is_finite() {
        return Err(Error::invalid_input("inputs are out of range"));
    }
    if target_calories < 0.0 {
        return Err(Error::invalid_input("inputs produce a negative calorie target"));
    }

    Ok(CaloricData {
        bmr,
        tdee,
        target_calories,
    })
}

/// Parse and compute in one step.
pub fn compute_from_request(req: &CalorieRequest) -> Result<CaloricData> {
    compute(&CalorieInputs::try_from(req)?)
}
