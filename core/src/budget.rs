//! Budget arithmetic over integer cents.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::models::{Budget, BudgetSummary, Expense};

/// Largest amount accepted, in currency units. Keeps cents well inside f64's exact range.
const MAX_AMOUNT: f64 = 1_000_000_000.0;

/// Convert a currency amount to cents, rounding half away from zero.
#[allow(clippy::cast_possible_truncation)]
pub fn to_cents(amount: f64) -> Result<i64> {
    if !amount.is_finite() || amount.abs() > MAX_AMOUNT {
        return Err(Error::validation(format!("amount {amount} is out of range")));
    }
    Ok((amount * 100.0).round() as i64)
}

#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

#[must_use]
pub fn total_spent_cents(expenses: &[Expense]) -> i64 {
    expenses.iter().map(|e| e.amount_cents).sum()
}

/// Budget amount minus everything spent. A missing budget counts as zero; may go negative.
#[must_use]
pub fn remaining_cents(budget: Option<&Budget>, expenses: &[Expense]) -> i64 {
    budget.map_or(0, |b| b.amount_cents) - total_spent_cents(expenses)
}

#[must_use]
pub fn by_category_cents(expenses: &[Expense]) -> BTreeMap<String, i64> {
    let mut totals = BTreeMap::new();
    for expense in expenses {
        *totals
            .entry(expense.category_label().to_string())
            .or_insert(0) += expense.amount_cents;
    }
    totals
}

#[must_use]
pub fn summarize(budget: Option<&Budget>, expenses: Vec<Expense>) -> BudgetSummary {
    let total = total_spent_cents(&expenses);
    let remaining = remaining_cents(budget, &expenses);
    let by_category = by_category_cents(&expenses)
        .into_iter()
        .map(|(k, v)| (k, from_cents(v)))
        .collect();
    BudgetSummary {
        budget_type: budget.map(|b| b.budget_type),
        budget_amount: from_cents(budget.map_or(0, |b| b.amount_cents)),
        total_spent: from_cents(total),
        remaining_budget: from_cents(remaining),
        by_category,
        expenses,
    }
}
