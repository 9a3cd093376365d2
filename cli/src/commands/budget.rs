use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nourish_core::budget::from_cents;
use nourish_core::models::{BudgetRequest, ExpenseRequest};
use nourish_core::service::NourishService;

use super::helpers::{authenticate, format_money, print_json, truncate};

pub(crate) fn cmd_budget_show(svc: &NourishService, token: Option<&str>, json: bool) -> Result<()> {
    let user = authenticate(svc, token)?;
    let summary = svc.budget_summary(user)?;

    if json {
        return print_json(&summary);
    }

    match summary.budget_type {
        Some(t) => println!(
            "{} budget: {}  spent: {}  remaining: {}",
            t.as_str(),
            format_money(summary.budget_amount),
            format_money(summary.total_spent),
            format_money(summary.remaining_budget)
        ),
        None => {
            eprintln!("No budget set. Use `nourish budget set <weekly|monthly> <amount>`.");
            return Ok(());
        }
    }

    if summary.expenses.is_empty() {
        return Ok(());
    }

    #[derive(Tabled)]
    struct ExpenseRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Description")]
        description: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Amount")]
        amount: String,
    }

    let rows: Vec<ExpenseRow> = summary
        .expenses
        .iter()
        .map(|e| ExpenseRow {
            id: e.id.clone(),
            description: truncate(&e.description, 30),
            category: e.category_label().to_string(),
            amount: format_money(from_cents(e.amount_cents)),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    println!("By category:");
    for (category, total) in &summary.by_category {
        println!("  {category:<14} {:>10}", format_money(*total));
    }
    Ok(())
}

pub(crate) fn cmd_budget_set(
    svc: &NourishService,
    budget_type: &str,
    amount: f64,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    let user = authenticate(svc, token)?;
    svc.set_budget(
        user,
        &BudgetRequest {
            budget_type: Some(budget_type.to_string()),
            budget_amount: Some(amount),
        },
    )?;

    if json {
        print_json(&svc.budget_summary(user)?)?;
    } else {
        println!(
            "Budget set to {} {}",
            budget_type.to_lowercase(),
            format_money(amount)
        );
    }
    Ok(())
}

pub(crate) fn cmd_expense_add(
    svc: &NourishService,
    req: &ExpenseRequest,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    let user = authenticate(svc, token)?;
    let expense = svc.add_expense(user, req)?;

    if json {
        print_json(&expense)?;
    } else {
        println!(
            "Added expense {} ({} {}). Remaining: {}",
            expense.id,
            format_money(from_cents(expense.amount_cents)),
            expense.category_label(),
            format_money(svc.remaining_budget(user)?)
        );
    }
    Ok(())
}

pub(crate) fn cmd_expense_remove(
    svc: &NourishService,
    id: &str,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    let user = authenticate(svc, token)?;
    svc.remove_expense(user, id)?;

    if json {
        print_json(&serde_json::json!({ "deleted": id }))?;
    } else {
        println!(
            "Deleted expense {id}. Remaining: {}",
            format_money(svc.remaining_budget(user)?)
        );
    }
    Ok(())
}
