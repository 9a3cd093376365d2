use anyhow::Result;
use chrono::Duration;
use tabled::{Table, Tabled, settings::Style};

use nourish_core::models::{NewUser, ProfileUpdate, User};
use nourish_core::service::NourishService;

use super::helpers::{authenticate, format_money, print_json};

pub(crate) fn cmd_user_add(
    svc: &NourishService,
    new_user: &NewUser,
    ttl_days: i64,
    json: bool,
) -> Result<()> {
    let user = svc.create_user(new_user)?;
    let token = svc.issue_token(user.id, Duration::days(ttl_days))?;

    if json {
        print_json(&serde_json::json!({ "user": user, "token": token }))?;
    } else {
        println!("Created account {} ({})", user.id, user.email);
        println!("Token (valid {ttl_days} days): {token}");
        eprintln!("Export it for later commands: export NOURISH_TOKEN={token}");
    }
    Ok(())
}

pub(crate) fn cmd_user_token(
    svc: &NourishService,
    email: &str,
    ttl_days: i64,
    json: bool,
) -> Result<()> {
    let user = svc.find_user_by_email(email)?;
    let token = svc.issue_token(user.id, Duration::days(ttl_days))?;

    if json {
        print_json(&serde_json::json!({ "user_id": user.id, "token": token }))?;
    } else {
        println!("{token}");
    }
    Ok(())
}

/// Operator edit of an account's details and preferences.
pub(crate) fn cmd_user_update(
    svc: &NourishService,
    email: &str,
    update: &ProfileUpdate,
    json: bool,
) -> Result<()> {
    let user = svc.find_user_by_email(email)?;
    let user = svc.update_profile(user.id, update)?;

    if json {
        print_json(&user)?;
    } else {
        println!("Updated account {} ({})", user.id, user.email);
    }
    Ok(())
}

pub(crate) fn cmd_user_list(svc: &NourishService, json: bool) -> Result<()> {
    let users = svc.list_users()?;

    if json {
        return print_json(&users);
    }
    if users.is_empty() {
        eprintln!("No accounts yet. Use `nourish user add <email>` to create one.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct UserRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Email")]
        email: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Target kcal")]
        target: String,
    }

    let rows: Vec<UserRow> = users
        .iter()
        .map(|u: &User| UserRow {
            id: u.id.get(),
            email: u.email.clone(),
            name: u.name.clone().unwrap_or_default(),
            target: u
                .caloric_data
                .map_or("-".into(), |c| format!("{:.0}", c.target_calories)),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_profile_show(svc: &NourishService, token: Option<&str>, json: bool) -> Result<()> {
    let user = authenticate(svc, token)?;
    let profile = svc.profile(user)?;

    if json {
        return print_json(&profile);
    }

    let u = &profile.user;
    println!("{}", u.name.as_deref().unwrap_or("(no name)"));
    println!("  Email:    {}", u.email);
    if let Some(address) = &u.address {
        println!("  Address:  {address}");
    }
    if let Some(phone) = &u.phone {
        println!("  Phone:    {phone}");
    }
    if let Some(level) = u.activity_level {
        println!("  Activity: {}", level.as_str());
    }
    if let Some(goal) = u.goal {
        println!("  Goal:     {}", goal.as_str());
    }
    match u.caloric_data {
        Some(c) => println!(
            "  Calories: BMR {:.0}, TDEE {:.0}, target {:.0}",
            c.bmr, c.tdee, c.target_calories
        ),
        None => println!("  Calories: not calculated yet"),
    }
    if let (Some(budget), Some(remaining)) = (&u.budget, profile.remaining_budget) {
        println!(
            "  Budget:   {} {} ({} remaining)",
            budget.budget_type.as_str(),
            format_money(nourish_core::budget::from_cents(budget.amount_cents)),
            format_money(remaining)
        );
    }
    println!(
        "  Favorites: {}, weight entries: {}",
        profile.favorite_count, profile.weight_entry_count
    );
    Ok(())
}
