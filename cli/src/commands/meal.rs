use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};

use nourish_core::models::NewMeal;
use nourish_core::service::NourishService;

use super::helpers::{authenticate, format_money, print_json, print_meal_table};

pub(crate) fn cmd_meal_add(svc: &NourishService, meal: &NewMeal, json: bool) -> Result<()> {
    let meal = svc.add_meal(meal)?;

    if json {
        print_json(&meal)?;
    } else {
        println!(
            "Added meal {} \"{}\" ({:.0} kcal, cost {})",
            meal.id,
            meal.name,
            meal.total_calories,
            format_money(meal.estimated_cost)
        );
    }
    Ok(())
}

pub(crate) fn cmd_meal_import(svc: &NourishService, file: &Path, json: bool) -> Result<()> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
    );
    let count = svc.import_meals_json(reader)?;

    if json {
        print_json(&serde_json::json!({ "imported": count }))?;
    } else {
        println!("Imported {count} meals from {}", file.display());
    }
    Ok(())
}

pub(crate) fn cmd_meal_list(svc: &NourishService, search: Option<&str>, json: bool) -> Result<()> {
    let meals = svc.list_meals(search)?;

    if json {
        print_json(&meals)?;
    } else if meals.is_empty() {
        eprintln!("No meals found.");
    } else {
        print_meal_table(&meals);
    }
    Ok(())
}

pub(crate) fn cmd_meal_show(svc: &NourishService, id: i64, json: bool) -> Result<()> {
    let meal = svc.get_meal(id)?;

    if json {
        return print_json(&meal);
    }

    print_meal_table(std::slice::from_ref(&meal));
    if !meal.ingredients.is_empty() {
        println!("Ingredients:");
        for i in &meal.ingredients {
            println!(
                "  - {} {}{}",
                i.name,
                i.quantity,
                i.unit.as_deref().unwrap_or("g")
            );
        }
    }
    Ok(())
}

pub(crate) fn cmd_meal_suggest(svc: &NourishService, token: Option<&str>, json: bool) -> Result<()> {
    let user = authenticate(svc, token)?;
    let suggestions = svc.personalized_meals(user)?;

    if json {
        return print_json(&suggestions);
    }

    let calories = suggestions
        .calorie_limit
        .map_or("no calorie target".to_string(), |c| format!("up to {c:.0} kcal"));
    let cost = suggestions
        .cost_limit
        .map_or("no budget".to_string(), |c| format!("up to {}", format_money(c)));
    eprintln!("Meals with {calories}, {cost}");
    if suggestions.meals.is_empty() {
        eprintln!("No meals fit right now.");
    } else {
        print_meal_table(&suggestions.meals);
    }
    Ok(())
}

pub(crate) fn cmd_favorite_add(
    svc: &NourishService,
    meal_id: i64,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    let user = authenticate(svc, token)?;
    svc.add_favorite(user, meal_id)?;

    if json {
        print_json(&serde_json::json!({ "favorited": meal_id }))?;
    } else {
        println!("Added meal {meal_id} to favorites");
    }
    Ok(())
}

pub(crate) fn cmd_favorite_remove(
    svc: &NourishService,
    meal_id: i64,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    let user = authenticate(svc, token)?;
    svc.remove_favorite(user, meal_id)?;

    if json {
        print_json(&serde_json::json!({ "unfavorited": meal_id }))?;
    } else {
        println!("Removed meal {meal_id} from favorites");
    }
    Ok(())
}

pub(crate) fn cmd_favorite_list(svc: &NourishService, token: Option<&str>, json: bool) -> Result<()> {
    let user = authenticate(svc, token)?;
    let meals = svc.list_favorites(user)?;

    if json {
        print_json(&meals)?;
    } else if meals.is_empty() {
        eprintln!("No favorite meals yet. Use `nourish favorite add <meal-id>`.");
    } else {
        print_meal_table(&meals);
    }
    Ok(())
}
