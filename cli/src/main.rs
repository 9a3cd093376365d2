mod commands;
mod config;
mod server;

use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::commands::{
    cmd_budget_set, cmd_budget_show, cmd_calc, cmd_expense_add, cmd_expense_remove,
    cmd_favorite_add, cmd_favorite_list, cmd_favorite_remove, cmd_meal_add, cmd_meal_import,
    cmd_meal_list, cmd_meal_show, cmd_meal_suggest, cmd_profile_show, cmd_user_add, cmd_user_list,
    cmd_user_token, cmd_user_update, cmd_weight_clear, cmd_weight_delete, cmd_weight_export, cmd_weight_history, cmd_weight_import,
    cmd_weight_log,
};
use crate::config::Config;
use nourish_core::auth::DEFAULT_TOKEN_TTL_DAYS;
use nourish_core::calories::CalorieRequest;
use nourish_core::models::{ExpenseRequest, Ingredient, NewMeal, NewUser, ProfileUpdate};
use nourish_core::service::NourishService;

#[derive(Parser)]
#[command(
    name = "nourish",
    version,
    about = "Calorie targets, food budget, weight history and favorite meals"
)]
struct Cli {
    /// Account token (from `nourish user add` or `nourish user token`)
    #[arg(long, global = true, env = "NOURISH_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
    /// Compute BMR, TDEE and a goal-adjusted calorie target
    Calc {
        /// male or female
        #[arg(long)]
        gender: String,
        /// Body weight in kg
        #[arg(long)]
        weight: f64,
        /// Height in cm
        #[arg(long)]
        height: f64,
        /// Age in years
        #[arg(long)]
        age: i64,
        /// sedentary, light, moderate, active, very_active
        #[arg(long, default_value = "sedentary")]
        activity: String,
        /// maintain, weight_loss, weight_gain
        #[arg(long, default_value = "maintain")]
        goal: String,
        /// e.g. mild_weight_loss, weight_loss, extreme_weight_gain
        #[arg(long)]
        specific_goal: Option<String>,
        /// Save the result to your profile (needs --token)
        #[arg(long)]
        save: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show your profile
    Profile {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage accounts (operator)
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Browse and manage the meal catalog
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },
    /// Manage favorite meals
    Favorite {
        #[command(subcommand)]
        command: FavoriteCommands,
    },
    /// Track body weight
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },
    /// Track food spending against a budget
    Budget {
        #[command(subcommand)]
        command: BudgetCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create an account and print a token for it
    Add {
        email: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Token lifetime in days
        #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_DAYS)]
        ttl_days: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Issue a fresh token for an existing account
    Token {
        email: String,
        /// Token lifetime in days
        #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_DAYS)]
        ttl_days: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List accounts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an account's details and preferences
    Update {
        /// Current email of the account
        email: String,
        /// New email address
        #[arg(long)]
        new_email: Option<String>,
        /// Name (empty string clears it)
        #[arg(long)]
        name: Option<String>,
        /// Address (empty string clears it)
        #[arg(long)]
        address: Option<String>,
        /// Phone (empty string clears it)
        #[arg(long)]
        phone: Option<String>,
        /// sedentary, light, moderate, active, very_active
        #[arg(long)]
        activity: Option<String>,
        /// maintain, weight_loss, weight_gain
        #[arg(long)]
        goal: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MealCommands {
    /// Add a meal to the catalog
    Add {
        name: String,
        #[arg(long)]
        calories: f64,
        #[arg(long, default_value_t = 0.0)]
        protein: f64,
        #[arg(long, default_value_t = 0.0)]
        carbs: f64,
        #[arg(long, default_value_t = 0.0)]
        fats: f64,
        /// Estimated cost
        #[arg(long, default_value_t = 0.0)]
        cost: f64,
        /// Ingredient as "name:quantity[:unit]" (repeatable)
        #[arg(long = "ingredient", value_parser = parse_ingredient)]
        ingredients: Vec<Ingredient>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a JSON array of meals
    Import {
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List catalog meals
    List {
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one meal with its ingredients
    Show {
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Meals that fit your calorie target and remaining budget
    Suggest {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FavoriteCommands {
    /// Add a meal to favorites
    Add {
        meal_id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Remove a meal from favorites
    Remove {
        meal_id: i64,
        #[arg(long)]
        json: bool,
    },
    /// List favorite meals
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WeightCommands {
    /// Log a weight entry
    Log {
        /// Weight value (number)
        value: f64,
        /// Unit: kg or lbs (default: kg)
        #[arg(short, long, default_value = "kg")]
        unit: String,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weight history, oldest first
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import entries from a `Date,Weight` CSV file
    Import {
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export history as CSV (stdout by default)
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a weight entry by ID
    Delete {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the whole weight history
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BudgetCommands {
    /// Show budget, expenses and category totals
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the budget (weekly or monthly); existing expenses are kept
    Set {
        budget_type: String,
        amount: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record an expense
    Add {
        amount: f64,
        description: String,
        /// Food, Transport, Entertainment, Shopping, Other or Uncategorized
        #[arg(short, long, default_value = "Food")]
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an expense by ID
    Remove {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_ingredient(s: &str) -> Result<Ingredient, String> {
    let mut parts = s.splitn(3, ':');
    let name = parts.next().unwrap_or("").trim();
    let quantity = parts
        .next()
        .ok_or_else(|| format!("Invalid ingredient '{s}'. Use name:quantity[:unit]"))?
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Invalid quantity in ingredient '{s}'"))?;
    if name.is_empty() {
        return Err(format!("Invalid ingredient '{s}'. Name must not be empty"));
    }
    Ok(Ingredient {
        name: name.to_string(),
        quantity,
        unit: parts.next().map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
    })
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let secret = config.load_or_create_token_secret()?;
    let svc = NourishService::new(&config.db_path, &secret)?;
    let token = cli.token.as_deref();

    match cli.command {
        Commands::Serve { port, bind } => server::start_server(svc, port, &bind).await,
        Commands::Calc {
            gender,
            weight,
            height,
            age,
            activity,
            goal,
            specific_goal,
            save,
            json,
        } => {
            let req = CalorieRequest {
                gender: Some(gender),
                weight_kg: Some(weight),
                height_cm: Some(height),
                age: Some(age),
                activity_level: Some(activity),
                goal: Some(goal),
                specific_goal,
            };
            cmd_calc(&svc, &req, save, token, json)
        }
        Commands::Profile { json } => cmd_profile_show(&svc, token, json),
        Commands::User { command } => match command {
            UserCommands::Add {
                email,
                name,
                address,
                phone,
                ttl_days,
                json,
            } => cmd_user_add(
                &svc,
                &NewUser {
                    email,
                    name,
                    address,
                    phone,
                },
                ttl_days,
                json,
            ),
            UserCommands::Token {
                email,
                ttl_days,
                json,
            } => cmd_user_token(&svc, &email, ttl_days, json),
            UserCommands::List { json } => cmd_user_list(&svc, json),
            UserCommands::Update {
                email,
                new_email,
                name,
                address,
                phone,
                activity,
                goal,
                json,
            } => cmd_user_update(
                &svc,
                &email,
                &ProfileUpdate {
                    email: new_email,
                    name,
                    address,
                    phone,
                    activity_level: activity,
                    goal,
                },
                json,
            ),
        },
        Commands::Meal { command } => match command {
            MealCommands::Add {
                name,
                calories,
                protein,
                carbs,
                fats,
                cost,
                ingredients,
                json,
            } => cmd_meal_add(
                &svc,
                &NewMeal {
                    name,
                    total_calories: calories,
                    total_protein: protein,
                    total_carbs: carbs,
                    total_fats: fats,
                    estimated_cost: cost,
                    ingredients,
                },
                json,
            ),
            MealCommands::Import { file, json } => cmd_meal_import(&svc, &file, json),
            MealCommands::List { search, json } => cmd_meal_list(&svc, search.as_deref(), json),
            MealCommands::Show { id, json } => cmd_meal_show(&svc, id, json),
            MealCommands::Suggest { json } => cmd_meal_suggest(&svc, token, json),
        },
        Commands::Favorite { command } => match command {
            FavoriteCommands::Add { meal_id, json } => cmd_favorite_add(&svc, meal_id, token, json),
            FavoriteCommands::Remove { meal_id, json } => {
                cmd_favorite_remove(&svc, meal_id, token, json)
            }
            FavoriteCommands::List { json } => cmd_favorite_list(&svc, token, json),
        },
        Commands::Weight { command } => match command {
            WeightCommands::Log {
                value,
                unit,
                date,
                json,
            } => cmd_weight_log(&svc, value, &unit, date, token, json),
            WeightCommands::History { json } => cmd_weight_history(&svc, token, json),
            WeightCommands::Import { file, json } => cmd_weight_import(&svc, &file, token, json),
            WeightCommands::Export { output } => cmd_weight_export(&svc, output.as_deref(), token),
            WeightCommands::Delete { id, json } => cmd_weight_delete(&svc, &id, token, json),
            WeightCommands::Clear { yes, json } => cmd_weight_clear(&svc, yes, token, json),
        },
        Commands::Budget { command } => match command {
            BudgetCommands::Show { json } => cmd_budget_show(&svc, token, json),
            BudgetCommands::Set {
                budget_type,
                amount,
                json,
            } => cmd_budget_set(&svc, &budget_type, amount, token, json),
            BudgetCommands::Add {
                amount,
                description,
                category,
                json,
            } => cmd_expense_add(
                &svc,
                &ExpenseRequest {
                    amount: Some(amount),
                    description: Some(description),
                    category: Some(category),
                },
                token,
                json,
            ),
            BudgetCommands::Remove { id, json } => cmd_expense_remove(&svc, &id, token, json),
        },
    }
}
