use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nourish_core::models::RawWeightSample;
use nourish_core::service::NourishService;

use super::helpers::{authenticate, parse_date, print_json};

const LBS_PER_KG: f64 = 2.20462;
const KG_PER_LB: f64 = 0.453_592;

pub(crate) fn cmd_weight_log(
    svc: &NourishService,
    value: f64,
    unit: &str,
    date: Option<String>,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    let user = authenticate(svc, token)?;

    let weight_kg = match unit.to_lowercase().as_str() {
        "kg" => value,
        "lbs" | "lb" => {
            let kg = value * KG_PER_LB;
            eprintln!("Converting {value:.1} lbs → {kg:.2} kg");
            kg
        }
        _ => bail!("Invalid unit '{unit}'. Use 'kg' or 'lbs'"),
    };

    let date = parse_date(date)?;
    let entry = svc.append_weight(
        user,
        &RawWeightSample {
            date: Some(date.format("%Y-%m-%d").to_string()),
            weight: Some(serde_json::json!(weight_kg)),
        },
    )?;

    if json {
        print_json(&entry)?;
    } else {
        println!(
            "Logged {:.1} kg ({:.1} lbs) for {}",
            entry.weight_kg,
            entry.weight_kg * LBS_PER_KG,
            entry.date.format("%Y-%m-%d")
        );
    }
    Ok(())
}

pub(crate) fn cmd_weight_history(svc: &NourishService, token: Option<&str>, json: bool) -> Result<()> {
    let user = authenticate(svc, token)?;
    let entries = svc.list_weights(user)?;

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        eprintln!("No weight entries found. Use `nourish weight log` to record your weight.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct WeightRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight (kg)")]
        kg: String,
        #[tabled(rename = "Weight (lbs)")]
        lbs: String,
    }

    let rows: Vec<WeightRow> = entries
        .iter()
        .map(|e| WeightRow {
            id: e.id.clone(),
            date: e.date.format("%Y-%m-%d").to_string(),
            kg: format!("{:.1}", e.weight_kg),
            lbs: format!("{:.1}", e.weight_kg * LBS_PER_KG),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_weight_import(
    svc: &NourishService,
    file: &Path,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    let user = authenticate(svc, token)?;
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
    );
    let summary = svc.import_weights_csv(user, reader)?;

    if json {
        print_json(&summary)?;
    } else {
        println!(
            "Imported {} of {} rows from {}",
            summary.imported,
            summary.rows_received,
            file.display()
        );
        if summary.skipped > 0 {
            eprintln!("Skipped {} malformed rows", summary.skipped);
        }
    }
    Ok(())
}

pub(crate) fn cmd_weight_export(
    svc: &NourishService,
    output: Option<&Path>,
    token: Option<&str>,
) -> Result<()> {
    let user = authenticate(svc, token)?;
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            svc.export_weights_csv(user, BufWriter::new(file))?;
            eprintln!("Wrote {}", path.display());
        }
        None => svc.export_weights_csv(user, io::stdout().lock())?,
    }
    Ok(())
}

pub(crate) fn cmd_weight_delete(
    svc: &NourishService,
    id: &str,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    let user = authenticate(svc, token)?;
    svc.remove_weight(user, id)?;

    if json {
        print_json(&serde_json::json!({ "deleted": id }))?;
    } else {
        println!("Deleted weight entry {id}");
    }
    Ok(())
}

pub(crate) fn cmd_weight_clear(
    svc: &NourishService,
    yes: bool,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    if !yes {
        bail!("This deletes your whole weight history. Re-run with --yes to confirm");
    }
    let user = authenticate(svc, token)?;
    let removed = svc.remove_all_weights(user)?;

    if json {
        print_json(&serde_json::json!({ "deleted": removed }))?;
    } else {
        println!("Deleted {removed} weight entries");
    }
    Ok(())
}
