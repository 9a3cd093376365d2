use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use nourish_core::calories::CalorieRequest;
use nourish_core::models::SaveCaloricData;
use nourish_core::service::NourishService;

use super::helpers::{authenticate, print_json};

pub(crate) fn cmd_calc(
    svc: &NourishService,
    req: &CalorieRequest,
    save: bool,
    token: Option<&str>,
    json: bool,
) -> Result<()> {
    let data = svc.compute_calories(req)?;

    if save {
        let user = authenticate(svc, token)?;
        svc.save_calories(
            user,
            &SaveCaloricData {
                bmr: data.bmr,
                tdee: data.tdee,
                target_calories: data.target_calories,
                activity_level: req.activity_level.clone().unwrap_or_default(),
                goal: req.goal.clone().unwrap_or_default(),
            },
        )?;
    }

    if json {
        print_json(&data)?;
        return Ok(());
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Metric")]
        metric: &'static str,
        #[tabled(rename = "kcal/day")]
        value: String,
    }

    let rows = vec![
        Row {
            metric: "BMR",
            value: format!("{:.0}", data.bmr),
        },
        Row {
            metric: "TDEE",
            value: format!("{:.0}", data.tdee),
        },
        Row {
            metric: "Target",
            value: format!("{:.0}", data.target_calories),
        },
    ];
    println!("{}", Table::new(&rows).with(Style::rounded()));
    if save {
        println!("Saved to profile.");
    }
    Ok(())
}
