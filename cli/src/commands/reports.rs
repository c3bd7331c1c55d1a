use anyhow::Result;
use std::process;
use tabled::Tabled;

use loseit_core::reports::FoodQuery;
use loseit_core::service::HealthService;

use super::DateArgs;
use super::helpers::{fmt_opt, fmt_opt_int, no_neg_zero, print_json, print_table, truncate};

fn exit_empty(what: &str) -> ! {
    eprintln!("No {what} found");
    process::exit(2);
}

pub(crate) fn cmd_weight(service: &HealthService, args: &DateArgs, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct WeightRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Body fat %")]
        body_fat: String,
    }

    let report = service.weight(&args.selection(service)?)?;
    if json {
        return print_json(&report);
    }
    if report.records.is_empty() {
        exit_empty("weight entries");
    }

    let rows: Vec<WeightRow> = report
        .records
        .iter()
        .map(|r| WeightRow {
            date: r.date.clone(),
            weight: fmt_opt(r.weight, 1),
            body_fat: fmt_opt(r.body_fat, 1),
        })
        .collect();
    print_table(&rows, 1);

    if let Some(s) = &report.summary {
        let change = no_neg_zero(s.weight_change);
        println!(
            "  avg {:.1} | min {:.1} | max {:.1} | change {change:+.1}",
            s.avg_weight, s.min_weight, s.max_weight
        );
    }
    Ok(())
}

pub(crate) fn cmd_calories(service: &HealthService, args: &DateArgs, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct CalorieTableRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Food")]
        food: String,
        #[tabled(rename = "Exercise")]
        exercise: String,
        #[tabled(rename = "Budget")]
        budget: String,
        #[tabled(rename = "TDEE")]
        tdee: String,
        #[tabled(rename = "Net")]
        net: String,
        #[tabled(rename = "+/- Budget")]
        surplus: String,
    }

    let report = service.calories(&args.selection(service)?)?;
    if json {
        return print_json(&report);
    }
    if report.records.is_empty() {
        exit_empty("calorie entries");
    }

    let rows: Vec<CalorieTableRow> = report
        .records
        .iter()
        .map(|r| CalorieTableRow {
            date: r.record.date.clone(),
            food: fmt_opt(r.record.food_calories, 0),
            exercise: fmt_opt(r.record.exercise_calories, 0),
            budget: fmt_opt(r.record.calorie_budget, 0),
            tdee: fmt_opt(r.record.tdee, 0),
            net: format!("{:.0}", no_neg_zero(r.net_calories)),
            surplus: format!("{:+.0}", no_neg_zero(r.surplus_deficit)),
        })
        .collect();
    print_table(&rows, 1);

    if let Some(s) = &report.summary {
        println!(
            "  avg food {:.0} | avg net {:.0} | total +/- {:+.0} | {} day(s) over, {} under",
            s.avg_food_calories,
            s.avg_net_calories,
            no_neg_zero(s.total_surplus_deficit),
            s.days_over_budget,
            s.days_under_budget
        );
    }
    Ok(())
}

pub(crate) fn cmd_activity(service: &HealthService, args: &DateArgs, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct ActivityRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Steps")]
        steps: String,
        #[tabled(rename = "Sleep (h)")]
        sleep: String,
        #[tabled(rename = "Exercise (min)")]
        minutes: String,
        #[tabled(rename = "Sessions")]
        sessions: String,
    }

    let report = service.activity(&args.selection(service)?)?;
    if json {
        return print_json(&report);
    }
    if report.records.is_empty() {
        exit_empty("activity entries");
    }

    let rows: Vec<ActivityRow> = report
        .records
        .iter()
        .map(|r| ActivityRow {
            date: r.date.clone(),
            steps: fmt_opt_int(r.steps),
            sleep: fmt_opt(r.sleep_hours, 1),
            minutes: fmt_opt(r.exercise_minutes, 0),
            sessions: fmt_opt_int(r.exercise_count),
        })
        .collect();
    print_table(&rows, 1);

    if let Some(s) = &report.summary {
        println!(
            "  avg steps {} | avg sleep {}h | {:.0} exercise min over {} day(s)",
            fmt_opt(s.avg_steps, 0),
            fmt_opt(s.avg_sleep_hours, 1),
            s.total_exercise_minutes,
            s.days_exercised
        );
    }
    Ok(())
}

pub(crate) fn cmd_macros(service: &HealthService, args: &DateArgs, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct MacroTableRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Protein (g)")]
        protein: String,
        #[tabled(rename = "Carbs (g)")]
        carbs: String,
        #[tabled(rename = "Fiber (g)")]
        fiber: String,
        #[tabled(rename = "Protein kcal")]
        protein_kcal: String,
        #[tabled(rename = "Carb kcal")]
        carb_kcal: String,
    }

    let report = service.macros(&args.selection(service)?)?;
    if json {
        return print_json(&report);
    }
    if report.records.is_empty() {
        exit_empty("macro entries");
    }

    let rows: Vec<MacroTableRow> = report
        .records
        .iter()
        .map(|r| MacroTableRow {
            date: r.record.date.clone(),
            protein: fmt_opt(r.record.protein_grams, 0),
            carbs: fmt_opt(r.record.carbs_grams, 0),
            fiber: fmt_opt(r.record.fiber_grams, 0),
            protein_kcal: fmt_opt(r.protein_calories, 0),
            carb_kcal: fmt_opt(r.carb_calories, 0),
        })
        .collect();
    print_table(&rows, 1);

    if let Some(s) = &report.summary {
        println!(
            "  avg protein {}g | avg carbs {}g | avg fiber {}g",
            fmt_opt(s.avg_protein, 0),
            fmt_opt(s.avg_carbs, 0),
            fmt_opt(s.avg_fiber, 0)
        );
    }
    Ok(())
}

pub(crate) fn cmd_food(
    service: &HealthService,
    args: &DateArgs,
    meal: Option<String>,
    search: Option<String>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "Food")]
        name: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Calories")]
        calories: String,
    }

    let query = FoodQuery {
        selection: args.optional_selection(service)?,
        meal,
        search,
        limit,
    };
    let report = service.food_logs(&query)?;
    if json {
        return print_json(&report);
    }
    if report.records.is_empty() {
        exit_empty("food entries");
    }

    let rows: Vec<FoodRow> = report
        .records
        .iter()
        .map(|f| FoodRow {
            date: f.date.clone(),
            meal: f.meal.clone(),
            name: truncate(&f.food_name, 40),
            quantity: match (f.quantity, f.units.as_deref()) {
                (Some(q), Some(u)) => format!("{q} {u}"),
                (Some(q), None) => q.to_string(),
                (None, _) => "-".to_string(),
            },
            calories: fmt_opt(f.calories, 0),
        })
        .collect();
    print_table(&rows, 3);

    if let Some(s) = &report.summary {
        let by_meal = s
            .by_meal
            .iter()
            .map(|(meal, cal)| format!("{meal} {cal:.0}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {} entries | {:.0} kcal | {by_meal}",
            s.total_entries, s.total_calories
        );
    }
    Ok(())
}

pub(crate) fn cmd_summary(service: &HealthService, date: &str, json: bool) -> Result<()> {
    let summary = service.daily_summary(date)?;
    if json {
        return print_json(&summary);
    }

    let nothing = summary.markers.is_none()
        && summary.calories.is_none()
        && summary.activity.is_none()
        && summary.macros.is_none()
        && summary.food_summary.is_none();
    if nothing {
        eprintln!("No data for {}", summary.date);
        process::exit(2);
    }

    println!("=== {} ===\n", summary.date);

    if let Some(m) = &summary.markers {
        println!(
            "  WEIGHT     {} | body fat {}%",
            fmt_opt(m.weight, 1),
            fmt_opt(m.body_fat, 1)
        );
    }
    if let Some(c) = &summary.calories {
        println!(
            "  CALORIES   food {} | exercise {} | budget {} | net {:.0} | {:+.0} vs budget",
            fmt_opt(c.food_calories, 0),
            fmt_opt(c.exercise_calories, 0),
            fmt_opt(c.calorie_budget, 0),
            no_neg_zero(c.net_calories),
            no_neg_zero(c.surplus_deficit)
        );
    }
    if let Some(a) = &summary.activity {
        println!(
            "  ACTIVITY   {} steps | {}h sleep | {} min exercise",
            fmt_opt_int(a.steps),
            fmt_opt(a.sleep_hours, 1),
            fmt_opt(a.exercise_minutes, 0)
        );
    }
    if let Some(m) = &summary.macros {
        println!(
            "  MACROS     P:{}g C:{}g fiber:{}g",
            fmt_opt(m.protein_grams, 0),
            fmt_opt(m.carbs_grams, 0),
            fmt_opt(m.fiber_grams, 0)
        );
    }
    if let Some(f) = &summary.food_summary {
        println!("  FOOD       {} item(s)", f.total_items);
        for (meal, cal) in &f.by_meal {
            println!("    {meal}: {cal:.0} kcal");
        }
    }
    Ok(())
}
