use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use rand::prelude::*;

/// Roughly normal noise with mean 0: the sum of twelve uniforms on [0, 1)
/// has variance 1.
fn jitter(rng: &mut StdRng, std_dev: f64) -> f64 {
    let sum: f64 = (0..12).map(|_| rng.gen::<f64>()).sum();
    (sum - 6.0) * std_dev
}

const KEYWORDS: [(&str, &str); 12] = [
    ("wireless earbuds", "electronics"),
    ("air fryer", "home"),
    ("running shoes", "fashion"),
    ("standing desk", "office"),
    ("protein powder", "health"),
    ("smart watch", "electronics"),
    ("yoga mat", "health"),
    ("robot vacuum", "home"),
    ("linen shirt", "fashion"),
    ("mechanical keyboard", "office"),
    ("electric kettle", "home"),
    ("trail backpack", "outdoor"),
];

const TREND_DAYS: u64 = 30;

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("generated_data"));
    fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = StdRng::seed_from_u64(42);
    let volumes: Vec<i64> = KEYWORDS
        .iter()
        .map(|_| rng.gen_range(5_000..120_000))
        .collect();

    write_csv(
        &out_dir,
        "trendsense_keywords.csv",
        &["keyword", "category", "search_volume"],
        KEYWORDS
            .iter()
            .zip(&volumes)
            .map(|(&(kw, cat), vol)| vec![kw.to_string(), cat.to_string(), vol.to_string()])
            .collect(),
    )?;

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;
    let mut trends = Vec::new();
    for (&(kw, _), &base) in KEYWORDS.iter().zip(&volumes) {
        let daily = base as f64 / TREND_DAYS as f64;
        let drift = jitter(&mut rng, 0.01);
        for day in 0..TREND_DAYS {
            let date = start
                .checked_add_days(Days::new(day))
                .context("date out of range")?;
            let level = daily * (1.0 + drift * day as f64) + jitter(&mut rng, daily * 0.1);
            trends.push(vec![
                kw.to_string(),
                date.format("%Y-%m-%d").to_string(),
                (level.max(0.0).round() as i64).to_string(),
            ]);
        }
    }
    write_csv(
        &out_dir,
        "trendsense_search_trends.csv",
        &["keyword", "date", "search_volume"],
        trends,
    )?;

    write_csv(
        &out_dir,
        "trendsense_market_predictions.csv",
        &[
            "keyword",
            "category",
            "predicted_interest_30d",
            "predicted_interest_90d",
            "confidence_score",
        ],
        KEYWORDS
            .iter()
            .map(|&(kw, cat)| {
                let p30: f64 = rng.gen_range(20.0..100.0);
                let p90 = (p30 + jitter(&mut rng, 15.0)).clamp(0.0, 100.0);
                vec![
                    kw.to_string(),
                    cat.to_string(),
                    format!("{p30:.2}"),
                    format!("{p90:.2}"),
                    format!("{:.3}", rng.gen_range(0.5..0.99)),
                ]
            })
            .collect(),
    )?;

    write_csv(
        &out_dir,
        "trendsense_sales_correlation.csv",
        &["keyword", "search_volume", "sales_volume", "conversion_rate", "revenue"],
        KEYWORDS
            .iter()
            .zip(&volumes)
            .map(|(&(kw, _), &vol)| {
                let rate: f64 = rng.gen_range(0.005..0.06);
                let sales = (vol as f64 * rate).round();
                let price: f64 = rng.gen_range(15.0..250.0);
                vec![
                    kw.to_string(),
                    vol.to_string(),
                    sales.to_string(),
                    format!("{rate:.4}"),
                    format!("{:.2}", sales * price),
                ]
            })
            .collect(),
    )?;

    let age_groups = ["18-24", "25-34", "35-44", "45-54", "55+"];
    let regions = ["north", "south", "east", "west"];
    let mut consumer = Vec::new();
    for &(kw, _) in &KEYWORDS {
        for &age in &age_groups {
            let region = regions.choose(&mut rng).copied().unwrap_or("north");
            consumer.push(vec![
                kw.to_string(),
                age.to_string(),
                region.to_string(),
                format!("{:.3}", rng.gen_range(0.01..0.2)),
                format!("{:.1}", rng.gen_range(1.0..12.0)),
            ]);
        }
    }
    write_csv(
        &out_dir,
        "trendsense_consumer_behavior.csv",
        &["keyword", "age_group", "region", "click_through_rate", "avg_session_minutes"],
        consumer,
    )?;

    println!("Wrote sample TrendSense exports to {}", out_dir.display());
    Ok(())
}

fn write_csv(dir: &Path, file: &str, header: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
    let path = dir.join(file);
    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(header)?;
    for row in &rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    println!("  {} ({} rows)", path.display(), rows.len());
    Ok(())
}
