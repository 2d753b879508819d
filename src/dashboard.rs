//! Chart- and table-ready views over a snapshot.
//!
//! Nothing here renders anything: each builder composes the derivations in
//! [`crate::data::derive`] and returns plain serializable structs for the UI
//! layer to draw.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::catalog::{KEYWORDS, PREDICTIONS, SALES, SEARCH_TRENDS};
use crate::config::ViewConfig;
use crate::data::derive::{column_values, filter_by_key_set, group_by, top_n};
use crate::data::model::{Dataset, Record, Value};
use crate::error::DeriveError;
use crate::registry::Snapshot;

pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub title: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
    /// Category per bar, for colouring.
    pub color: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Everything one dashboard render needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub last_updated: String,
    pub top_keywords: BarSeries,
    pub keyword_trends: Vec<LineSeries>,
    pub market_predictions: Vec<ScatterPoint>,
    pub sales_correlation: Vec<ScatterPoint>,
    pub tables: Vec<(String, TableView)>,
}

impl Dashboard {
    pub fn build(snapshot: &Snapshot, views: &ViewConfig) -> Result<Self, DeriveError> {
        Ok(Dashboard {
            last_updated: snapshot.loaded_at().format(LAST_UPDATED_FORMAT).to_string(),
            top_keywords: top_keywords(snapshot, views.top_keywords)?,
            keyword_trends: keyword_trends(snapshot, views.trend_keywords)?,
            market_predictions: market_predictions(snapshot)?,
            sales_correlation: sales_correlation(snapshot)?,
            tables: snapshot
                .datasets()
                .map(|ds| (ds.name.clone(), table(ds)))
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Bar chart of the `n` keywords with the highest search volume.
pub fn top_keywords(snapshot: &Snapshot, n: usize) -> Result<BarSeries, DeriveError> {
    let keywords = dataset(snapshot, KEYWORDS)?;
    let top = top_n(keywords.rows(), "search_volume", n)?;
    Ok(BarSeries {
        title: format!("Top {n} Keywords by Search Volume"),
        x: texts(&top, "keyword")?,
        y: numbers(&top, "search_volume")?,
        color: texts(&top, "category")?,
    })
}

/// One search-volume line per keyword among the `n` most searched.
pub fn keyword_trends(snapshot: &Snapshot, n: usize) -> Result<Vec<LineSeries>, DeriveError> {
    let keywords = dataset(snapshot, KEYWORDS)?;
    let trends = dataset(snapshot, SEARCH_TRENDS)?;

    let top = top_n(keywords.rows(), "search_volume", n)?;
    let wanted: BTreeSet<String> = column_values(top.iter().copied(), "keyword")?
        .into_iter()
        .map(|v| v.as_text().into_owned())
        .collect();
    let rows = filter_by_key_set(trends.rows(), "keyword", &wanted)?;

    group_by(rows, "keyword")?
        .into_iter()
        .map(|(keyword, recs)| -> Result<LineSeries, DeriveError> {
            Ok(LineSeries {
                name: keyword.as_text().into_owned(),
                x: texts(&recs, "date")?,
                y: numbers(&recs, "search_volume")?,
            })
        })
        .collect()
}

/// 30-day vs 90-day predicted interest, sized by confidence.
pub fn market_predictions(snapshot: &Snapshot) -> Result<Vec<ScatterPoint>, DeriveError> {
    dataset(snapshot, PREDICTIONS)?
        .rows()
        .iter()
        .map(|rec| -> Result<ScatterPoint, DeriveError> {
            Ok(ScatterPoint {
                label: Some(text(rec, "keyword")?),
                x: number(rec, "predicted_interest_30d")?,
                y: number(rec, "predicted_interest_90d")?,
                size: number(rec, "confidence_score")?,
                group: Some(text(rec, "category")?),
                color: None,
            })
        })
        .collect()
}

/// Sales against search volume, sized by conversion rate, coloured by revenue.
pub fn sales_correlation(snapshot: &Snapshot) -> Result<Vec<ScatterPoint>, DeriveError> {
    dataset(snapshot, SALES)?
        .rows()
        .iter()
        .map(|rec| -> Result<ScatterPoint, DeriveError> {
            Ok(ScatterPoint {
                label: None,
                x: number(rec, "search_volume")?,
                y: number(rec, "sales_volume")?,
                size: number(rec, "conversion_rate")?,
                group: None,
                color: Some(number(rec, "revenue")?),
            })
        })
        .collect()
}

/// Raw table: columns in file order, typed cells.
pub fn table(dataset: &Dataset) -> TableView {
    TableView {
        columns: dataset.column_names(),
        rows: dataset.rows().iter().map(|r| r.values().to_vec()).collect(),
    }
}

// -- helpers --

fn dataset<'a>(snapshot: &'a Snapshot, name: &str) -> Result<&'a Dataset, DeriveError> {
    snapshot
        .dataset(name)
        .ok_or_else(|| DeriveError::UnknownDataset(name.to_string()))
}

fn text(rec: &Record, key: &str) -> Result<String, DeriveError> {
    rec.get(key)
        .map(|v| v.as_text().into_owned())
        .ok_or_else(|| DeriveError::absent(key))
}

fn number(rec: &Record, key: &str) -> Result<f64, DeriveError> {
    rec.get(key)
        .ok_or_else(|| DeriveError::absent(key))?
        .as_f64()
        .ok_or_else(|| DeriveError::not_numeric(key))
}

fn texts(rows: &[&Record], key: &str) -> Result<Vec<String>, DeriveError> {
    rows.iter().map(|r| text(r, key)).collect()
}

fn numbers(rows: &[&Record], key: &str) -> Result<Vec<f64>, DeriveError> {
    rows.iter().map(|r| number(r, key)).collect()
}
