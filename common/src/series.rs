use std::cmp::Ordering;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    table::{Row, Table, TableError},
    util::parse_latency,
};

/// Where a plotted value comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    /// A plain numeric column
    Number(String),
    /// A latency column with unit suffixes, normalized to milliseconds
    Latency(String),
}

impl Column {
    pub fn number(name: &str) -> Self {
        Self::Number(name.to_owned())
    }

    pub fn latency(name: &str) -> Self {
        Self::Latency(name.to_owned())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Number(name) | Self::Latency(name) => name,
        }
    }

    pub fn value(&self, row: &Row<'_>) -> Result<f64, TableError> {
        match self {
            Self::Number(name) => row.number(name),
            Self::Latency(name) => row.parse_with(name, parse_latency),
        }
    }
}

/// Points of one series before styling, keyed by the grouping column value.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub key: Option<f64>,
    pub points: Vec<(f64, f64)>,
}

impl SeriesData {
    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|(x, _)| *x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|(_, y)| *y).collect()
    }
}

/// Splits the table into one series per distinct `group` value, ascending by
/// key, each with its points ascending by x. Without a group the whole table
/// is a single series.
pub fn select_series(
    table: &Table,
    x: &Column,
    y: &Column,
    group: Option<&str>,
) -> Result<Vec<SeriesData>, TableError> {
    let mut samples = table
        .rows()
        .map(|row| -> Result<_, TableError> {
            let key = group.map(|group| row.number(group)).transpose()?;
            Ok((key, x.value(&row)?, y.value(&row)?))
        })
        .collect::<Result<Vec<_>, TableError>>()?;

    samples.sort_by(|a, b| compare_keys(a.0, b.0).then_with(|| a.1.total_cmp(&b.1)));

    let chunks = samples.into_iter().chunk_by(|(key, _, _)| *key);
    let series = chunks
        .into_iter()
        .map(|(key, samples)| SeriesData {
            key,
            points: samples.map(|(_, x, y)| (x, y)).collect(),
        })
        .collect();
    Ok(series)
}

fn compare_keys(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        _ => Ordering::Equal,
    }
}
