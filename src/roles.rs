use std::collections::HashMap;

use crate::error::RoleAssignmentError;
use crate::table::{Cell, Column, ColumnKind, Table};

/// How many distinct values a column may have before a histogram stops
/// counting them individually and switches to binning.
const DISCRETE_LIMIT: usize = 20;

/// Default bin count for the continuous histogram path.
pub const DEFAULT_BINS: usize = 30;

/// The chart kind a role assignment is being resolved for. Histogram
/// carries its bin count because the continuous path needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
    Histogram { bins: usize },
    Pie,
}

/// Caller-supplied column names. Both must name existing columns to be
/// honored; anything else falls back to automatic inference.
#[derive(Debug, Clone, Default)]
pub struct Hints {
    pub category: Option<String>,
    pub value: Option<String>,
}

/// One column in its assigned role. `kind` tells the renderer whether the
/// series plots on a continuous axis or as ordinal positions with labels.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRole {
    pub name: String,
    pub kind: ColumnKind,
    pub cells: Vec<Cell>,
}

impl SeriesRole {
    fn from_column(column: &Column) -> Self {
        SeriesRole {
            name: column.name.clone(),
            kind: column.kind(),
            cells: column.cells.clone(),
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.cells.iter().map(|c| c.to_string()).collect()
    }
}

/// Label/magnitude pairs for a pie chart, already filtered to positive
/// magnitudes.
#[derive(Debug, Clone, PartialEq)]
pub struct PieData {
    pub label_name: String,
    pub value_name: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// The two histogram strategies.
#[derive(Debug, Clone, PartialEq)]
pub enum HistogramData {
    /// Raw numeric series to be binned by the renderer.
    Continuous {
        name: String,
        values: Vec<f64>,
        bins: usize,
    },
    /// Pre-counted categories: value->count pairs, or group->sum on the
    /// grouped fallback path.
    Discrete {
        name: String,
        categories: Vec<String>,
        counts: Vec<f64>,
    },
}

/// The resolver's decision for one chart invocation. Built fresh per
/// request, consumed by the renderer, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleAssignment {
    /// Paired category/value series (bar, line).
    Xy {
        category: SeriesRole,
        value: SeriesRole,
    },
    Pie(PieData),
    Histogram(HistogramData),
}

/// Resolve which columns play which role for the given chart kind.
pub fn resolve(
    table: &Table,
    kind: ChartKind,
    hints: &Hints,
) -> Result<RoleAssignment, RoleAssignmentError> {
    match kind {
        ChartKind::Bar | ChartKind::Line => {
            let (category, value) = resolve_xy(table, hints)?;
            Ok(RoleAssignment::Xy { category, value })
        }
        ChartKind::Pie => Ok(RoleAssignment::Pie(resolve_pie(table, hints)?)),
        ChartKind::Histogram { bins } => Ok(RoleAssignment::Histogram(resolve_histogram(
            table,
            hints.value.as_deref(),
            bins,
        )?)),
    }
}

enum PairSelection<'a> {
    Pair {
        category: &'a Column,
        value: &'a Column,
    },
    Single {
        value: &'a Column,
    },
}

/// Shared two-column rule for bar, line, and pie.
///
/// Hints naming two existing columns win verbatim, in the given order.
/// Otherwise the first two columns are taken, and if exactly one of them is
/// categorical it becomes the category regardless of position. A lone
/// column becomes the value series.
fn select_pair<'a>(
    table: &'a Table,
    hints: &Hints,
) -> Result<PairSelection<'a>, RoleAssignmentError> {
    if table.columns.is_empty() || table.row_count() == 0 {
        return Err(RoleAssignmentError::InsufficientData);
    }

    if let (Some(cat_name), Some(val_name)) = (&hints.category, &hints.value) {
        if let (Some(category), Some(value)) = (table.column(cat_name), table.column(val_name)) {
            return Ok(PairSelection::Pair { category, value });
        }
    }

    if table.columns.len() >= 2 {
        let first = &table.columns[0];
        let second = &table.columns[1];
        let (category, value) = match (first.kind(), second.kind()) {
            (ColumnKind::Numeric, ColumnKind::Categorical) => (second, first),
            _ => (first, second),
        };
        Ok(PairSelection::Pair { category, value })
    } else {
        Ok(PairSelection::Single {
            value: &table.columns[0],
        })
    }
}

/// Category/value roles for bar and line charts.
pub fn resolve_xy(
    table: &Table,
    hints: &Hints,
) -> Result<(SeriesRole, SeriesRole), RoleAssignmentError> {
    match select_pair(table, hints)? {
        PairSelection::Pair { category, value } => Ok((
            SeriesRole::from_column(category),
            SeriesRole::from_column(value),
        )),
        PairSelection::Single { value } => {
            let index = SeriesRole {
                name: "index".to_string(),
                kind: ColumnKind::Numeric,
                cells: (0..value.cells.len())
                    .map(|i| Cell::Number(i as f64))
                    .collect(),
            };
            Ok((index, SeriesRole::from_column(value)))
        }
    }
}

/// Label/magnitude roles for a pie chart, with the positivity filter
/// applied: rows with a null or non-positive magnitude are dropped.
pub fn resolve_pie(table: &Table, hints: &Hints) -> Result<PieData, RoleAssignmentError> {
    let (label_name, value_name, raw_labels, magnitude_cells) = match select_pair(table, hints)? {
        PairSelection::Pair { category, value } => (
            category.name.clone(),
            value.name.clone(),
            category.cells.iter().map(|c| c.to_string()).collect(),
            value.cells.clone(),
        ),
        PairSelection::Single { value } => {
            let labels: Vec<String> = (1..=value.cells.len())
                .map(|i| format!("Category {}", i))
                .collect();
            (
                "category".to_string(),
                value.name.clone(),
                labels,
                value.cells.clone(),
            )
        }
    };

    let mut labels = Vec::with_capacity(raw_labels.len());
    let mut values = Vec::with_capacity(magnitude_cells.len());
    for (label, cell) in raw_labels.into_iter().zip(magnitude_cells.iter()) {
        if cell.is_null() {
            continue;
        }
        let magnitude = cell
            .as_number()
            .ok_or_else(|| RoleAssignmentError::NonNumeric(value_name.clone()))?;
        if magnitude <= 0.0 {
            continue;
        }
        labels.push(label);
        values.push(magnitude);
    }

    if values.is_empty() {
        return Err(RoleAssignmentError::NoPositiveValues);
    }

    Ok(PieData {
        label_name,
        value_name,
        labels,
        values,
    })
}

/// Histogram routing: grouped fallback, then discrete vs continuous.
pub fn resolve_histogram(
    table: &Table,
    column: Option<&str>,
    bins: usize,
) -> Result<HistogramData, RoleAssignmentError> {
    if table.columns.is_empty() || table.row_count() == 0 {
        return Err(RoleAssignmentError::InsufficientData);
    }

    // Compatibility quirk: a hinted value column alongside any other
    // categorical column silently turns the histogram into a bar of
    // per-group sums instead of a distribution.
    // TODO: confirm the grouped fallback is intentional; it changes chart
    // semantics without telling the caller.
    if let Some(name) = column {
        if let Some(value_col) = table.column(name) {
            let group_col = table
                .columns
                .iter()
                .find(|c| c.name != name && c.kind() == ColumnKind::Categorical);
            if let Some(group_col) = group_col {
                return grouped_totals(group_col, value_col);
            }
        }
    }

    let selected = column
        .and_then(|name| table.column(name))
        .unwrap_or(&table.columns[0]);

    let cells: Vec<&Cell> = selected.cells.iter().filter(|c| !c.is_null()).collect();
    if cells.is_empty() {
        return Err(RoleAssignmentError::InsufficientData);
    }

    if selected.kind() == ColumnKind::Categorical {
        return Ok(discrete_text_counts(&selected.name, &cells));
    }

    let mut values = Vec::with_capacity(cells.len());
    for cell in &cells {
        let n = cell
            .as_number()
            .ok_or_else(|| RoleAssignmentError::NonNumeric(selected.name.clone()))?;
        values.push(n);
    }

    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted.dedup();

    if sorted.len() <= DISCRETE_LIMIT {
        Ok(discrete_numeric_counts(&selected.name, &values, &sorted))
    } else {
        if bins == 0 {
            return Err(RoleAssignmentError::InvalidBins);
        }
        Ok(HistogramData::Continuous {
            name: selected.name.clone(),
            values,
            bins,
        })
    }
}

/// Value->count pairs for a numeric column, sorted ascending by value.
fn discrete_numeric_counts(name: &str, values: &[f64], distinct: &[f64]) -> HistogramData {
    let categories: Vec<String> = distinct
        .iter()
        .map(|v| Cell::Number(*v).to_string())
        .collect();
    let counts: Vec<f64> = distinct
        .iter()
        .map(|d| values.iter().filter(|&&v| v == *d).count() as f64)
        .collect();
    HistogramData::Discrete {
        name: name.to_string(),
        categories,
        counts,
    }
}

/// Value->count pairs for a categorical column, sorted lexicographically.
fn discrete_text_counts(name: &str, cells: &[&Cell]) -> HistogramData {
    let mut counts: HashMap<String, f64> = HashMap::new();
    for cell in cells {
        *counts.entry(cell.to_string()).or_insert(0.0) += 1.0;
    }

    let mut categories: Vec<String> = counts.keys().cloned().collect();
    categories.sort();

    let counts = categories
        .iter()
        .map(|c| *counts.get(c).unwrap_or(&0.0))
        .collect();
    HistogramData::Discrete {
        name: name.to_string(),
        categories,
        counts,
    }
}

/// Grouped fallback: sum of the value column per group, groups in order of
/// first appearance. Null values are skipped.
fn grouped_totals(group: &Column, value: &Column) -> Result<HistogramData, RoleAssignmentError> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();

    for (group_cell, value_cell) in group.cells.iter().zip(value.cells.iter()) {
        if value_cell.is_null() {
            continue;
        }
        let n = value_cell
            .as_number()
            .ok_or_else(|| RoleAssignmentError::NonNumeric(value.name.clone()))?;
        let key = group_cell.to_string();
        if !totals.contains_key(&key) {
            order.push(key.clone());
        }
        *totals.entry(key).or_insert(0.0) += n;
    }

    if order.is_empty() {
        return Err(RoleAssignmentError::InsufficientData);
    }

    let counts = order.iter().map(|k| *totals.get(k).unwrap_or(&0.0)).collect();
    Ok(HistogramData::Discrete {
        name: value.name.clone(),
        categories: order,
        counts,
    })
}
