//! Turns accessor output into display payloads.
//!
//! This is the only place errors become user-visible text. An empty result is
//! a neutral placeholder; any error is an error banner. Nothing here reads the
//! clock or other ambient state, so the same inputs always give the same view.

use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::accessors::{AccessorResult, MapData};
use crate::error::{ExplorerError, Result};
use crate::network::carriers::{color_of, latex_to_html, nice_name};
use crate::network::Network;
use crate::selection::Tab;
use crate::statistics::{Metric, StatRow, StatTable};

pub const NO_DATA_TITLE: &str = "No Data Available";
pub const NO_DATA_MESSAGE: &str = "No data found for the current selection. Try adjusting your filters.";

/// Chart sizing, from the `explorer` config section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSettings {
    pub chart_height: u32,
    pub cost_chart_height: u32,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            chart_height: 500,
            cost_chart_height: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureKind {
    /// Horizontal bars, one category per series.
    Bar,
    /// Stacked area over snapshots.
    Area,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureSeries {
    pub name: String,
    pub color: String,
    /// Category labels for bars, snapshot names for areas.
    pub x: Vec<String>,
    /// One value per entry of `x`.
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureSpec {
    pub kind: FigureKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub height: u32,
    pub series: Vec<FigureSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSpec {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Ok,
    Placeholder,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub kind: StatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            kind: StatusKind::Ok,
            title: None,
            message: None,
            error: None,
        }
    }

    pub fn placeholder() -> Self {
        Self {
            kind: StatusKind::Placeholder,
            title: Some(NO_DATA_TITLE.to_string()),
            message: Some(NO_DATA_MESSAGE.to_string()),
            error: None,
        }
    }

    /// Banner naming the operation that failed.
    pub fn error(operation: &str, err: &ExplorerError) -> Self {
        Self {
            kind: StatusKind::Error,
            title: Some(format!("Error processing {operation}")),
            message: Some(err.to_string()),
            error: Some(err.kind().to_string()),
        }
    }
}

/// Everything the UI needs to draw one tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedView {
    pub network: String,
    pub tab: Tab,
    pub title: String,
    pub status: Status,
    pub figures: Vec<FigureSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<MapData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl RenderedView {
    fn blank(ctx: &RenderContext<'_>, tab: Tab, status: Status) -> Self {
        Self {
            network: ctx.network_label.to_string(),
            tab,
            title: tab.title().to_string(),
            status,
            figures: Vec::new(),
            table: None,
            map: None,
            metadata: None,
        }
    }

    /// Error banner for a failure that happened before any tab was resolved.
    pub fn failure(network_label: &str, tab: Tab, operation: &str, err: &ExplorerError) -> Self {
        Self {
            network: network_label.to_string(),
            tab,
            title: tab.title().to_string(),
            status: Status::error(operation, err),
            figures: Vec::new(),
            table: None,
            map: None,
            metadata: None,
        }
    }
}

/// Inputs shared by every render call within one cycle.
pub struct RenderContext<'a> {
    pub network_label: &'a str,
    pub network: &'a Network,
    pub countries: &'a BTreeSet<String>,
    pub settings: ViewSettings,
}

/// Maps an accessor result for `tab` to a display payload.
pub fn render_tab(ctx: &RenderContext<'_>, tab: Tab, result: Result<AccessorResult>) -> RenderedView {
    match result {
        Ok(AccessorResult::Table(table)) => {
            let mut view = RenderedView::blank(ctx, tab, Status::ok());
            view.figures = figures(ctx, &table);
            view.table = Some(stat_table(&table));
            view
        }
        Ok(AccessorResult::Empty { .. }) => RenderedView::blank(ctx, tab, Status::placeholder()),
        Err(err) => {
            let operation = match &err {
                ExplorerError::UnsupportedMetric(id) => format!("tab '{id}'"),
                _ => format!("{} for network '{}'", tab.title(), ctx.network_label),
            };
            RenderedView::blank(ctx, tab, Status::error(&operation, &err))
        }
    }
}

/// The network configuration tab: full map plus metadata.
pub fn render_map(
    ctx: &RenderContext<'_>,
    map: MapData,
    metadata: std::result::Result<String, serde_yaml::Error>,
) -> RenderedView {
    let mut view = RenderedView::blank(ctx, Tab::NetworkMap, Status::ok());
    view.map = Some(map);
    match metadata {
        Ok(yaml) => view.metadata = Some(yaml),
        Err(e) => {
            view.metadata = Some(format!("Metadata unavailable: {e}"));
        }
    }
    view
}

fn country_suffix(countries: &BTreeSet<String>) -> String {
    if countries.is_empty() {
        String::new()
    } else {
        format!(" (Countries: {})", countries.iter().join(", "))
    }
}

fn figures(ctx: &RenderContext<'_>, table: &StatTable) -> Vec<FigureSpec> {
    let suffix = country_suffix(ctx.countries);
    let unit = table.metric.unit();

    match table.metric {
        Metric::CapexTotals | Metric::OpexTotals => {
            let title = if table.metric == Metric::CapexTotals {
                "Capital Expenditure Totals"
            } else {
                "Operational Expenditure Totals"
            };
            vec![bar_figure(
                ctx,
                format!("{title}{suffix}"),
                unit,
                ctx.settings.cost_chart_height,
                &table.rows.iter().collect::<Vec<_>>(),
            )]
        }
        metric => {
            let by_bus_carrier: BTreeMap<&str, Vec<&StatRow>> =
                table.rows.iter().into_group_map_by(|r| r.bus_carrier.as_str()).into_iter().collect();

            by_bus_carrier
                .into_iter()
                .map(|(bus_carrier, rows)| {
                    let carrier_name = latex_to_html(&nice_name(ctx.network, bus_carrier));
                    match metric {
                        Metric::EnergyBalanceTimeseries => area_figure(
                            ctx,
                            format!("Energy Balance for {carrier_name}{suffix}"),
                            unit,
                            &rows,
                        ),
                        Metric::EnergyBalanceTotals => bar_figure(
                            ctx,
                            format!("Aggregated Balance for {carrier_name}{suffix}"),
                            unit,
                            ctx.settings.chart_height,
                            &rows,
                        ),
                        _ => bar_figure(
                            ctx,
                            format!("Optimal Capacity for {carrier_name}{suffix}"),
                            unit,
                            ctx.settings.chart_height,
                            &rows,
                        ),
                    }
                })
                .collect()
        }
    }
}

/// One bar per technology carrier, summed over components and countries.
fn bar_figure(ctx: &RenderContext<'_>, title: String, unit: &str, height: u32, rows: &[&StatRow]) -> FigureSpec {
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for row in rows {
        *sums.entry(row.carrier.as_str()).or_insert(0.0) += row.value;
    }

    let series = sums
        .into_iter()
        .map(|(carrier, value)| {
            let name = latex_to_html(&nice_name(ctx.network, carrier));
            FigureSeries {
                x: vec![name.clone()],
                name,
                color: color_of(ctx.network, carrier),
                y: vec![value],
            }
        })
        .collect();

    FigureSpec {
        kind: FigureKind::Bar,
        title,
        x_label: format!("Value [{unit}]"),
        y_label: "Carrier".to_string(),
        height,
        series,
    }
}

/// Stacked area per technology carrier over the network's snapshots.
fn area_figure(ctx: &RenderContext<'_>, title: String, unit: &str, rows: &[&StatRow]) -> FigureSpec {
    let labels: Vec<String> = ctx.network.snapshots.iter().map(|s| s.name.clone()).collect();
    let position: BTreeMap<&str, usize> = labels.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();

    let mut values: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in rows {
        let Some(t) = row.snapshot.as_deref().and_then(|s| position.get(s)) else {
            continue;
        };
        values
            .entry(row.carrier.as_str())
            .or_insert_with(|| vec![0.0; labels.len()])[*t] += row.value;
    }

    let series = values
        .into_iter()
        .map(|(carrier, values)| FigureSeries {
            name: latex_to_html(&nice_name(ctx.network, carrier)),
            color: color_of(ctx.network, carrier),
            x: labels.clone(),
            y: values,
        })
        .collect();

    FigureSpec {
        kind: FigureKind::Area,
        title,
        x_label: "Snapshot".to_string(),
        y_label: format!("Power [{unit}]"),
        height: ctx.settings.chart_height,
        series,
    }
}

fn stat_table(table: &StatTable) -> TableSpec {
    let mut columns: Vec<String> = ["component", "carrier", "bus_carrier", "country"]
        .into_iter()
        .map(str::to_string)
        .collect();
    if table.metric.is_timeseries() {
        columns.push("snapshot".to_string());
    }
    columns.push(format!("value [{}]", table.unit));

    let rows = table
        .rows
        .iter()
        .map(|r| {
            let mut row = vec![
                Value::from(r.component.clone()),
                Value::from(r.carrier.clone()),
                Value::from(r.bus_carrier.clone()),
                Value::from(r.country.clone()),
            ];
            if table.metric.is_timeseries() {
                row.push(Value::from(r.snapshot.clone().unwrap_or_default()));
            }
            row.push(Value::from(r.value));
            row
        })
        .collect();

    TableSpec { columns, rows }
}
