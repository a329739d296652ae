//! Read-only accessors over a network handle.
//!
//! Statistic accessors honour the carrier/country filters and report an
//! explicit [`AccessorResult::Empty`] when nothing matches. The map accessor
//! always returns the full topology regardless of filters.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::{ExplorerError, Result};
use crate::network::carriers::{color_of, latex_to_html, nice_name};
use crate::network::{ComponentKind, Network};
use crate::statistics::{self, Metric, StatRow, StatTable};

/// Outcome of a statistics request: data, or the "nothing matched" marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessorResult {
    Table(StatTable),
    Empty { metric: Metric },
}

impl AccessorResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, AccessorResult::Empty { .. })
    }

    pub fn metric(&self) -> Metric {
        match self {
            AccessorResult::Table(t) => t.metric,
            AccessorResult::Empty { metric } => *metric,
        }
    }
}

pub fn parse_metric(name: &str) -> Result<Metric> {
    Metric::from_str(name).map_err(|_| ExplorerError::UnsupportedMetric(name.to_string()))
}

/// Statistics for a metric given by name; unknown names are
/// [`ExplorerError::UnsupportedMetric`].
pub fn get_statistics(
    handle: &Network,
    metric: &str,
    carriers: &BTreeSet<String>,
    countries: &BTreeSet<String>,
) -> Result<AccessorResult> {
    let metric = parse_metric(metric)?;
    Ok(statistics(handle, metric, carriers, countries))
}

/// Filtered statistics. Empty sets mean "all". A carrier matches either the
/// row's bus carrier or its technology carrier.
pub fn statistics(
    handle: &Network,
    metric: Metric,
    carriers: &BTreeSet<String>,
    countries: &BTreeSet<String>,
) -> AccessorResult {
    let table = statistics::compute(handle, metric).retain(|row| row_matches(row, carriers, countries));
    if table.is_empty() {
        AccessorResult::Empty { metric }
    } else {
        AccessorResult::Table(table)
    }
}

fn row_matches(row: &StatRow, carriers: &BTreeSet<String>, countries: &BTreeSet<String>) -> bool {
    let carrier_ok =
        carriers.is_empty() || carriers.contains(&row.bus_carrier) || carriers.contains(&row.carrier);
    let country_ok = countries.is_empty() || countries.contains(&row.country);
    carrier_ok && country_ok
}

// ============================================================================
// Map
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapBus {
    pub name: String,
    pub carrier: String,
    pub country: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapBranch {
    pub name: String,
    pub component: String,
    pub carrier: String,
    pub color: String,
    pub path: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub carrier: String,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapData {
    pub buses: Vec<MapBus>,
    pub branches: Vec<MapBranch>,
    pub legend: Vec<LegendEntry>,
    /// Mean bus position, `None` when no bus has coordinates.
    pub center: Option<[f64; 2]>,
}

/// Full network topology. Deliberately takes no filters.
pub fn get_map_data(handle: &Network) -> MapData {
    let buses: Vec<MapBus> = handle
        .buses
        .iter()
        .filter_map(|b| {
            let (x, y) = b.coordinates()?;
            Some(MapBus {
                name: b.name.clone(),
                carrier: b.carrier.clone(),
                country: b.country.clone(),
                x,
                y,
                color: color_of(handle, &b.carrier),
            })
        })
        .collect();

    let lookup = handle.bus_lookup();
    let position = |name: &str| lookup.get(name).and_then(|b| b.coordinates());

    let mut branches = Vec::new();
    let edges = handle
        .lines
        .iter()
        .map(|l| ("Line", &l.name, &l.carrier, &l.bus0, &l.bus1))
        .chain(handle.links.iter().map(|l| ("Link", &l.name, &l.carrier, &l.bus0, &l.bus1)));
    for (component, name, carrier, bus0, bus1) in edges {
        let (Some(a), Some(b)) = (position(bus0.as_str()), position(bus1.as_str())) else {
            continue;
        };
        branches.push(MapBranch {
            name: name.clone(),
            component: component.to_string(),
            carrier: carrier.clone(),
            color: color_of(handle, carrier),
            path: vec![[a.0, a.1], [b.0, b.1]],
        });
    }

    let used: BTreeSet<&str> = buses
        .iter()
        .map(|b| b.carrier.as_str())
        .chain(branches.iter().map(|b| b.carrier.as_str()))
        .collect();
    let legend = used
        .into_iter()
        .map(|c| LegendEntry {
            carrier: c.to_string(),
            label: latex_to_html(&nice_name(handle, c)),
            color: color_of(handle, c),
        })
        .collect();

    let center = (!buses.is_empty()).then(|| {
        let n = buses.len() as f64;
        [
            buses.iter().map(|b| b.x).sum::<f64>() / n,
            buses.iter().map(|b| b.y).sum::<f64>() / n,
        ]
    });

    MapData {
        buses,
        branches,
        legend,
        center,
    }
}

// ============================================================================
// Filter options, KPIs, metadata
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub carriers: Vec<SelectOption>,
    pub countries: Vec<SelectOption>,
}

/// Bus carriers (except `none`) and countries present in the network, sorted.
pub fn filter_options(handle: &Network) -> FilterOptions {
    let bus_carriers: BTreeSet<&str> = handle
        .buses
        .iter()
        .map(|b| b.carrier.as_str())
        .filter(|c| *c != "none" && !c.is_empty())
        .collect();
    let countries: BTreeSet<&str> = handle
        .buses
        .iter()
        .map(|b| b.country.as_str())
        .filter(|c| !c.is_empty())
        .collect();

    FilterOptions {
        carriers: bus_carriers
            .into_iter()
            .map(|c| SelectOption {
                label: latex_to_html(&nice_name(handle, c)),
                value: c.to_string(),
            })
            .collect(),
        countries: countries
            .into_iter()
            .map(|c| SelectOption {
                label: c.to_string(),
                value: c.to_string(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub component: ComponentKind,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkSummary {
    pub name: String,
    pub snapshots: usize,
    pub kpis: Vec<Kpi>,
}

/// Component counts shown in the header cards.
pub fn network_summary(handle: &Network) -> NetworkSummary {
    let kinds = [
        ComponentKind::Buses,
        ComponentKind::Generators,
        ComponentKind::Lines,
        ComponentKind::Links,
        ComponentKind::StorageUnits,
        ComponentKind::Stores,
    ];
    NetworkSummary {
        name: handle.name.clone(),
        snapshots: handle.snapshots.len(),
        kpis: kinds
            .into_iter()
            .map(|kind| Kpi {
                component: kind,
                label: kind.label().to_string(),
                count: handle.count(kind),
            })
            .collect(),
    }
}

/// Network metadata rendered as YAML.
pub fn metadata_yaml(handle: &Network) -> std::result::Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&handle.meta)
}

// ============================================================================
// Data explorer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTable {
    pub title: String,
    /// Row keys, in display order.
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub total_rows: usize,
    pub sampled: bool,
    /// "showing X of Y rows" when sampled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DataTable {
    /// Builds a table, keeping every `step`-th row when there are more than
    /// `max_rows`.
    fn sampled(title: String, columns: Vec<String>, rows: Vec<Map<String, Value>>, max_rows: usize) -> Self {
        let total_rows = rows.len();
        if max_rows == 0 || total_rows <= max_rows {
            return Self {
                title,
                columns,
                rows,
                total_rows,
                sampled: false,
                note: None,
            };
        }

        let step = (total_rows / max_rows).max(1);
        let rows: Vec<_> = rows.into_iter().step_by(step).collect();
        let note = format!("showing {} of {} rows", rows.len(), total_rows);
        Self {
            title,
            columns,
            rows,
            total_rows,
            sampled: true,
            note: Some(note),
        }
    }
}

fn to_rows<T: Serialize>(items: &[T]) -> Vec<Map<String, Value>> {
    items
        .iter()
        .filter_map(|item| match serde_json::to_value(item) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
        .collect()
}

/// Static attributes of one component class.
pub fn component_table(handle: &Network, kind: ComponentKind, max_rows: usize) -> DataTable {
    let rows = match kind {
        ComponentKind::Buses => to_rows(&handle.buses),
        ComponentKind::Carriers => to_rows(&handle.carriers),
        ComponentKind::Generators => to_rows(&handle.generators),
        ComponentKind::Loads => to_rows(&handle.loads),
        ComponentKind::Lines => to_rows(&handle.lines),
        ComponentKind::Links => to_rows(&handle.links),
        ComponentKind::StorageUnits => to_rows(&handle.storage_units),
        ComponentKind::Stores => to_rows(&handle.stores),
    };

    let mut columns = vec!["name".to_string()];
    if let Some(first) = rows.first() {
        columns.extend(first.keys().filter(|k| k.as_str() != "name").cloned());
    }

    let title = format!("{} Data ({} records)", kind.label(), rows.len());
    DataTable::sampled(title, columns, rows, max_rows)
}

pub fn series_attributes(handle: &Network, kind: ComponentKind) -> Vec<String> {
    handle.series_attributes(kind)
}

/// One time-varying attribute as a snapshot-indexed table, `None` when the
/// attribute has no data.
pub fn component_series(
    handle: &Network,
    kind: ComponentKind,
    attribute: &str,
    max_rows: usize,
) -> Option<DataTable> {
    let table = handle.series(kind, attribute)?;
    if table.is_empty() {
        return None;
    }

    let mut columns = vec!["snapshot".to_string()];
    columns.extend(table.keys().cloned());

    let rows = handle
        .snapshots
        .iter()
        .enumerate()
        .map(|(t, snapshot)| {
            let mut row = Map::new();
            row.insert("snapshot".to_string(), Value::from(snapshot.name.clone()));
            for (name, values) in table {
                row.insert(name.clone(), Value::from(values.get(t).copied().unwrap_or(0.0)));
            }
            row
        })
        .collect();

    let title = format!("{} - {}", kind.label(), attribute);
    Some(DataTable::sampled(title, columns, rows, max_rows))
}
