pub mod carriers;
pub mod components;
pub mod demo;
pub mod loader;

pub use components::*;
pub use loader::{load_path, parse_json};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Component classes of a network, named after their list names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComponentKind {
    Buses,
    Carriers,
    Generators,
    Loads,
    Lines,
    Links,
    StorageUnits,
    Stores,
}

impl ComponentKind {
    /// Human readable label used for KPI cards and data tables.
    pub fn label(&self) -> &'static str {
        match self {
            ComponentKind::Buses => "Nodes",
            ComponentKind::Carriers => "Carriers",
            ComponentKind::Generators => "Generators",
            ComponentKind::Loads => "Loads",
            ComponentKind::Lines => "Lines",
            ComponentKind::Links => "Links",
            ComponentKind::StorageUnits => "Storage Units",
            ComponentKind::Stores => "Stores",
        }
    }

    /// Singular name used when tagging statistic rows.
    pub fn singular(&self) -> &'static str {
        match self {
            ComponentKind::Buses => "Bus",
            ComponentKind::Carriers => "Carrier",
            ComponentKind::Generators => "Generator",
            ComponentKind::Loads => "Load",
            ComponentKind::Lines => "Line",
            ComponentKind::Links => "Link",
            ComponentKind::StorageUnits => "StorageUnit",
            ComponentKind::Stores => "Store",
        }
    }
}

/// Time series of one attribute: component name -> one value per snapshot.
pub type SeriesTable = BTreeMap<String, Vec<f64>>;

/// One loaded energy system dataset.
///
/// Networks are built once by the loader and never mutated afterwards; the
/// registry hands them out behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    #[serde(default)]
    pub buses: Vec<Bus>,
    #[serde(default)]
    pub carriers: Vec<Carrier>,
    #[serde(default)]
    pub generators: Vec<Generator>,
    #[serde(default)]
    pub loads: Vec<Load>,
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub storage_units: Vec<StorageUnit>,
    #[serde(default)]
    pub stores: Vec<Store>,
    /// Time-varying attributes, e.g. `series[generators]["p"]`.
    #[serde(default)]
    pub series: BTreeMap<ComponentKind, BTreeMap<String, SeriesTable>>,
}

impl Network {
    pub fn bus_lookup(&self) -> HashMap<&str, &Bus> {
        self.buses.iter().map(|b| (b.name.as_str(), b)).collect()
    }

    pub fn carrier(&self, name: &str) -> Option<&Carrier> {
        self.carriers.iter().find(|c| c.name == name)
    }

    /// Number of rows in a component table.
    pub fn count(&self, kind: ComponentKind) -> usize {
        match kind {
            ComponentKind::Buses => self.buses.len(),
            ComponentKind::Carriers => self.carriers.len(),
            ComponentKind::Generators => self.generators.len(),
            ComponentKind::Loads => self.loads.len(),
            ComponentKind::Lines => self.lines.len(),
            ComponentKind::Links => self.links.len(),
            ComponentKind::StorageUnits => self.storage_units.len(),
            ComponentKind::Stores => self.stores.len(),
        }
    }

    /// Every component that references buses, tagged by kind.
    pub fn attached(&self) -> Vec<(ComponentKind, &dyn Component)> {
        let mut out: Vec<(ComponentKind, &dyn Component)> = Vec::new();
        out.extend(self.generators.iter().map(|c| (ComponentKind::Generators, c as &dyn Component)));
        out.extend(self.loads.iter().map(|c| (ComponentKind::Loads, c as &dyn Component)));
        out.extend(self.lines.iter().map(|c| (ComponentKind::Lines, c as &dyn Component)));
        out.extend(self.links.iter().map(|c| (ComponentKind::Links, c as &dyn Component)));
        out.extend(
            self.storage_units
                .iter()
                .map(|c| (ComponentKind::StorageUnits, c as &dyn Component)),
        );
        out.extend(self.stores.iter().map(|c| (ComponentKind::Stores, c as &dyn Component)));
        out
    }

    /// Time series for `kind`/`attribute`, if present.
    pub fn series(&self, kind: ComponentKind, attribute: &str) -> Option<&SeriesTable> {
        self.series.get(&kind).and_then(|attrs| attrs.get(attribute))
    }

    /// Value of one component's series at snapshot index `t`, `None` when the
    /// component has no column for `attribute`.
    pub fn series_at(&self, kind: ComponentKind, attribute: &str, name: &str, t: usize) -> Option<f64> {
        self.series(kind, attribute)
            .and_then(|table| table.get(name))
            .and_then(|values| values.get(t))
            .copied()
    }

    /// Like [`Network::series_at`], zero when absent.
    pub fn series_value(&self, kind: ComponentKind, attribute: &str, name: &str, t: usize) -> f64 {
        self.series_at(kind, attribute, name, t).unwrap_or(0.0)
    }

    /// Attribute names with at least one non-empty series for `kind`.
    pub fn series_attributes(&self, kind: ComponentKind) -> Vec<String> {
        self.series
            .get(&kind)
            .map(|attrs| {
                attrs
                    .iter()
                    .filter(|(_, table)| table.values().any(|v| !v.is_empty()))
                    .map(|(attr, _)| attr.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_component_kind_names() {
        assert_eq!(ComponentKind::StorageUnits.to_string(), "storage_units");
        assert_eq!(ComponentKind::from_str("buses").unwrap(), ComponentKind::Buses);
        assert!(ComponentKind::from_str("transformers").is_err());
        assert_eq!(ComponentKind::Buses.label(), "Nodes");
    }

    #[test]
    fn test_series_value_defaults_to_zero() {
        let n = demo::demo_network().unwrap();
        assert_eq!(n.series_value(ComponentKind::Generators, "p", "no-such-gen", 0), 0.0);
        assert_eq!(n.series_value(ComponentKind::Generators, "missing_attr", "x", 0), 0.0);
    }

    #[test]
    fn test_demo_counts() {
        let n = demo::demo_network().unwrap();
        assert_eq!(n.count(ComponentKind::Buses), n.buses.len());
        assert!(n.count(ComponentKind::Generators) > 0);
        assert!(n.series_attributes(ComponentKind::Generators).contains(&"p".to_string()));
    }
}
