use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{ExplorerError, Result};
use crate::registry::NetworkRegistry;
use crate::statistics::Metric;

/// Dashboard tabs. Every statistics tab maps to one [`Metric`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Tab {
    #[default]
    EnergyBalanceTimeseries,
    EnergyBalanceTotals,
    CapacityTotals,
    CapexTotals,
    OpexTotals,
    NetworkMap,
}

impl Tab {
    pub fn parse(id: &str) -> Result<Self> {
        Tab::from_str(id).map_err(|_| ExplorerError::UnsupportedMetric(id.to_string()))
    }

    pub fn metric(&self) -> Option<Metric> {
        match self {
            Tab::EnergyBalanceTimeseries => Some(Metric::EnergyBalanceTimeseries),
            Tab::EnergyBalanceTotals => Some(Metric::EnergyBalanceTotals),
            Tab::CapacityTotals => Some(Metric::CapacityTotals),
            Tab::CapexTotals => Some(Metric::CapexTotals),
            Tab::OpexTotals => Some(Metric::OpexTotals),
            Tab::NetworkMap => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tab::EnergyBalanceTimeseries => "Energy Balance",
            Tab::NetworkMap => "Network Configuration",
            other => other.metric().map(|m| m.title()).unwrap_or_default(),
        }
    }
}

/// What one browser session is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub active_label: String,
    pub active_tab: Tab,
    pub selected_carriers: BTreeSet<String>,
    pub selected_countries: BTreeSet<String>,
}

impl SelectionState {
    /// Default network, first tab, no filters.
    pub fn initial(registry: &NetworkRegistry) -> Result<Self> {
        let label = registry.default_label().ok_or(ExplorerError::NoNetworks)?;
        Ok(Self {
            active_label: label.to_string(),
            active_tab: Tab::default(),
            selected_carriers: BTreeSet::new(),
            selected_countries: BTreeSet::new(),
        })
    }
}

/// User input that changes a session's selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SelectNetwork { label: String },
    SelectTab { tab: String },
    SetFilters {
        #[serde(default)]
        carriers: BTreeSet<String>,
        #[serde(default)]
        countries: BTreeSet<String>,
    },
    /// Re-render the current selection unchanged.
    Refresh,
}

/// Applies `event` to `state`. On error the caller keeps the old state, so a
/// rejected event never partially mutates the selection.
pub fn transition(registry: &NetworkRegistry, state: &SelectionState, event: &Event) -> Result<SelectionState> {
    let mut next = state.clone();
    match event {
        Event::SelectNetwork { label } => {
            if !registry.contains(label) {
                return Err(ExplorerError::NotFound(label.clone()));
            }
            next.active_label = label.clone();
        }
        Event::SelectTab { tab } => {
            next.active_tab = Tab::parse(tab)?;
        }
        Event::SetFilters { carriers, countries } => {
            next.selected_carriers = carriers.clone();
            next.selected_countries = countries.clone();
        }
        Event::Refresh => {}
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::demo::demo_network;
    use crate::registry::NetworkSource;

    fn registry(labels: &[&str]) -> NetworkRegistry {
        let mut reg = NetworkRegistry::new();
        for label in labels {
            reg.register(*label, NetworkSource::Loaded(demo_network().unwrap())).unwrap();
        }
        reg
    }

    #[test]
    fn test_initial_state() {
        let reg = registry(&["Base", "Other"]);
        let state = SelectionState::initial(&reg).unwrap();
        assert_eq!(state.active_label, "Base");
        assert_eq!(state.active_tab, Tab::EnergyBalanceTimeseries);
        assert_eq!(state.active_tab.title(), "Energy Balance");
        assert!(state.selected_carriers.is_empty());
        assert!(state.selected_countries.is_empty());
    }

    #[test]
    fn test_initial_state_requires_networks() {
        let reg = NetworkRegistry::new();
        assert!(matches!(SelectionState::initial(&reg), Err(ExplorerError::NoNetworks)));
    }

    #[test]
    fn test_select_network_keeps_tab_and_filters() {
        let reg = registry(&["A", "B"]);
        let mut state = SelectionState::initial(&reg).unwrap();
        state.active_tab = Tab::CapexTotals;
        state.selected_countries.insert("DE".into());

        let next = transition(&reg, &state, &Event::SelectNetwork { label: "B".into() }).unwrap();
        assert_eq!(next.active_label, "B");
        assert_eq!(next.active_tab, Tab::CapexTotals);
        assert_eq!(next.selected_countries, state.selected_countries);
    }

    #[test]
    fn test_select_unknown_network_fails() {
        let reg = registry(&["A"]);
        let state = SelectionState::initial(&reg).unwrap();
        let err = transition(&reg, &state, &Event::SelectNetwork { label: "Z".into() }).unwrap_err();
        assert!(matches!(err, ExplorerError::NotFound(_)));
    }

    #[test]
    fn test_select_tab() {
        let reg = registry(&["A"]);
        let state = SelectionState::initial(&reg).unwrap();
        let next = transition(&reg, &state, &Event::SelectTab { tab: "network_map".into() }).unwrap();
        assert_eq!(next.active_tab, Tab::NetworkMap);

        let err = transition(&reg, &state, &Event::SelectTab { tab: "nonexistent_tab".into() }).unwrap_err();
        assert!(matches!(err, ExplorerError::UnsupportedMetric(_)));
    }

    #[test]
    fn test_set_filters_replaces_wholesale() {
        let reg = registry(&["A"]);
        let mut state = SelectionState::initial(&reg).unwrap();
        state.selected_carriers = ["AC".to_string(), "H2".to_string()].into();

        let next = transition(
            &reg,
            &state,
            &Event::SetFilters {
                carriers: ["H2".to_string()].into(),
                countries: BTreeSet::new(),
            },
        )
        .unwrap();
        assert_eq!(next.selected_carriers, ["H2".to_string()].into());
        assert!(next.selected_countries.is_empty());
    }

    #[test]
    fn test_event_json_shape() {
        let event: Event = serde_json::from_str(r#"{"type": "set_filters", "countries": ["DE"]}"#).unwrap();
        assert_eq!(
            event,
            Event::SetFilters {
                carriers: BTreeSet::new(),
                countries: ["DE".to_string()].into(),
            }
        );
    }

    #[test]
    fn test_tab_metric_mapping() {
        assert_eq!(Tab::parse("capacity_totals").unwrap().metric(), Some(Metric::CapacityTotals));
        assert_eq!(Tab::NetworkMap.metric(), None);
        assert_eq!(Tab::CapexTotals.title(), "CAPEX Totals");
    }
}
