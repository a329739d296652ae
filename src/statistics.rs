//! Network statistics.
//!
//! Every metric reduces the network to rows keyed by
//! `(component, carrier, bus_carrier, country, snapshot)`. Rows are summed per
//! key and rows that aggregate to zero are dropped. Sign conventions follow
//! PyPSA: supply is positive, withdrawal negative, links withdraw `p0` at
//! `bus0` and `p1` at `bus1`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::network::{Bus, Component, ComponentKind, Network};

/// Values smaller than this are treated as zero and dropped.
const ZERO_TOL: f64 = 1e-9;

/// The fixed set of statistics the dashboard can show.
#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum Metric {
    EnergyBalanceTimeseries,
    EnergyBalanceTotals,
    CapacityTotals,
    CapexTotals,
    OpexTotals,
}

impl Metric {
    pub fn title(&self) -> &'static str {
        match self {
            Metric::EnergyBalanceTimeseries => "Energy Balance Timeseries",
            Metric::EnergyBalanceTotals => "Energy Balance Totals",
            Metric::CapacityTotals => "Capacity Totals",
            Metric::CapexTotals => "CAPEX Totals",
            Metric::OpexTotals => "OPEX Totals",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::EnergyBalanceTimeseries => "MW",
            Metric::EnergyBalanceTotals => "MWh",
            Metric::CapacityTotals => "MW",
            Metric::CapexTotals | Metric::OpexTotals => "currency",
        }
    }

    pub fn is_timeseries(&self) -> bool {
        matches!(self, Metric::EnergyBalanceTimeseries)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    pub component: String,
    pub carrier: String,
    pub bus_carrier: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatTable {
    pub metric: Metric,
    pub unit: String,
    pub rows: Vec<StatRow>,
}

impl StatTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().map(|r| r.value).sum()
    }

    /// Keeps only rows accepted by `keep`.
    pub fn retain(mut self, keep: impl Fn(&StatRow) -> bool) -> Self {
        self.rows.retain(|r| keep(r));
        self
    }
}

type Key = (Option<usize>, &'static str, String, String, String);

struct Aggregator<'a> {
    buses: HashMap<&'a str, &'a Bus>,
    sums: BTreeMap<Key, f64>,
}

impl<'a> Aggregator<'a> {
    fn new(n: &'a Network) -> Self {
        Self {
            buses: n.bus_lookup(),
            sums: BTreeMap::new(),
        }
    }

    fn add(
        &mut self,
        kind: ComponentKind,
        component: &dyn Component,
        bus: &str,
        snapshot: Option<usize>,
        value: f64,
    ) {
        let Some(bus) = self.buses.get(bus) else {
            return;
        };
        let key = (
            snapshot,
            kind.singular(),
            component.carrier().to_string(),
            bus.carrier.clone(),
            bus.country.clone(),
        );
        *self.sums.entry(key).or_insert(0.0) += value;
    }

    fn finish(self, n: &Network, metric: Metric) -> StatTable {
        let rows = self
            .sums
            .into_iter()
            .filter(|(_, v)| v.abs() > ZERO_TOL)
            .map(|((t, component, carrier, bus_carrier, country), value)| StatRow {
                component: component.to_string(),
                carrier,
                bus_carrier,
                country,
                snapshot: t.and_then(|t| n.snapshots.get(t)).map(|s| s.name.clone()),
                value,
            })
            .collect();
        StatTable {
            metric,
            unit: metric.unit().to_string(),
            rows,
        }
    }
}

pub fn compute(n: &Network, metric: Metric) -> StatTable {
    match metric {
        Metric::EnergyBalanceTimeseries => energy_balance(n, metric, false),
        Metric::EnergyBalanceTotals => energy_balance(n, metric, true),
        Metric::CapacityTotals => capacity(n, metric, |_| 1.0),
        Metric::CapexTotals => capacity(n, metric, |cost| cost.capital),
        Metric::OpexTotals => opex(n, metric),
    }
}

/// Per-snapshot flows at each port; totals weight snapshots by their
/// objective weighting and drop the snapshot key.
fn energy_balance(n: &Network, metric: Metric, totals: bool) -> StatTable {
    let mut agg = Aggregator::new(n);
    let key = |t: usize| if totals { None } else { Some(t) };

    for (t, snapshot) in n.snapshots.iter().enumerate() {
        let w = if totals { snapshot.weight() } else { 1.0 };

        for g in &n.generators {
            let p = n.series_value(ComponentKind::Generators, "p", &g.name, t);
            agg.add(ComponentKind::Generators, g, &g.bus, key(t), w * p);
        }
        for l in &n.loads {
            let p = n
                .series_at(ComponentKind::Loads, "p", &l.name, t)
                .or(l.p_set)
                .unwrap_or(0.0);
            agg.add(ComponentKind::Loads, l, &l.bus, key(t), -w * p);
        }
        for s in &n.storage_units {
            let p = n.series_value(ComponentKind::StorageUnits, "p", &s.name, t);
            agg.add(ComponentKind::StorageUnits, s, &s.bus, key(t), w * p);
        }
        for s in &n.stores {
            let p = n.series_value(ComponentKind::Stores, "p", &s.name, t);
            agg.add(ComponentKind::Stores, s, &s.bus, key(t), w * p);
        }
        for link in &n.links {
            let p0 = n.series_value(ComponentKind::Links, "p0", &link.name, t);
            let p1 = n
                .series_at(ComponentKind::Links, "p1", &link.name, t)
                .unwrap_or_else(|| -link.efficiency.unwrap_or(1.0) * p0);
            agg.add(ComponentKind::Links, link, &link.bus0, key(t), -w * p0);
            agg.add(ComponentKind::Links, link, &link.bus1, key(t), -w * p1);
        }
    }

    agg.finish(n, metric)
}

struct Cost {
    capital: f64,
}

/// Optimal capacity (optionally scaled by a cost) at each component's first
/// bus. Lines and links are attributed to `bus0`.
fn capacity(n: &Network, metric: Metric, scale: impl Fn(&Cost) -> f64) -> StatTable {
    let mut agg = Aggregator::new(n);
    let opt = |opt: Option<f64>, nom: Option<f64>| opt.or(nom).unwrap_or(0.0);
    let cost = |capital: Option<f64>| Cost {
        capital: capital.unwrap_or(0.0),
    };

    for g in &n.generators {
        let v = opt(g.p_nom_opt, g.p_nom) * scale(&cost(g.capital_cost));
        agg.add(ComponentKind::Generators, g, &g.bus, None, v);
    }
    for s in &n.storage_units {
        let v = opt(s.p_nom_opt, s.p_nom) * scale(&cost(s.capital_cost));
        agg.add(ComponentKind::StorageUnits, s, &s.bus, None, v);
    }
    for s in &n.stores {
        let v = opt(s.e_nom_opt, s.e_nom) * scale(&cost(s.capital_cost));
        agg.add(ComponentKind::Stores, s, &s.bus, None, v);
    }
    for l in &n.lines {
        let v = opt(l.s_nom_opt, l.s_nom) * scale(&cost(l.capital_cost));
        agg.add(ComponentKind::Lines, l, &l.bus0, None, v);
    }
    for l in &n.links {
        let v = opt(l.p_nom_opt, l.p_nom) * scale(&cost(l.capital_cost));
        agg.add(ComponentKind::Links, l, &l.bus0, None, v);
    }

    agg.finish(n, metric)
}

/// Marginal cost times weighted dispatch. Storage and stores only pay for
/// discharging, links for what they draw at `bus0`.
fn opex(n: &Network, metric: Metric) -> StatTable {
    let mut agg = Aggregator::new(n);

    let dispatch = |kind: ComponentKind, attr: &str, name: &str, positive_only: bool| -> f64 {
        n.snapshots
            .iter()
            .enumerate()
            .map(|(t, s)| {
                let p = n.series_value(kind, attr, name, t);
                s.weight() * if positive_only { p.max(0.0) } else { p }
            })
            .sum()
    };

    for g in &n.generators {
        let v = g.marginal_cost.unwrap_or(0.0) * dispatch(ComponentKind::Generators, "p", &g.name, false);
        agg.add(ComponentKind::Generators, g, &g.bus, None, v);
    }
    for s in &n.storage_units {
        let v = s.marginal_cost.unwrap_or(0.0) * dispatch(ComponentKind::StorageUnits, "p", &s.name, true);
        agg.add(ComponentKind::StorageUnits, s, &s.bus, None, v);
    }
    for s in &n.stores {
        let v = s.marginal_cost.unwrap_or(0.0) * dispatch(ComponentKind::Stores, "p", &s.name, true);
        agg.add(ComponentKind::Stores, s, &s.bus, None, v);
    }
    for l in &n.links {
        let v = l.marginal_cost.unwrap_or(0.0) * dispatch(ComponentKind::Links, "p0", &l.name, true);
        agg.add(ComponentKind::Links, l, &l.bus0, None, v);
    }

    agg.finish(n, metric)
}
