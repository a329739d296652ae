//! End-to-end dashboard flows: registry -> selection -> accessors -> view.

use proptest::prelude::*;
use rstest::{fixture, rstest};
use std::collections::BTreeSet;
use std::sync::Arc;

use pypsa_explorer::accessors::{self, AccessorResult};
use pypsa_explorer::network::demo::demo_network;
use pypsa_explorer::network::Network;
use pypsa_explorer::registry::{NetworkRegistry, NetworkSource};
use pypsa_explorer::selection::{Event, SelectionState, Tab};
use pypsa_explorer::session::{render, step, SessionManager};
use pypsa_explorer::statistics::{self, Metric};
use pypsa_explorer::view::{StatusKind, ViewSettings, NO_DATA_MESSAGE, NO_DATA_TITLE};
use pypsa_explorer::ExplorerError;

fn doubled_capacity() -> Network {
    let mut n = demo_network().unwrap();
    n.name = "Doubled".to_string();
    for g in &mut n.generators {
        g.p_nom = g.p_nom.map(|v| v * 2.0);
        g.p_nom_opt = g.p_nom_opt.map(|v| v * 2.0);
    }
    n
}

#[fixture]
fn base() -> NetworkRegistry {
    let mut reg = NetworkRegistry::new();
    reg.register("Base", NetworkSource::Loaded(demo_network().unwrap())).unwrap();
    reg
}

#[fixture]
fn pair() -> NetworkRegistry {
    let mut reg = NetworkRegistry::new();
    reg.register("A", NetworkSource::Loaded(demo_network().unwrap())).unwrap();
    reg.register("B", NetworkSource::Loaded(doubled_capacity())).unwrap();
    reg
}

fn no_filter() -> BTreeSet<String> {
    BTreeSet::new()
}

#[rstest]
fn single_network_defaults_and_full_capacity_table(base: NetworkRegistry) {
    assert_eq!(base.default_label(), Some("Base"));
    let state = SelectionState::initial(&base).unwrap();
    assert_eq!(state.active_label, "Base");

    let handle = base.get("Base").unwrap();
    let result = accessors::get_statistics(&handle, "capacity_totals", &no_filter(), &no_filter()).unwrap();
    assert_eq!(
        result,
        AccessorResult::Table(statistics::compute(&handle, Metric::CapacityTotals))
    );

    let outcome = step(
        &base,
        ViewSettings::default(),
        &state,
        &Event::SelectTab { tab: "capacity_totals".into() },
    );
    assert_eq!(outcome.view.status.kind, StatusKind::Ok);
    assert!(!outcome.view.figures.is_empty());
    assert!(outcome.view.table.is_some());
}

#[rstest]
fn switching_networks_reads_the_new_handle(pair: NetworkRegistry) {
    let state = SelectionState::initial(&pair).unwrap();
    let state = step(
        &pair,
        ViewSettings::default(),
        &state,
        &Event::SelectTab { tab: "capacity_totals".into() },
    )
    .state;
    let before = render(&pair, ViewSettings::default(), &state);

    let outcome = step(
        &pair,
        ViewSettings::default(),
        &state,
        &Event::SelectNetwork { label: "B".into() },
    );
    assert_eq!(outcome.state.active_label, "B");
    assert_eq!(outcome.view.network, "B");
    assert_eq!(outcome.state.active_tab, Tab::CapacityTotals);
    assert_ne!(outcome.view.figures, before.figures);

    let b = pair.get("B").unwrap();
    let AccessorResult::Table(table) =
        accessors::get_statistics(&b, "capacity_totals", &no_filter(), &no_filter()).unwrap()
    else {
        panic!("expected capacity rows for B");
    };
    let a_total = statistics::compute(&pair.get("A").unwrap(), Metric::CapacityTotals).total();
    assert!(table.total() > a_total);
}

#[rstest]
fn unmatched_country_renders_placeholder(base: NetworkRegistry) {
    let state = SelectionState::initial(&base).unwrap();
    let state = step(
        &base,
        ViewSettings::default(),
        &state,
        &Event::SelectTab { tab: "capex_totals".into() },
    )
    .state;

    let outcome = step(
        &base,
        ViewSettings::default(),
        &state,
        &Event::SetFilters {
            carriers: BTreeSet::new(),
            countries: ["Narnia".to_string()].into(),
        },
    );
    assert_eq!(outcome.view.status.kind, StatusKind::Placeholder);
    assert_eq!(outcome.view.status.title.as_deref(), Some(NO_DATA_TITLE));
    assert_eq!(outcome.view.status.message.as_deref(), Some(NO_DATA_MESSAGE));
    assert!(outcome.view.status.error.is_none());
    assert!(outcome.view.figures.is_empty());
}

#[rstest]
fn unknown_tab_keeps_state_and_shows_banner(base: NetworkRegistry) {
    let state = SelectionState::initial(&base).unwrap();
    let outcome = step(
        &base,
        ViewSettings::default(),
        &state,
        &Event::SelectTab { tab: "nonexistent_tab".into() },
    );
    assert_eq!(outcome.state, state);
    assert_eq!(outcome.state.active_tab, Tab::EnergyBalanceTimeseries);
    assert_eq!(outcome.view.status.kind, StatusKind::Error);
    assert_eq!(outcome.view.status.error.as_deref(), Some("UnsupportedMetricError"));
    assert!(outcome
        .view
        .status
        .title
        .as_deref()
        .is_some_and(|t| t.starts_with("Error processing")));
}

#[rstest]
fn unknown_network_keeps_state(pair: NetworkRegistry) {
    let state = SelectionState::initial(&pair).unwrap();
    let outcome = step(
        &pair,
        ViewSettings::default(),
        &state,
        &Event::SelectNetwork { label: "Atlantis".into() },
    );
    assert_eq!(outcome.state.active_label, "A");
    assert_eq!(outcome.view.status.error.as_deref(), Some("NotFoundError"));
}

#[rstest]
fn handles_are_stable_after_register(base: NetworkRegistry) {
    let first = base.get("Base").unwrap();
    let second = base.get("Base").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn duplicate_label_is_rejected() {
    let mut reg = NetworkRegistry::new();
    reg.register("Base", NetworkSource::Loaded(demo_network().unwrap())).unwrap();
    let original = reg.get("Base").unwrap();
    let err = reg
        .register("Base", NetworkSource::Loaded(doubled_capacity()))
        .unwrap_err();
    assert!(matches!(err, ExplorerError::DuplicateLabel(_)));
    assert!(Arc::ptr_eq(&original, &reg.get("Base").unwrap()));
}

#[test]
fn concurrent_sessions_do_not_interfere() {
    let manager = Arc::new(SessionManager::new(pair(), ViewSettings::default()));
    let threads: Vec<_> = (0..8)
        .map(|i| {
            let manager = manager.clone();
            std::thread::spawn(move || {
                let (id, _) = manager.create_session().unwrap();
                let label = if i % 2 == 0 { "A" } else { "B" };
                for _ in 0..10 {
                    let outcome = manager
                        .handle_event(id, &Event::SelectNetwork { label: label.into() })
                        .unwrap();
                    assert_eq!(outcome.view.network, label);
                }
                manager.current(id).unwrap().state.active_label
            })
        })
        .collect();

    for (i, t) in threads.into_iter().enumerate() {
        let expected = if i % 2 == 0 { "A" } else { "B" };
        assert_eq!(t.join().unwrap(), expected);
    }
    assert_eq!(manager.session_count(), 8);
}

fn subset(pool: &'static [&'static str]) -> impl Strategy<Value = BTreeSet<String>> {
    proptest::sample::subsequence(pool, 0..=pool.len())
        .prop_map(|items| items.into_iter().map(str::to_string).collect())
}

const CARRIERS: &[&str] = &["AC", "H2", "onwind", "solar", "gas", "Narnia"];
const COUNTRIES: &[&str] = &["DE", "FR", "NL", "Narnia"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn map_ignores_filters(carriers in subset(CARRIERS), countries in subset(COUNTRIES)) {
        let reg = base();
        let state = SelectionState::initial(&reg).unwrap();
        let state = step(&reg, ViewSettings::default(), &state, &Event::SelectTab { tab: "network_map".into() }).state;
        let unfiltered = render(&reg, ViewSettings::default(), &state);

        let outcome = step(&reg, ViewSettings::default(), &state, &Event::SetFilters { carriers, countries });
        prop_assert_eq!(outcome.view.map, unfiltered.map);
    }

    #[test]
    fn filters_never_error(
        carriers in subset(CARRIERS),
        countries in subset(COUNTRIES),
        metric in proptest::sample::select(vec![
            "energy_balance_timeseries",
            "energy_balance_totals",
            "capacity_totals",
            "capex_totals",
            "opex_totals",
        ]),
    ) {
        let reg = base();
        let handle = reg.get("Base").unwrap();
        let result = accessors::get_statistics(&handle, metric, &carriers, &countries).unwrap();

        let state = SelectionState {
            active_label: "Base".into(),
            active_tab: Tab::parse(metric).unwrap(),
            selected_carriers: carriers,
            selected_countries: countries,
        };
        let view = render(&reg, ViewSettings::default(), &state);
        let expected = if result.is_empty() { StatusKind::Placeholder } else { StatusKind::Ok };
        prop_assert_eq!(view.status.kind, expected);
    }
}
