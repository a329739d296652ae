//! Per-session selection state and the render cycle.
//!
//! [`step`] and [`render`] are pure: they take the registry and a selection
//! and return a new selection plus the view to display. [`SessionManager`]
//! owns one selection per session and runs each cycle under that session's
//! lock, so mutation and the read that follows it are never interleaved with
//! another cycle of the same session.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::accessors;
use crate::error::{ExplorerError, Result};
use crate::network::Network;
use crate::registry::{NetworkRegistry, NetworkSource};
use crate::selection::{transition, Event, SelectionState, Tab};
use crate::view::{self, RenderContext, RenderedView, Status, ViewSettings};

/// Result of one render cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub state: SelectionState,
    pub view: RenderedView,
}

/// Renders the view for `state`, falling back to the default network when
/// the active label no longer resolves.
pub fn render(registry: &NetworkRegistry, settings: ViewSettings, state: &SelectionState) -> RenderedView {
    let (label, handle) = match registry.resolve(&state.active_label) {
        Ok(resolved) => resolved,
        Err(err) => {
            return RenderedView::failure(&state.active_label, state.active_tab, "network selection", &err)
        }
    };
    render_with(&label, &handle, settings, state)
}

fn render_with(label: &str, handle: &Network, settings: ViewSettings, state: &SelectionState) -> RenderedView {
    let ctx = RenderContext {
        network_label: label,
        network: handle,
        countries: &state.selected_countries,
        settings,
    };

    match state.active_tab {
        Tab::NetworkMap => view::render_map(
            &ctx,
            accessors::get_map_data(handle),
            accessors::metadata_yaml(handle),
        ),
        tab => {
            let metric: &'static str = tab.into();
            let result = accessors::get_statistics(
                handle,
                metric,
                &state.selected_carriers,
                &state.selected_countries,
            );
            view::render_tab(&ctx, tab, result)
        }
    }
}

/// Applies `event` and renders. A rejected event keeps the previous state and
/// shows its view with an error banner.
pub fn step(registry: &NetworkRegistry, settings: ViewSettings, state: &SelectionState, event: &Event) -> Outcome {
    match transition(registry, state, event) {
        Ok(mut next) => {
            if !registry.contains(&next.active_label) {
                if let Some(default) = registry.default_label() {
                    next.active_label = default.to_string();
                }
            }
            let view = render(registry, settings, &next);
            Outcome { state: next, view }
        }
        Err(err) => {
            let operation = match event {
                Event::SelectNetwork { label } => format!("network selection '{label}'"),
                Event::SelectTab { tab } => format!("tab selection '{tab}'"),
                Event::SetFilters { .. } => "filter update".to_string(),
                Event::Refresh => "refresh".to_string(),
            };
            let mut view = render(registry, settings, state);
            view.status = Status::error(&operation, &err);
            Outcome {
                state: state.clone(),
                view,
            }
        }
    }
}

type SessionHandle = Arc<Mutex<SelectionState>>;

/// Shared registry plus independent per-session selections.
pub struct SessionManager {
    registry: Arc<RwLock<NetworkRegistry>>,
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    settings: ViewSettings,
}

impl SessionManager {
    pub fn new(registry: NetworkRegistry, settings: ViewSettings) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            sessions: RwLock::new(HashMap::new()),
            settings,
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.registry.read().list_labels()
    }

    pub fn default_label(&self) -> Option<String> {
        self.registry.read().default_label().map(str::to_string)
    }

    pub fn network(&self, label: &str) -> Result<Arc<Network>> {
        self.registry.read().get(label)
    }

    /// Parses `source` without holding the registry lock, then registers it.
    pub fn register(&self, label: &str, source: NetworkSource) -> Result<Arc<Network>> {
        if self.registry.read().contains(label) {
            return Err(ExplorerError::DuplicateLabel(label.to_string()));
        }
        let network = source.load().map_err(|source| ExplorerError::Load {
            label: label.to_string(),
            source,
        })?;
        self.registry.write().register(label, NetworkSource::Loaded(network))
    }

    pub fn create_session(&self) -> Result<(Uuid, Outcome)> {
        let registry = self.registry.read();
        let state = SelectionState::initial(&registry)?;
        let view = render(&registry, self.settings, &state);
        drop(registry);

        let id = Uuid::new_v4();
        self.sessions.write().insert(id, Arc::new(Mutex::new(state.clone())));
        info!(session = %id, network = %state.active_label, "session created");
        Ok((id, Outcome { state, view }))
    }

    pub fn close_session(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().remove(&id).is_some();
        if removed {
            info!(session = %id, "session closed");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    fn session(&self, id: Uuid) -> Result<SessionHandle> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(ExplorerError::SessionNotFound(id))
    }

    /// Runs one cycle for session `id`: mutate, then render, atomically.
    pub fn handle_event(&self, id: Uuid, event: &Event) -> Result<Outcome> {
        let session = self.session(id)?;
        let mut state = session.lock();
        let registry = self.registry.read();

        let outcome = step(&registry, self.settings, &state, event);
        if outcome.view.status.error.is_some() {
            warn!(session = %id, event = ?event, error = ?outcome.view.status.message, "event rejected");
        } else {
            debug!(session = %id, event = ?event, "event applied");
        }
        *state = outcome.state.clone();
        Ok(outcome)
    }

    pub fn current(&self, id: Uuid) -> Result<Outcome> {
        self.handle_event(id, &Event::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::demo::demo_network;
    use crate::view::StatusKind;

    fn manager(labels: &[&str]) -> SessionManager {
        let mut reg = NetworkRegistry::new();
        for label in labels {
            reg.register(*label, NetworkSource::Loaded(demo_network().unwrap())).unwrap();
        }
        SessionManager::new(reg, ViewSettings::default())
    }

    #[test]
    fn test_sessions_are_independent() {
        let m = manager(&["A", "B"]);
        let (s1, _) = m.create_session().unwrap();
        let (s2, _) = m.create_session().unwrap();

        m.handle_event(s1, &Event::SelectNetwork { label: "B".into() }).unwrap();

        assert_eq!(m.current(s1).unwrap().state.active_label, "B");
        assert_eq!(m.current(s2).unwrap().state.active_label, "A");
        assert_eq!(m.session_count(), 2);
    }

    #[test]
    fn test_rejected_event_keeps_state_and_shows_banner() {
        let m = manager(&["A"]);
        let (id, initial) = m.create_session().unwrap();

        let outcome = m
            .handle_event(id, &Event::SelectTab { tab: "nonexistent_tab".into() })
            .unwrap();
        assert_eq!(outcome.state, initial.state);
        assert_eq!(outcome.view.status.kind, StatusKind::Error);
        assert_eq!(m.current(id).unwrap().state.active_tab, Tab::EnergyBalanceTimeseries);
    }

    #[test]
    fn test_unknown_session() {
        let m = manager(&["A"]);
        let id = Uuid::new_v4();
        assert!(matches!(
            m.handle_event(id, &Event::Refresh),
            Err(ExplorerError::SessionNotFound(_))
        ));
        assert!(!m.close_session(id));
    }

    #[test]
    fn test_close_session() {
        let m = manager(&["A"]);
        let (id, _) = m.create_session().unwrap();
        assert!(m.close_session(id));
        assert!(m.current(id).is_err());
    }

    #[test]
    fn test_register_duplicate_through_manager() {
        let m = manager(&["A"]);
        let err = m
            .register("A", NetworkSource::Loaded(demo_network().unwrap()))
            .unwrap_err();
        assert!(matches!(err, ExplorerError::DuplicateLabel(_)));
        m.register("B", NetworkSource::Loaded(demo_network().unwrap())).unwrap();
        assert_eq!(m.labels(), vec!["A", "B"]);
    }

    #[test]
    fn test_render_falls_back_to_default_label() {
        let m = manager(&["A"]);
        let registry = m.registry.read();
        let mut state = SelectionState::initial(&registry).unwrap();
        state.active_label = "vanished".into();
        let view = render(&registry, ViewSettings::default(), &state);
        assert_eq!(view.network, "A");
        assert_eq!(view.status.kind, StatusKind::Ok);
    }

    #[test]
    fn test_map_tab_renders_map() {
        let m = manager(&["A"]);
        let (id, _) = m.create_session().unwrap();
        let outcome = m
            .handle_event(id, &Event::SelectTab { tab: "network_map".into() })
            .unwrap();
        assert!(outcome.view.map.is_some());
        assert!(outcome.view.figures.is_empty());
    }
}
