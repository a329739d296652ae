//! Dashboard service for browsing PyPSA energy system networks.
//!
//! Networks are loaded once into a [`registry::NetworkRegistry`] and shared
//! read-only. Each browser session keeps its own [`selection::SelectionState`]
//! and every interaction runs through [`session::step`]: apply the event,
//! query the [`accessors`], and assemble a [`view::RenderedView`].

pub mod accessors;
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod network;
pub mod registry;
pub mod selection;
pub mod session;
pub mod statistics;
pub mod telemetry;
pub mod view;

pub use error::{ExplorerError, LoadError, Result};
