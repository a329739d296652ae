use super::{loader, Network};
use crate::error::LoadError;

/// Label used when the demo network is the only one loaded.
pub const DEMO_LABEL: &str = "Network";

const DEMO_JSON: &str = include_str!("../../data/demo-network.json");

/// Three-node sector-coupled example compiled into the binary.
pub fn demo_network() -> Result<Network, LoadError> {
    loader::parse_json(DEMO_JSON.as_bytes())
}
