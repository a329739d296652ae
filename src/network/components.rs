use serde::{Deserialize, Serialize};

/// Common view over every component table that references buses and a carrier.
pub trait Component {
    fn name(&self) -> &str;
    fn carrier(&self) -> &str;
    /// Buses this component is attached to, in port order.
    fn buses(&self) -> Vec<&str>;
}

fn default_ac() -> String {
    "AC".to_string()
}

// ============================================================================
// Nodes & carriers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    #[serde(alias = "Bus")]
    pub name: String,
    #[serde(default = "default_ac")]
    pub carrier: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub v_nom: Option<f64>,
}

impl Bus {
    /// Longitude/latitude pair, `None` when the bus is not placed.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.x?, self.y?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    #[serde(alias = "Carrier")]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub nice_name: Option<String>,
    #[serde(default)]
    pub co2_emissions: Option<f64>,
}

impl Carrier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
            nice_name: None,
            co2_emissions: None,
        }
    }
}

// ============================================================================
// One-port components
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    #[serde(alias = "Generator")]
    pub name: String,
    pub bus: String,
    #[serde(default)]
    pub carrier: String,
    #[serde(default)]
    pub p_nom: Option<f64>,
    #[serde(default)]
    pub p_nom_opt: Option<f64>,
    #[serde(default)]
    pub capital_cost: Option<f64>,
    #[serde(default)]
    pub marginal_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    #[serde(alias = "Load")]
    pub name: String,
    pub bus: String,
    #[serde(default)]
    pub carrier: String,
    #[serde(default)]
    pub p_set: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageUnit {
    #[serde(alias = "StorageUnit")]
    pub name: String,
    pub bus: String,
    #[serde(default)]
    pub carrier: String,
    #[serde(default)]
    pub p_nom: Option<f64>,
    #[serde(default)]
    pub p_nom_opt: Option<f64>,
    #[serde(default)]
    pub max_hours: Option<f64>,
    #[serde(default)]
    pub capital_cost: Option<f64>,
    #[serde(default)]
    pub marginal_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(alias = "Store")]
    pub name: String,
    pub bus: String,
    #[serde(default)]
    pub carrier: String,
    #[serde(default)]
    pub e_nom: Option<f64>,
    #[serde(default)]
    pub e_nom_opt: Option<f64>,
    #[serde(default)]
    pub capital_cost: Option<f64>,
    #[serde(default)]
    pub marginal_cost: Option<f64>,
}

// ============================================================================
// Branches
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    #[serde(alias = "Line")]
    pub name: String,
    pub bus0: String,
    pub bus1: String,
    #[serde(default = "default_ac")]
    pub carrier: String,
    #[serde(default)]
    pub s_nom: Option<f64>,
    #[serde(default)]
    pub s_nom_opt: Option<f64>,
    #[serde(default)]
    pub capital_cost: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(alias = "Link")]
    pub name: String,
    pub bus0: String,
    pub bus1: String,
    #[serde(default)]
    pub carrier: String,
    #[serde(default)]
    pub p_nom: Option<f64>,
    #[serde(default)]
    pub p_nom_opt: Option<f64>,
    #[serde(default)]
    pub efficiency: Option<f64>,
    #[serde(default)]
    pub capital_cost: Option<f64>,
    #[serde(default)]
    pub marginal_cost: Option<f64>,
}

macro_rules! one_port {
    ($($ty:ty),+) => {$(
        impl Component for $ty {
            fn name(&self) -> &str { &self.name }
            fn carrier(&self) -> &str { &self.carrier }
            fn buses(&self) -> Vec<&str> { vec![self.bus.as_str()] }
        }
    )+};
}

macro_rules! branch {
    ($($ty:ty),+) => {$(
        impl Component for $ty {
            fn name(&self) -> &str { &self.name }
            fn carrier(&self) -> &str { &self.carrier }
            fn buses(&self) -> Vec<&str> { vec![self.bus0.as_str(), self.bus1.as_str()] }
        }
    )+};
}

one_port!(Generator, Load, StorageUnit, Store);
branch!(Line, Link);

impl Component for Bus {
    fn name(&self) -> &str {
        &self.name
    }
    fn carrier(&self) -> &str {
        &self.carrier
    }
    fn buses(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// Snapshot label plus its objective weighting (hours represented).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(alias = "snapshot")]
    pub name: String,
    #[serde(default, alias = "objective")]
    pub weight: Option<f64>,
}

impl Snapshot {
    pub fn weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}
