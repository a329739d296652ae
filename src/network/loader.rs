//! Network parsers.
//!
//! Two on-disk layouts are understood:
//! - a CSV folder as written by PyPSA's `export_to_csv_folder` (one file per
//!   component table, `<component>-<attr>.csv` for time series, optional
//!   `meta.json`);
//! - a single JSON document holding the serde form of [`Network`].
//!
//! Every successful load goes through [`finalize`], which validates bus
//! references and series lengths and fills in missing carriers and colors.

use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use super::{carriers::ensure_carriers_defined, ComponentKind, Network, SeriesTable, Snapshot};
use crate::error::LoadError;

/// Loads a network from a CSV folder or a `.json` file.
pub fn load_path(path: &Path) -> Result<Network, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing(path.to_path_buf()));
    }

    let mut network = if path.is_dir() {
        read_csv_folder(path)?
    } else {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_slice(&bytes)?
            }
            Some(ext @ ("nc" | "h5" | "hdf5")) => {
                return Err(LoadError::UnsupportedFormat(format!(
                    ".{ext} files are not readable here; export the network with \
                     `n.export_to_csv_folder(...)` and pass the folder instead"
                )))
            }
            other => {
                return Err(LoadError::UnsupportedFormat(format!(
                    "unrecognised extension {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                )))
            }
        }
    };

    if network.name.is_empty() {
        network.name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
    }

    let network = finalize(network)?;
    info!(
        path = %path.display(),
        buses = network.buses.len(),
        snapshots = network.snapshots.len(),
        "network loaded"
    );
    Ok(network)
}

/// Parses an uploaded JSON payload.
pub fn parse_json(bytes: &[u8]) -> Result<Network, LoadError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(LoadError::Invalid("empty payload".to_string()));
    }
    let network: Network = serde_json::from_slice(bytes)?;
    finalize(network)
}

/// Validates a freshly parsed network and normalises its carrier table.
pub fn finalize(mut network: Network) -> Result<Network, LoadError> {
    if network.buses.is_empty() {
        return Err(LoadError::Invalid("network has no buses".to_string()));
    }

    let buses = network.bus_lookup();
    for (kind, component) in network.attached() {
        for bus in component.buses() {
            if !buses.contains_key(bus) {
                return Err(LoadError::Invalid(format!(
                    "{} '{}' references unknown bus '{}'",
                    kind.singular(),
                    component.name(),
                    bus
                )));
            }
        }
    }
    drop(buses);

    let expected = network.snapshots.len();
    for (kind, attrs) in &network.series {
        for (attr, table) in attrs {
            if let Some((name, values)) = table.iter().find(|(_, v)| v.len() != expected) {
                return Err(LoadError::Invalid(format!(
                    "series {kind}-{attr} for '{name}' has {} values, expected {expected}",
                    values.len()
                )));
            }
        }
    }

    ensure_carriers_defined(&mut network);
    Ok(network)
}

fn read_csv_folder(dir: &Path) -> Result<Network, LoadError> {
    let mut network = Network {
        buses: read_table(dir, "buses.csv")?,
        carriers: read_table(dir, "carriers.csv")?,
        generators: read_table(dir, "generators.csv")?,
        loads: read_table(dir, "loads.csv")?,
        lines: read_table(dir, "lines.csv")?,
        links: read_table(dir, "links.csv")?,
        storage_units: read_table(dir, "storage_units.csv")?,
        stores: read_table(dir, "stores.csv")?,
        snapshots: read_table(dir, "snapshots.csv")?,
        ..Default::default()
    };

    let meta = dir.join("meta.json");
    if meta.is_file() {
        let bytes = std::fs::read(&meta).map_err(|source| LoadError::Io { path: meta, source })?;
        network.meta = serde_json::from_slice(&bytes)?;
    }

    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut series_files: Vec<(ComponentKind, String, std::path::PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let file_name = entry.file_name();
        let Some(stem) = file_name.to_str().and_then(|f| f.strip_suffix(".csv")) else {
            continue;
        };
        let Some((component, attr)) = stem.split_once('-') else {
            continue;
        };
        if let Ok(kind) = ComponentKind::from_str(component) {
            series_files.push((kind, attr.to_string(), entry.path()));
        }
    }
    series_files.sort();

    for (kind, attr, path) in series_files {
        let (index, table) = read_series(&path)?;
        if network.snapshots.is_empty() {
            network.snapshots = index
                .into_iter()
                .map(|name| Snapshot { name, weight: None })
                .collect();
        }
        debug!(component = %kind, attr = %attr, columns = table.len(), "series loaded");
        network.series.entry(kind).or_default().insert(attr, table);
    }

    Ok(network)
}

fn read_table<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>, LoadError> {
    let path = dir.join(file);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(&path)
        .map_err(|source| LoadError::Csv {
            file: file.to_string(),
            source,
        })?;
    rdr.deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| LoadError::Csv {
            file: file.to_string(),
            source,
        })
}

/// Reads a `<component>-<attr>.csv` file: first column is the snapshot, the
/// remaining columns are component names. Empty cells read as zero.
fn read_series(path: &Path) -> Result<(Vec<String>, SeriesTable), LoadError> {
    let file = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or_default()
        .to_string();
    let csv_err = |source: csv::Error| LoadError::Csv {
        file: file.clone(),
        source,
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = rdr.headers().map_err(csv_err)?.clone();
    let names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut index = Vec::new();
    let mut columns: BTreeMap<String, Vec<f64>> =
        names.iter().map(|n| (n.clone(), Vec::new())).collect();

    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        index.push(record.get(0).unwrap_or_default().to_string());
        for (name, cell) in names.iter().zip(record.iter().skip(1)) {
            let value = if cell.trim().is_empty() {
                0.0
            } else {
                cell.trim().parse::<f64>().map_err(|e| {
                    LoadError::Invalid(format!("{file}: bad value '{cell}' for '{name}': {e}"))
                })?
            };
            if let Some(column) = columns.get_mut(name) {
                column.push(value);
            }
        }
    }

    Ok((index, columns))
}
