use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ExplorerError, LoadError, Result};
use crate::network::{self, demo, Network};

/// Where a registered network comes from.
#[derive(Debug)]
pub enum NetworkSource {
    /// CSV folder or `.json` file on disk.
    Path(PathBuf),
    /// Uploaded JSON payload.
    Bytes(Vec<u8>),
    /// Already constructed network.
    Loaded(Network),
}

impl NetworkSource {
    /// Parses the source into a validated network.
    pub fn load(self) -> std::result::Result<Network, LoadError> {
        match self {
            NetworkSource::Path(path) => network::load_path(&path),
            NetworkSource::Bytes(bytes) => network::parse_json(&bytes),
            NetworkSource::Loaded(n) => network::loader::finalize(n),
        }
    }
}

/// A `PATH[:LABEL]` request from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRequest {
    pub label: String,
    pub path: PathBuf,
}

impl NetworkRequest {
    /// Splits on the first `:`; without a label the file stem is used.
    pub fn parse(arg: &str) -> Self {
        match arg.split_once(':') {
            Some((path, label)) => Self {
                label: label.to_string(),
                path: PathBuf::from(path),
            },
            None => {
                let path = PathBuf::from(arg);
                let label = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(arg)
                    .to_string();
                Self { label, path }
            }
        }
    }
}

/// Label -> immutable network handle, in insertion order.
///
/// Labels are unique: registering an existing label is rejected rather than
/// silently replacing the handle sessions may already be reading.
#[derive(Debug, Default)]
pub struct NetworkRegistry {
    entries: Vec<(String, Arc<Network>)>,
    index: HashMap<String, usize>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `source` eagerly and stores it under `label`.
    pub fn register(&mut self, label: impl Into<String>, source: NetworkSource) -> Result<Arc<Network>> {
        let label = label.into();
        if self.index.contains_key(&label) {
            return Err(ExplorerError::DuplicateLabel(label));
        }

        let network = source.load().map_err(|source| ExplorerError::Load {
            label: label.clone(),
            source,
        })?;
        let handle = Arc::new(network);

        self.index.insert(label.clone(), self.entries.len());
        self.entries.push((label.clone(), handle.clone()));
        info!(%label, total = self.entries.len(), "network registered");
        Ok(handle)
    }

    pub fn get(&self, label: &str) -> Result<Arc<Network>> {
        self.index
            .get(label)
            .map(|&i| self.entries[i].1.clone())
            .ok_or_else(|| ExplorerError::NotFound(label.to_string()))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn list_labels(&self) -> Vec<String> {
        self.entries.iter().map(|(label, _)| label.clone()).collect()
    }

    pub fn default_label(&self) -> Option<&str> {
        self.entries.first().map(|(label, _)| label.as_str())
    }

    /// The handle for `label`, or the default one when `label` is unknown.
    pub fn resolve(&self, label: &str) -> Result<(String, Arc<Network>)> {
        if let Ok(handle) = self.get(label) {
            return Ok((label.to_string(), handle));
        }
        let (default, handle) = self.entries.first().ok_or(ExplorerError::NoNetworks)?;
        warn!(requested = %label, fallback = %default, "unknown network label, using default");
        Ok((default.clone(), handle.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Startup loading policy.
    ///
    /// - no requests: the bundled demo network, fatal on failure;
    /// - one request: fatal on failure;
    /// - several requests: failures are skipped with a warning, fatal only
    ///   when none load.
    pub fn from_requests(requests: &[NetworkRequest]) -> Result<Self> {
        let mut registry = Self::new();

        if requests.is_empty() {
            let network = demo::demo_network().map_err(|source| ExplorerError::Load {
                label: demo::DEMO_LABEL.to_string(),
                source,
            })?;
            registry.register(demo::DEMO_LABEL, NetworkSource::Loaded(network))?;
            return Ok(registry);
        }

        if let [only] = requests {
            registry.register(only.label.clone(), NetworkSource::Path(only.path.clone()))?;
            return Ok(registry);
        }

        for request in requests {
            if let Err(e) = registry.register(
                request.label.clone(),
                NetworkSource::Path(request.path.clone()),
            ) {
                warn!(label = %request.label, path = %request.path.display(), error = %e, "skipping network");
            }
        }

        if registry.is_empty() {
            return Err(ExplorerError::NoNetworks);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn demo() -> NetworkSource {
        NetworkSource::Loaded(demo::demo_network().unwrap())
    }

    #[rstest]
    #[case("/data/elec.json:Region1", "Region1", "/data/elec.json")]
    #[case("/data/elec_s_37.json", "elec_s_37", "/data/elec_s_37.json")]
    #[case("nets/base:Base Case", "Base Case", "nets/base")]
    fn test_parse_request(#[case] arg: &str, #[case] label: &str, #[case] path: &str) {
        let req = NetworkRequest::parse(arg);
        assert_eq!(req.label, label);
        assert_eq!(req.path, PathBuf::from(path));
    }

    #[test]
    fn test_get_returns_same_handle() {
        let mut reg = NetworkRegistry::new();
        let registered = reg.register("Base", demo()).unwrap();
        let a = reg.get("Base").unwrap();
        let b = reg.get("Base").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &registered));
    }

    #[test]
    fn test_labels_keep_insertion_order() {
        let mut reg = NetworkRegistry::new();
        for label in ["zeta", "alpha", "mid"] {
            reg.register(label, demo()).unwrap();
        }
        assert_eq!(reg.list_labels(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(reg.default_label(), Some("zeta"));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let mut reg = NetworkRegistry::new();
        let first = reg.register("A", demo()).unwrap();
        let err = reg.register("A", demo()).unwrap_err();
        assert!(matches!(err, ExplorerError::DuplicateLabel(_)));
        assert!(Arc::ptr_eq(&first, &reg.get("A").unwrap()));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let reg = NetworkRegistry::new();
        assert!(matches!(reg.get("nope"), Err(ExplorerError::NotFound(_))));
        assert!(matches!(reg.resolve("nope"), Err(ExplorerError::NoNetworks)));
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let mut reg = NetworkRegistry::new();
        reg.register("A", demo()).unwrap();
        reg.register("B", demo()).unwrap();
        let (label, _) = reg.resolve("gone").unwrap();
        assert_eq!(label, "A");
        let (label, handle) = reg.resolve("B").unwrap();
        assert_eq!(label, "B");
        assert!(Arc::ptr_eq(&handle, &reg.get("B").unwrap()));
    }

    #[test]
    fn test_bad_bytes_are_load_errors() {
        let mut reg = NetworkRegistry::new();
        let err = reg.register("bad", NetworkSource::Bytes(b"{oops".to_vec())).unwrap_err();
        assert!(matches!(err, ExplorerError::Load { .. }));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_startup_policy() {
        let reg = NetworkRegistry::from_requests(&[]).unwrap();
        assert_eq!(reg.list_labels(), vec![demo::DEMO_LABEL]);

        let missing = NetworkRequest::parse("/no/such/file.json:Missing");
        assert!(matches!(
            NetworkRegistry::from_requests(&[missing.clone()]),
            Err(ExplorerError::Load { .. })
        ));
        assert!(matches!(
            NetworkRegistry::from_requests(&[missing.clone(), missing]),
            Err(ExplorerError::NoNetworks)
        ));
    }

    #[test]
    fn test_startup_skips_failing_network_among_several() {
        let tmp = tempfile::TempDir::new().unwrap();
        let good = tmp.path().join("good.json");
        std::fs::write(&good, r#"{"buses": [{"name": "b0"}]}"#).unwrap();

        let requests = vec![
            NetworkRequest::parse(&format!("{}:Good", good.display())),
            NetworkRequest::parse("/no/such/file.json:Missing"),
        ];
        let reg = NetworkRegistry::from_requests(&requests).unwrap();
        assert_eq!(reg.list_labels(), vec!["Good"]);
    }
}
