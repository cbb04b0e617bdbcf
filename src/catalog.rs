// src/catalog.rs

use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::error::CatalogError;
use crate::pipeline::PipelineConfig;

/// One selectable commodity and the trade table behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub path: PathBuf,
}

/// YAML file listing commodities, plus optional pipeline settings.
///
/// ```yaml
/// settings:
///   horizon: 3
/// commodities:
///   - name: Natural Graphite
///     path: graphite_exim.csv
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub settings: PipelineConfig,
    pub commodities: Vec<CatalogEntry>,
}

impl Catalog {
    /// Parse `path`; relative entry paths are resolved against its directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut catalog: Catalog =
            serde_yaml::from_str(&text).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut seen = HashSet::new();
        for entry in &mut catalog.commodities {
            entry.name = entry.name.trim().to_string();
            if !seen.insert(entry.name.to_ascii_lowercase()) {
                return Err(CatalogError::DuplicateName(entry.name.clone()));
            }
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
        }
        info!(
            catalog = %path.display(),
            commodities = catalog.commodities.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// Look up by name, ignoring case and surrounding whitespace.
    pub fn find(&self, name: &str) -> Result<&CatalogEntry, CatalogError> {
        let wanted = name.trim();
        self.commodities
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CatalogError::UnknownCommodity(wanted.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commodities.iter().map(|e| e.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::DuplicatePolicy;
    use tempfile::tempdir;

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("minerals.yaml");
        fs::write(
            &file,
            r#"
settings:
  horizon: 4
  duplicate_policy: keep_last
  forecast:
    growth_multipliers: [1.05, 1.1]
commodities:
  - name: " Natural Graphite"
    path: graphite_exim.csv
  - name: copper_oxide
    path: /data/copper_ores_exim.csv
"#,
        )
        .unwrap();

        let catalog = Catalog::load(&file).unwrap();
        assert_eq!(catalog.settings.horizon, 4);
        assert_eq!(catalog.settings.duplicate_policy, DuplicatePolicy::KeepLast);
        assert_eq!(catalog.settings.forecast.growth_multipliers, vec![1.05, 1.1]);
        assert_eq!(catalog.settings.forecast.min_points, 5);

        let graphite = catalog.find("natural graphite").unwrap();
        assert_eq!(graphite.path, dir.path().join("graphite_exim.csv"));
        assert_eq!(
            catalog.find("copper_oxide").unwrap().path,
            PathBuf::from("/data/copper_ores_exim.csv")
        );
        assert_eq!(
            catalog.names().collect::<Vec<_>>(),
            vec!["Natural Graphite", "copper_oxide"]
        );
    }

    #[test]
    fn test_settings_default_when_absent() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("c.yaml");
        fs::write(&file, "commodities: []\n").unwrap();
        let catalog = Catalog::load(&file).unwrap();
        assert_eq!(catalog.settings, PipelineConfig::default());
    }

    #[test]
    fn test_unknown_and_duplicate_names() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("c.yaml");
        fs::write(
            &file,
            "commodities:\n  - {name: a, path: a.csv}\n  - {name: a, path: b.csv}\n",
        )
        .unwrap();
        assert!(matches!(
            Catalog::load(&file),
            Err(CatalogError::DuplicateName(n)) if n == "a"
        ));

        let catalog = Catalog::default();
        assert!(matches!(
            catalog.find("lithium"),
            Err(CatalogError::UnknownCommodity(_))
        ));
    }
}
