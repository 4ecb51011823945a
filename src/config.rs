//! Merge-run configuration.
//!
//! A YAML document names the mapping specification, the lookup tables, and
//! the source extracts to consolidate. Relative paths are resolved against
//! the config file's directory so a run folder can be shipped as a unit.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::source::SourceKind;

/// Fatal configuration problems. Any of these aborts the run before output
/// is produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot parse configuration file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Configuration lists no sources to merge")]
    NoSources,
    #[error("Source '{kind}' is listed more than once")]
    DuplicateSource { kind: SourceKind },
    #[error("Source '{kind}' has no row in the mapping specification")]
    SourceNotMapped { kind: SourceKind },
    #[error("Column '{column}' has an unrecognized rule: '{rule}'")]
    UnknownRule { column: String, rule: String },
}

fn default_header_row() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSpec {
    pub kind: SourceKind,
    pub path: PathBuf,
    /// 1-based row holding the real headers; rows above it are banner junk.
    #[serde(default = "default_header_row")]
    pub header_row: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    /// Mapping specification CSV (canonical header row + one row per source).
    pub mapping: PathBuf,
    /// County-to-basin lookup CSV (one column per basin).
    pub basins: PathBuf,
    /// Formation-family lookup CSV (`Basin,Keyword,Formation Family`).
    pub formations: PathBuf,
    pub sources: Vec<SourceSpec>,
}

impl MergeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: MergeConfig = serde_yaml::from_reader(BufReader::new(file))
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if config.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        for (idx, spec) in config.sources.iter().enumerate() {
            if config.sources[..idx].iter().any(|s| s.kind == spec.kind) {
                return Err(ConfigError::DuplicateSource { kind: spec.kind });
            }
        }
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.mapping = resolve(base, &self.mapping);
        self.basins = resolve(base, &self.basins);
        self.formations = resolve(base, &self.formations);
        for spec in &mut self.sources {
            spec.path = resolve(base, &spec.path);
        }
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::tempdir;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("merge.yaml");
        let mut file = File::create(&path).expect("create config");
        file.write_all(contents.as_bytes()).expect("write config");
        path
    }

    #[test]
    fn load_resolves_relative_paths_against_config_dir() {
        let dir = tempdir().expect("temp dir");
        let path = write_config(
            &dir,
            "mapping: mapping.csv\nbasins: basins.csv\nformations: formfam.csv\nsources:\n  - kind: Motor_KPI\n    path: motor_kpi.csv\n  - kind: POG_CAM_Usage\n    path: pog_cam.csv\n    header_row: 2\n",
        );
        let config = MergeConfig::load(&path).expect("load config");
        assert_eq!(config.mapping, dir.path().join("mapping.csv"));
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].header_row, 1);
        assert_eq!(config.sources[1].header_row, 2);
        assert_eq!(config.sources[1].kind, SourceKind::PogCamUsage);
    }

    #[test]
    fn load_rejects_empty_source_lists() {
        let dir = tempdir().expect("temp dir");
        let path = write_config(
            &dir,
            "mapping: m.csv\nbasins: b.csv\nformations: f.csv\nsources: []\n",
        );
        assert!(matches!(
            MergeConfig::load(&path),
            Err(ConfigError::NoSources)
        ));
    }

    #[test]
    fn load_rejects_duplicate_sources() {
        let dir = tempdir().expect("temp dir");
        let path = write_config(
            &dir,
            "mapping: m.csv\nbasins: b.csv\nformations: f.csv\nsources:\n  - kind: Motor_KPI\n    path: a.csv\n  - kind: Motor_KPI\n    path: b.csv\n",
        );
        assert!(matches!(
            MergeConfig::load(&path),
            Err(ConfigError::DuplicateSource { .. })
        ));
    }

    #[test]
    fn load_rejects_unknown_source_kinds() {
        let dir = tempdir().expect("temp dir");
        let path = write_config(
            &dir,
            "mapping: m.csv\nbasins: b.csv\nformations: f.csv\nsources:\n  - kind: Mud_Log\n    path: a.csv\n",
        );
        assert!(matches!(MergeConfig::load(&path), Err(ConfigError::Parse { .. })));
    }
}
