//! Schema mapping resolution.
//!
//! The mapping specification is one CSV table: its header row is the
//! canonical schema (led by `SOURCE`), and each data row, keyed by source
//! identifier, names the source column feeding each canonical column. A
//! cell that is blank or carries the `Not Present` sentinel contributes no
//! mapping.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use log::warn;

use crate::{canon, config::ConfigError, io_utils, source::SourceKind};

const NOT_PRESENT: &str = "Not Present";

/// Source column name → canonical column name, for one source.
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    renames: HashMap<String, String>,
}

impl ColumnMapping {
    pub fn canonical_for(&self, source_column: &str) -> Option<&str> {
        self.renames.get(source_column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.renames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.renames
            .iter()
            .map(|(source, canonical)| (source.as_str(), canonical.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct MappingSpec {
    canonical: Vec<String>,
    mappings: HashMap<SourceKind, ColumnMapping>,
}

impl MappingSpec {
    pub fn load(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let (headers, records) = io_utils::read_table(path, delimiter, encoding, 1)
            .with_context(|| format!("Loading mapping specification from {path:?}"))?;
        Self::from_table(&headers, &records)
            .with_context(|| format!("Resolving mapping specification {path:?}"))
    }

    pub fn from_table(headers: &[String], records: &[Vec<String>]) -> Result<Self> {
        match headers.first() {
            Some(first) if first == canon::SOURCE => {}
            other => {
                return Err(anyhow!(
                    "Mapping specification must lead with a '{}' column, found {other:?}",
                    canon::SOURCE
                ));
            }
        }

        let mut mappings = HashMap::new();
        for record in records {
            let source_id = record
                .first()
                .map(String::as_str)
                .unwrap_or_default();
            if source_id.trim().is_empty() {
                continue;
            }
            let kind = SourceKind::parse(source_id)?;
            let mut mapping = ColumnMapping::default();
            for (idx, canonical) in headers.iter().enumerate().skip(1) {
                let cell = record.get(idx).map(String::as_str).unwrap_or("").trim();
                if cell.is_empty() || cell.contains(NOT_PRESENT) {
                    continue;
                }
                if let Some(previous) =
                    mapping.renames.insert(cell.to_string(), canonical.clone())
                {
                    // Last write wins, matching rename semantics downstream.
                    warn!(
                        "Source '{kind}' maps column '{cell}' to both '{previous}' and '{canonical}'"
                    );
                }
            }
            mappings.insert(kind, mapping);
        }

        Ok(MappingSpec {
            canonical: headers.to_vec(),
            mappings,
        })
    }

    /// The canonical schema in output order, `SOURCE` included.
    pub fn canonical_columns(&self) -> &[String] {
        &self.canonical
    }

    pub fn mapping_for(&self, kind: SourceKind) -> Result<&ColumnMapping, ConfigError> {
        self.mappings
            .get(&kind)
            .ok_or(ConfigError::SourceNotMapped { kind })
    }

    pub fn mapped_sources(&self) -> impl Iterator<Item = SourceKind> + '_ {
        self.mappings.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_fixture() -> MappingSpec {
        let headers: Vec<String> = ["SOURCE", "WELL_NAME", "OPERATOR", "BEND"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let records = vec![
            vec![
                "Motor_KPI".to_string(),
                "Well Name".to_string(),
                "Operator".to_string(),
                "Not Present".to_string(),
            ],
            vec![
                "CAM_Run_Tracker".to_string(),
                "Well".to_string(),
                String::new(),
                "Bend".to_string(),
            ],
        ];
        MappingSpec::from_table(&headers, &records).expect("resolve spec")
    }

    #[test]
    fn canonical_schema_is_the_header_row() {
        let spec = spec_fixture();
        assert_eq!(
            spec.canonical_columns(),
            &["SOURCE", "WELL_NAME", "OPERATOR", "BEND"]
        );
    }

    #[test]
    fn not_present_and_blank_cells_are_skipped() {
        let spec = spec_fixture();
        let motor = spec.mapping_for(SourceKind::MotorKpi).expect("motor mapping");
        assert_eq!(motor.canonical_for("Well Name"), Some("WELL_NAME"));
        assert_eq!(motor.canonical_for("Operator"), Some("OPERATOR"));
        assert_eq!(motor.len(), 2);

        let cam = spec
            .mapping_for(SourceKind::CamRunTracker)
            .expect("cam mapping");
        assert_eq!(cam.canonical_for("Bend"), Some("BEND"));
        assert_eq!(cam.len(), 2);
    }

    #[test]
    fn unmapped_source_is_a_config_error() {
        let spec = spec_fixture();
        assert!(matches!(
            spec.mapping_for(SourceKind::PogMmUsage),
            Err(ConfigError::SourceNotMapped { .. })
        ));
    }

    #[test]
    fn missing_source_lead_column_is_fatal() {
        let headers: Vec<String> = ["WELL_NAME", "OPERATOR"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(MappingSpec::from_table(&headers, &[]).is_err());
    }
}
