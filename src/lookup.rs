//! Reference lookup tables: county→basin, formation family, operator
//! aliases, and the phase-equivalence map.
//!
//! Exact-match tables compare upper-cased, trimmed keys. Formation-family
//! resolution is a substring match with an explicit precedence: longest
//! keyword first, table order as the tie-break, so resolution does not
//! depend on how the lookup file happens to be ordered.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;

use crate::{data::normalize_key, io_utils};

/// Operator aliases observed in the CAM Run Tracker extract, mapped to the
/// standard operator names. Static reference data, threaded into the
/// normalizer through [`Lookups`].
const OPERATOR_ALIASES: &[(&str, &str)] = &[
    ("Aethon Energy", "Aethon Energy Operating, LLC"),
    ("BPX", "BPX Operating Company"),
    ("COMSTOCK RESOURCES", "Comstock Oil & Gas LLP"),
    ("Camino", "Camino Resources"),
    ("Caturus Energy", "CATURUS ENERGY, LLC"),
    ("Comstock", "Comstock Oil & Gas LLP"),
    ("Comstock Resources", "Comstock Oil & Gas LLP"),
    ("Conoco", "Conoco Phillips"),
    ("ConocoPhillips", "Conoco Phillips"),
    ("Coterra", "COTERRA"),
    ("Devon", "Devon Energy"),
    ("Discovery", "DISCOVERY NATURAL RESOURCES"),
    ("Exxon", "EXXON"),
    ("Fervo", "FERVO ENERGY COMPANY"),
    ("Greenlake Energy", "GREENLAKE ENERGY"),
    ("Logos Operating LLC", "LOGOS OPERATING LLC"),
    ("Mewbourne", "Mewbourne Oil Company"),
    ("Mitsui", "MITSUI E&P USA LLC"),
    ("Ovintiv", "Ovintiv USA"),
    ("Oxy", "OXY USA"),
    ("Oxy EOR", "OXY USA"),
    ("Petro-Hunt", "PETRO-HUNT"),
    ("Summit", "Summit Petroleum"),
    ("XTO", "EXXON"),
];

#[derive(Debug, Clone)]
struct FormationEntry {
    basin: String,
    keyword: String,
    family: String,
}

#[derive(Debug, Clone, Default)]
pub struct Lookups {
    county_to_basin: HashMap<String, String>,
    formations: Vec<FormationEntry>,
    operator_aliases: Vec<(String, String)>,
}

impl Lookups {
    pub fn load(
        basins: &Path,
        formations: &Path,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let (basin_headers, basin_records) = io_utils::read_table(basins, delimiter, encoding, 1)
            .with_context(|| format!("Loading basin lookup from {basins:?}"))?;
        let (form_headers, form_records) =
            io_utils::read_table(formations, delimiter, encoding, 1)
                .with_context(|| format!("Loading formation family lookup from {formations:?}"))?;
        Self::from_tables(
            &basin_headers,
            &basin_records,
            &form_headers,
            &form_records,
        )
    }

    /// Builds the tables from in-memory rows. The basin table is laid out
    /// with one column per basin, cells listing member counties.
    pub fn from_tables(
        basin_headers: &[String],
        basin_records: &[Vec<String>],
        formation_headers: &[String],
        formation_records: &[Vec<String>],
    ) -> Result<Self> {
        let mut county_to_basin = HashMap::new();
        for record in basin_records {
            for (idx, basin) in basin_headers.iter().enumerate() {
                let county = record.get(idx).map(String::as_str).unwrap_or("").trim();
                if county.is_empty() {
                    continue;
                }
                county_to_basin.insert(normalize_key(county), basin.clone());
            }
        }

        let basin_col = column_position(formation_headers, "Basin")?;
        let keyword_col = column_position(formation_headers, "Keyword")?;
        let family_col = column_position(formation_headers, "Formation Family")?;
        let mut formations = Vec::with_capacity(formation_records.len());
        for record in formation_records {
            let basin = field(record, basin_col);
            let keyword = field(record, keyword_col);
            let family = field(record, family_col);
            if basin.is_empty() || keyword.is_empty() || family.is_empty() {
                continue;
            }
            formations.push(FormationEntry {
                basin: normalize_key(basin),
                keyword: normalize_key(keyword),
                family: family.to_string(),
            });
        }
        // Stable sort: ties keep table order.
        formations.sort_by(|a, b| b.keyword.len().cmp(&a.keyword.len()));

        Ok(Lookups {
            county_to_basin,
            formations,
            operator_aliases: OPERATOR_ALIASES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        })
    }

    pub fn basin_for_county(&self, county: &str) -> Option<&str> {
        self.county_to_basin
            .get(&normalize_key(county))
            .map(String::as_str)
    }

    /// Longest-keyword-first substring resolution of the formation family.
    pub fn formation_family(&self, basin: &str, formation: &str) -> Option<&str> {
        let basin_key = normalize_key(basin);
        let formation_key = normalize_key(formation);
        self.formations
            .iter()
            .find(|entry| entry.basin == basin_key && formation_key.contains(&entry.keyword))
            .map(|entry| entry.family.as_str())
    }

    /// Exact, case-sensitive operator alias resolution.
    pub fn standard_operator(&self, name: &str) -> Option<&str> {
        self.operator_aliases
            .iter()
            .find(|(from, _)| from == name)
            .map(|(_, to)| to.as_str())
    }

    pub fn county_count(&self) -> usize {
        self.county_to_basin.len()
    }

    pub fn formation_count(&self) -> usize {
        self.formations.len()
    }
}

/// Phase-equivalence map for the derived-consistency check: raw `PHASES`
/// text → expected `Phase_CALC` value.
pub fn load_phase_map(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<HashMap<String, String>> {
    let (headers, records) = io_utils::read_table(path, delimiter, encoding, 1)
        .with_context(|| format!("Loading phase equivalence table from {path:?}"))?;
    let phases_col = column_position(&headers, "PHASES")?;
    let calc_col = column_position(&headers, "Phase_CALC")?;
    let mut map = HashMap::new();
    for record in &records {
        let phases = field(record, phases_col);
        let calc = field(record, calc_col);
        if phases.is_empty() || calc.is_empty() {
            continue;
        }
        map.insert(phases.to_string(), calc.to_string());
    }
    Ok(map)
}

fn column_position(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow!("Lookup table is missing a '{name}' column"))
}

fn field<'a>(record: &'a [String], idx: usize) -> &'a str {
    record.get(idx).map(String::as_str).unwrap_or("").trim()
}
