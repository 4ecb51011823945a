//! Per-source normalization into the canonical schema.
//!
//! Each raw extract goes through the same fixed sequence: rename mapped
//! columns, apply the source's repair rules (identifier fallback, run
//! window split, bend collapse, job-type passthrough), clean county/state
//! text, standardize operator names, and tag every row with its source.
//! Every repair obeys the fill-once rule: a fallback value only lands in a
//! canonical column that is wholly absent or blank.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use regex::Regex;

use crate::{
    canon,
    data::{Cell, Value, cell_text, is_blank, parse_naive_date, parse_naive_datetime},
    frame::Frame,
    lookup::Lookups,
    mapping::ColumnMapping,
    source::SourceKind,
};

/// Extracts a trailing two-letter state code and strips the words
/// "County"/"Parish" from a county field.
pub struct CountyStateExtractor {
    state: Regex,
    county_word: Regex,
    parish_word: Regex,
}

impl CountyStateExtractor {
    pub fn new() -> Result<Self> {
        Ok(CountyStateExtractor {
            state: Regex::new(r"\s+([A-Z]{2})$").context("Compiling state suffix pattern")?,
            county_word: Regex::new(r"(?i)\s+County\s*")
                .context("Compiling county word pattern")?,
            parish_word: Regex::new(r"(?i)\s+Parish\s*")
                .context("Compiling parish word pattern")?,
        })
    }

    /// Returns `(state, cleaned_county)`. Values with no trailing state
    /// code pass through with only the County/Parish words removed.
    pub fn extract(&self, raw: &str) -> (Option<String>, String) {
        let mut text = raw.trim().to_string();
        let mut state = None;
        if let Some(captures) = self.state.captures(&text) {
            state = Some(captures[1].to_string());
            text = self.state.replace(&text, "").into_owned();
        }
        text = self.county_word.replace_all(&text, " ").into_owned();
        text = self.parish_word.replace_all(&text, " ").into_owned();
        let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
        (state, cleaned)
    }
}

pub struct Normalizer<'a> {
    lookups: &'a Lookups,
    county: CountyStateExtractor,
}

impl<'a> Normalizer<'a> {
    pub fn new(lookups: &'a Lookups) -> Result<Self> {
        Ok(Normalizer {
            lookups,
            county: CountyStateExtractor::new()?,
        })
    }

    /// Turns one raw extract into canonical-schema rows tagged with their
    /// source.
    pub fn normalize(
        &self,
        kind: SourceKind,
        headers: &[String],
        records: &[Vec<String>],
        mapping: &ColumnMapping,
    ) -> Result<Frame> {
        let raw = Raw { headers, records };
        let mut frame = Frame::with_blank_rows(records.len());

        // Rename pass. Fill-once guards the case of two source columns
        // claiming the same canonical column.
        for (idx, header) in headers.iter().enumerate() {
            if let Some(canonical) = mapping.canonical_for(header) {
                frame.fill_column(canonical, raw.column(idx));
            }
        }

        match kind {
            SourceKind::MotorKpi => self.repair_motor_kpi(&mut frame, &raw),
            SourceKind::CamRunTracker => self.repair_cam_run_tracker(&mut frame, &raw),
            SourceKind::PogCamUsage | SourceKind::PogMmUsage => {
                self.repair_pog_usage(&mut frame, &raw);
            }
        }

        match kind {
            SourceKind::MotorKpi | SourceKind::PogCamUsage | SourceKind::PogMmUsage => {
                self.clean_counties(&mut frame);
            }
            SourceKind::CamRunTracker => self.standardize_operators(&mut frame),
        }

        frame.ensure_column(canon::SOURCE);
        for row in 0..frame.row_count() {
            frame.set(row, canon::SOURCE, Some(Value::Text(kind.id().to_string())));
        }

        Ok(frame)
    }

    fn repair_motor_kpi(&self, frame: &mut Frame, raw: &Raw<'_>) {
        // The raw BHA run number may have been mapped elsewhere; keep it
        // available under the canonical identifier.
        if let Some(cells) = raw.named_column("BHA") {
            frame.fill_column(canon::BHA, cells);
        }
        if let Some(cells) = raw.named_column("DATEIN") {
            frame.fill_column(canon::DATE_IN, cells);
        }
        if let Some(cells) = raw.named_column("DATEOUT") {
            frame.fill_column(canon::DATE_OUT, cells);
        }
        if let Some(cells) = raw.named_column("BENDANGLE") {
            if frame.fill_column(canon::BEND, cells) {
                let bend = frame.column_cells(canon::BEND);
                frame.fill_column(canon::BEND_HSG, bend);
            }
        }
    }

    fn repair_cam_run_tracker(&self, frame: &mut Frame, raw: &Raw<'_>) {
        if let Some(cells) = raw.named_column("Run #") {
            frame.fill_column(canon::BHA, cells);
        }
        if let Some(cells) = raw.named_column("Start of Run") {
            let (dates, times) = split_run_window(&cells);
            frame.fill_column(canon::DATE_IN, dates);
            frame.fill_column(canon::TIME_IN, times);
        }
        if let Some(cells) = raw.named_column("End of Run") {
            let (dates, times) = split_run_window(&cells);
            frame.fill_column(canon::DATE_OUT, dates);
            frame.fill_column(canon::TIME_OUT, times);
        }
        if let Some(cells) = raw.named_column("Bend") {
            if frame.fill_column(canon::BEND, cells) {
                let bend = frame.column_cells(canon::BEND);
                frame.fill_column(canon::BEND_HSG, bend);
            }
        }
    }

    fn repair_pog_usage(&self, frame: &mut Frame, raw: &Raw<'_>) {
        if let Some(cells) = raw.named_column("Brt Date") {
            frame.fill_column(canon::DATE_IN, coerce_dates(&cells));
        }
        if let Some(cells) = raw.named_column("Art Date") {
            frame.fill_column(canon::DATE_OUT, coerce_dates(&cells));
        }

        let fixed = raw.named_column("Fixed");
        let adjustable = raw.named_column("Adjustable");
        if fixed.is_some() || adjustable.is_some() {
            let count = frame.row_count();
            let fixed = fixed.unwrap_or_else(|| vec![None; count]);
            let adjustable = adjustable.unwrap_or_else(|| vec![None; count]);
            let bend: Vec<Cell> = fixed
                .into_iter()
                .zip(adjustable)
                .map(|(f, a)| if is_blank(&f) { a } else { f })
                .collect();
            frame.fill_column(canon::BEND, bend);
            let resolved = frame.column_cells(canon::BEND);
            frame.fill_column(canon::BEND_HSG, resolved);
        }

        if let Some(cells) = raw.named_column("Job Type") {
            frame.fill_column(canon::JOB_TYPE, cells);
        }
    }

    /// County fields in the KPI and POG extracts encode a trailing state
    /// code plus County/Parish words. The extracted state fills the STATE
    /// cell only where it is currently blank.
    fn clean_counties(&self, frame: &mut Frame) {
        if !frame.has_column(canon::COUNTY) {
            return;
        }
        for row in 0..frame.row_count() {
            let Some(county) = cell_text(frame.get(row, canon::COUNTY)) else {
                continue;
            };
            let (state, cleaned) = self.county.extract(&county);
            frame.set(row, canon::COUNTY, Some(Value::Text(cleaned)));
            if let Some(code) = state {
                frame.fill_cell_if_blank(row, canon::STATE, Some(Value::Text(code)));
            }
        }
    }

    /// Exact-match operator alias rewriting. Idempotent: alias targets are
    /// never themselves alias keys.
    fn standardize_operators(&self, frame: &mut Frame) {
        if !frame.has_column(canon::OPERATOR) {
            return;
        }
        for row in 0..frame.row_count() {
            let Some(Value::Text(name)) = frame.get(row, canon::OPERATOR).clone() else {
                continue;
            };
            if let Some(standard) = self.lookups.standard_operator(&name) {
                frame.set(row, canon::OPERATOR, Some(Value::Text(standard.to_string())));
            }
        }
    }
}

struct Raw<'a> {
    headers: &'a [String],
    records: &'a [Vec<String>],
}

impl Raw<'_> {
    fn column(&self, idx: usize) -> Vec<Cell> {
        self.records
            .iter()
            .map(|record| {
                let raw = record.get(idx).map(String::as_str).unwrap_or("");
                if raw.trim().is_empty() {
                    None
                } else {
                    Some(Value::Text(raw.to_string()))
                }
            })
            .collect()
    }

    fn named_column(&self, name: &str) -> Option<Vec<Cell>> {
        self.headers
            .iter()
            .position(|header| header == name)
            .map(|idx| self.column(idx))
    }
}

/// Splits a combined run timestamp into date and time cells. A date-only
/// value reads as midnight; unparseable values yield nulls for both.
fn split_run_window(cells: &[Cell]) -> (Vec<Cell>, Vec<Cell>) {
    let mut dates = Vec::with_capacity(cells.len());
    let mut times = Vec::with_capacity(cells.len());
    for cell in cells {
        let parsed = cell_text(cell).and_then(|text| {
            parse_naive_datetime(&text)
                .ok()
                .or_else(|| parse_naive_date(&text).ok().map(|d| d.and_time(NaiveTime::MIN)))
        });
        match parsed {
            Some(dt) => {
                dates.push(Some(Value::Date(dt.date())));
                times.push(Some(Value::Time(dt.time())));
            }
            None => {
                dates.push(None);
                times.push(None);
            }
        }
    }
    (dates, times)
}

fn coerce_dates(cells: &[Cell]) -> Vec<Cell> {
    cells
        .iter()
        .map(|cell| {
            cell.as_ref()
                .and_then(Value::as_date)
                .map(Value::Date)
        })
        .collect()
}
