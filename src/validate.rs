//! Declarative cell validation.
//!
//! Each canonical column may carry one rule string in the QC criteria
//! table. Rule text is parsed once, at load time, into a typed [`RuleKind`];
//! text that matches no production of the grammar is a fatal configuration
//! error rather than a silently-valid rule.
//!
//! Evaluation order within a cell is fixed: the requirement kinds resolve
//! blank cells first (a blank permitted by its condition is valid and ends
//! the cell's evaluation), and only non-blank values reach the
//! type/range/domain/list checks. A cell contributes at most one issue.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use log::info;
use serde::Serialize;

use crate::{
    canon,
    cli::QcArgs,
    config::ConfigError,
    data::{Value, cell_text, is_blank, normalize_key},
    frame::Frame,
    io_utils, lookup, report,
    source::SourceKind,
};

const US_STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY",
];

/// One parsed validation rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    /// Non-blank, unconditionally.
    Required,
    /// Non-blank unless the row's source is in the allowed-blank set.
    RequiredUnlessSource(Vec<SourceKind>),
    /// Non-blank whenever the named column is non-blank.
    RequiredIfFilled { column: String },
    /// Non-blank whenever the named column contains the token, optionally
    /// restricted to one source.
    RequiredIfContains {
        column: String,
        token: String,
        only: Option<SourceKind>,
    },
    /// Numeric and strictly below the threshold.
    MaxExclusive(f64),
    /// Numeric, no bound.
    Numeric,
    /// One of a fixed list of literals.
    OneOf(Vec<String>),
    /// One of the two-letter US state codes.
    StateCode,
    /// One of the known source identifiers.
    SourceId,
    /// Must equal the phase-equivalence mapping of the row's raw phase.
    PhaseConsistent,
}

/// Parses one rule string. Keywords are case-insensitive; anything that
/// matches no production is rejected.
pub fn parse_rule(column: &str, text: &str) -> Result<RuleKind, ConfigError> {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();

    if let Some(rest) = trimmed.strip_prefix('<') {
        let threshold: f64 = rest.trim().parse().map_err(|_| ConfigError::UnknownRule {
            column: column.to_string(),
            rule: text.to_string(),
        })?;
        return Ok(RuleKind::MaxExclusive(threshold));
    }
    if lower == "number" {
        return Ok(RuleKind::Numeric);
    }
    if lower == "non-blank" || lower == "non blank" {
        return Ok(RuleKind::Required);
    }
    if lower == "state code" {
        return Ok(RuleKind::StateCode);
    }
    if lower == "source" {
        return Ok(RuleKind::SourceId);
    }
    if lower == "matches phase equivalent" {
        return Ok(RuleKind::PhaseConsistent);
    }
    if let Some(rest) = strip_prefix_ci(trimmed, "only empty in ") {
        let sources = rest
            .split(',')
            .map(SourceKind::parse)
            .collect::<Result<Vec<_>>>()
            .map_err(|_| unknown(column, text))?;
        if sources.is_empty() {
            return Err(unknown(column, text));
        }
        return Ok(RuleKind::RequiredUnlessSource(sources));
    }
    if let Some(rest) = strip_prefix_ci(trimmed, "non-blank if ") {
        let (condition, qualifier) = match rest.split_once(';') {
            Some((head, tail)) => (head.trim(), Some(tail.trim())),
            None => (rest.trim(), None),
        };
        let only = match qualifier {
            None => None,
            Some(q) => {
                let source = strip_prefix_ci(q, "only for ").ok_or_else(|| unknown(column, text))?;
                Some(SourceKind::parse(source).map_err(|_| unknown(column, text))?)
            }
        };
        if let Some(other) = strip_suffix_ci(condition, " non-blank") {
            if only.is_some() {
                // The qualifier is only defined for the contains form.
                return Err(unknown(column, text));
            }
            return Ok(RuleKind::RequiredIfFilled {
                column: other.trim().to_string(),
            });
        }
        if let Some((other, token)) = split_once_ci(condition, " contains ") {
            return Ok(RuleKind::RequiredIfContains {
                column: other.trim().to_string(),
                token: token.trim().to_uppercase(),
                only,
            });
        }
        return Err(unknown(column, text));
    }
    if trimmed.contains(',') {
        let values: Vec<String> = trimmed
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if !values.is_empty() {
            return Ok(RuleKind::OneOf(values));
        }
    }
    Err(unknown(column, text))
}

fn unknown(column: &str, rule: &str) -> ConfigError {
    ConfigError::UnknownRule {
        column: column.to_string(),
        rule: rule.to_string(),
    }
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() >= prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

fn strip_suffix_ci<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    if text.len() >= suffix.len()
        && text[text.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    {
        Some(&text[..text.len() - suffix.len()])
    } else {
        None
    }
}

fn split_once_ci<'a>(text: &'a str, needle: &str) -> Option<(&'a str, &'a str)> {
    let lower = text.to_lowercase();
    let pos = lower.find(&needle.to_lowercase())?;
    Some((&text[..pos], &text[pos + needle.len()..]))
}

/// The full rule table plus the phase-equivalence map, loaded once and
/// read-only for the run.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<(String, RuleKind)>,
    phase_map: HashMap<String, String>,
}

impl RuleSet {
    pub fn load(
        rules_path: &Path,
        phases_path: &Path,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let (headers, records) = io_utils::read_table(rules_path, delimiter, encoding, 1)
            .with_context(|| format!("Loading QC criteria from {rules_path:?}"))?;
        let column_col = position(&headers, "COLUMN NAME")?;
        let valid_col = position(&headers, "VALID")?;

        let mut rules = Vec::new();
        for record in &records {
            let column = record.get(column_col).map(String::as_str).unwrap_or("").trim();
            let text = record.get(valid_col).map(String::as_str).unwrap_or("").trim();
            if column.is_empty() || text.is_empty() {
                continue;
            }
            let kind = parse_rule(column, text)?;
            rules.push((column.to_string(), kind));
        }

        let phase_map = lookup::load_phase_map(phases_path, delimiter, encoding)?;
        Ok(RuleSet { rules, phase_map })
    }

    pub fn from_parts(rules: Vec<(String, RuleKind)>, phase_map: HashMap<String, String>) -> Self {
        RuleSet { rules, phase_map }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

fn position(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow!("QC criteria table is missing a '{name}' column"))
}

/// A detected violation. A row with at least one issue is dirty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub row: usize,
    pub column: String,
    pub message: String,
}

/// Evaluates every rule against every row. Rules for columns absent from
/// the table are skipped; evaluation never fails, it only accumulates.
pub fn validate(frame: &Frame, rules: &RuleSet) -> Vec<Issue> {
    let kinds: Vec<Option<SourceKind>> = (0..frame.row_count())
        .map(|row| {
            cell_text(frame.get(row, canon::SOURCE))
                .and_then(|text| SourceKind::parse(&text).ok())
        })
        .collect();

    let mut issues = Vec::new();
    for row in 0..frame.row_count() {
        for (column, kind) in &rules.rules {
            if !frame.has_column(column) {
                continue;
            }
            if let Some(message) = check_cell(frame, row, column, kind, kinds[row], rules) {
                issues.push(Issue {
                    row,
                    column: column.clone(),
                    message,
                });
            }
        }
    }
    issues
}

/// Evaluates one rule against one cell. Returns the first failing check's
/// message, or `None` when the cell is valid.
fn check_cell(
    frame: &Frame,
    row: usize,
    column: &str,
    rule: &RuleKind,
    source: Option<SourceKind>,
    rules: &RuleSet,
) -> Option<String> {
    let cell = frame.get(row, column);
    let blank = is_blank(cell);

    match rule {
        RuleKind::Required => blank.then(|| "Required field is empty".to_string()),
        RuleKind::RequiredUnlessSource(allowed) => {
            let permitted = source.is_some_and(|kind| allowed.contains(&kind));
            (blank && !permitted).then(|| {
                let names: Vec<&str> = allowed.iter().map(SourceKind::id).collect();
                format!("Required field (empty only allowed in {})", names.join(", "))
            })
        }
        RuleKind::RequiredIfFilled { column: other } => {
            let filled = !is_blank(frame.get(row, other));
            (blank && filled).then(|| format!("Required when {other} is filled"))
        }
        RuleKind::RequiredIfContains {
            column: other,
            token,
            only,
        } => {
            if let Some(only) = only
                && source != Some(*only)
            {
                return None;
            }
            let triggered = cell_text(frame.get(row, other))
                .is_some_and(|text| normalize_key(&text).contains(token));
            (blank && triggered).then(|| format!("Required when {token} in {other}"))
        }
        RuleKind::MaxExclusive(limit) => {
            if blank {
                return None;
            }
            match cell.as_ref().and_then(Value::as_number) {
                None => Some("Expected numeric value for range check".to_string()),
                Some(value) if value >= *limit => {
                    Some(format!("Value {value} exceeds limit {limit}"))
                }
                Some(_) => None,
            }
        }
        RuleKind::Numeric => {
            if blank {
                return None;
            }
            cell.as_ref()
                .and_then(Value::as_number)
                .is_none()
                .then(|| "Expected numeric value".to_string())
        }
        RuleKind::OneOf(values) => {
            if blank {
                return None;
            }
            let text = cell_text(cell).unwrap_or_default();
            (!values.contains(&text)).then(|| format!("Value '{text}' not in allowed list"))
        }
        RuleKind::StateCode => {
            if blank {
                return None;
            }
            let code = cell_text(cell).map(|text| normalize_key(&text)).unwrap_or_default();
            (!US_STATES.contains(&code.as_str()))
                .then(|| format!("Invalid state code: {code}"))
        }
        RuleKind::SourceId => {
            if blank {
                return None;
            }
            let text = cell_text(cell).unwrap_or_default();
            SourceKind::parse(&text)
                .is_err()
                .then(|| format!("Value '{text}' not in allowed source list"))
        }
        RuleKind::PhaseConsistent => {
            let phases = cell_text(frame.get(row, canon::PHASES))?;
            let expected = rules.phase_map.get(&phases)?;
            let actual = cell_text(cell).unwrap_or_default();
            (actual != *expected)
                .then(|| format!("Expected '{expected}' for PHASES='{phases}'"))
        }
    }
}

/// Appends the 0/1 dirty-row flag derived from the issue set.
pub fn apply_flags(frame: &mut Frame, issues: &[Issue]) {
    let mut dirty = vec![false; frame.row_count()];
    for issue in issues {
        if let Some(flag) = dirty.get_mut(issue.row) {
            *flag = true;
        }
    }
    frame.ensure_column(canon::QC_FLAG);
    for (row, flag) in dirty.iter().enumerate() {
        frame.set(
            row,
            canon::QC_FLAG,
            Some(Value::Integer(i64::from(*flag))),
        );
    }
}

pub fn execute(args: &QcArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let rule_delimiter = io_utils::resolve_input_delimiter(&args.rules, args.delimiter);
    let rules = RuleSet::load(&args.rules, &args.phases, rule_delimiter, encoding)?;
    info!(
        "Loaded {} column rule(s) from {:?}",
        rules.rule_count(),
        args.rules
    );

    let input_delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let (headers, records) = io_utils::read_table(&args.input, input_delimiter, encoding, 1)
        .with_context(|| format!("Reading merged table {:?}", args.input))?;
    let mut frame = Frame::from_records(&headers, &records);
    info!(
        "Validating {} row(s) against {} rule(s)",
        frame.row_count(),
        rules.rule_count()
    );

    let issues = validate(&frame, &rules);
    apply_flags(&mut frame, &issues);

    let output_delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        args.output_delimiter,
        input_delimiter,
    );
    let mut writer = io_utils::open_csv_writer(args.output.as_deref(), output_delimiter)?;
    writer
        .write_record(frame.columns().iter())
        .context("Writing output headers")?;
    for row in 0..frame.row_count() {
        writer
            .write_record(frame.display_row(row).iter())
            .with_context(|| format!("Writing output row {}", row + 2))?;
    }
    writer.flush().context("Flushing output writer")?;

    if let Some(path) = &args.issues {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Creating issue report {path:?}"))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &issues)
            .context("Writing issue report JSON")?;
        info!("Wrote {} issue(s) to {path:?}", issues.len());
    }

    report::log_qc_summary(frame.row_count(), &issues);
    Ok(())
}
