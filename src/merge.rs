//! Cross-source merge and derivation pipeline.
//!
//! Normalized source frames are concatenated in configuration order, padded
//! to the canonical schema, and pushed through a fixed sequence of
//! derivations. The sequence is ordering-sensitive: formation-family
//! resolution reads `BASIN`, the run-window composition reads the
//! normalized date columns, and so on. Conversion failures inside a stage
//! degrade to null cells; they never abort the run.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use log::info;
use regex::Regex;

use crate::{
    canon,
    cli::MergeArgs,
    config::MergeConfig,
    data::{Value, cell_text, normalize_key},
    frame::Frame,
    io_utils,
    lookup::Lookups,
    mapping::MappingSpec,
    normalize::Normalizer,
    report,
    source::SourceKind,
};

pub fn execute(args: &MergeArgs) -> Result<()> {
    let config = MergeConfig::load(&args.config)
        .with_context(|| format!("Loading merge configuration from {:?}", args.config))?;
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let spec_delimiter = io_utils::resolve_input_delimiter(&config.mapping, args.delimiter);

    let spec = MappingSpec::load(&config.mapping, spec_delimiter, encoding)?;
    let lookups = Lookups::load(
        &config.basins,
        &config.formations,
        io_utils::resolve_input_delimiter(&config.basins, args.delimiter),
        encoding,
    )?;
    info!(
        "Loaded {} county mapping(s) and {} formation keyword(s)",
        lookups.county_count(),
        lookups.formation_count()
    );

    let normalizer = Normalizer::new(&lookups)?;
    let mut frames = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        let mapping = spec.mapping_for(source.kind)?;
        let delimiter = io_utils::resolve_input_delimiter(&source.path, args.delimiter);
        let (headers, records) =
            io_utils::read_table(&source.path, delimiter, encoding, source.header_row)
                .with_context(|| format!("Reading source extract {:?}", source.path))?;
        let frame = normalizer.normalize(source.kind, &headers, &records, mapping)?;
        info!(
            "Normalized {}: {} row(s), {} mapped column(s)",
            source.kind,
            frame.row_count(),
            mapping.len()
        );
        frames.push(frame);
    }

    let mut merged = concat_frames(frames, spec.canonical_columns());
    let pipeline = DerivationPipeline::new(&lookups, Local::now().date_naive())?;
    pipeline.run(&mut merged)?;

    let output_delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        args.output_delimiter,
        io_utils::DEFAULT_CSV_DELIMITER,
    );
    let mut writer = io_utils::open_csv_writer(args.output.as_deref(), output_delimiter)?;
    writer
        .write_record(merged.columns().iter())
        .context("Writing output headers")?;
    for row in 0..merged.row_count() {
        writer
            .write_record(merged.display_row(row).iter())
            .with_context(|| format!("Writing output row {}", row + 2))?;
    }
    writer.flush().context("Flushing output writer")?;

    report::log_merge_summary(&merged);
    Ok(())
}

/// Concatenates normalized frames (configuration order, then row order
/// within each source) and conforms the union to the canonical schema:
/// absent columns are created as nulls, extras dropped, order fixed.
pub fn concat_frames(frames: Vec<Frame>, schema: &[String]) -> Frame {
    let mut merged = Frame::new(schema);
    for frame in frames {
        merged.append(frame);
    }
    merged.conform(schema);
    merged
}

pub struct DerivationPipeline<'a> {
    lookups: &'a Lookups,
    today: NaiveDate,
    owner_token: Regex,
}

impl<'a> DerivationPipeline<'a> {
    pub fn new(lookups: &'a Lookups, today: NaiveDate) -> Result<Self> {
        Ok(DerivationPipeline {
            lookups,
            today,
            owner_token: Regex::new(r"^([A-Za-z]+)").context("Compiling owner token pattern")?,
        })
    }

    /// Runs every derivation stage in its documented order.
    pub fn run(&self, frame: &mut Frame) -> Result<()> {
        let kinds = row_kinds(frame)?;
        self.lookup_basins(frame);
        self.lookup_formation_families(frame);
        self.normalize_dates(frame);
        self.compose_run_window(frame, &kinds);
        self.compose_lobe_stage(frame, &kinds);
        self.classify_tool_owner(frame, &kinds);
        self.compute_total_hours(frame, &kinds);
        self.stamp_update(frame);
        self.classify_motor_type(frame, &kinds);
        Ok(())
    }

    fn lookup_basins(&self, frame: &mut Frame) {
        for row in 0..frame.row_count() {
            let basin = cell_text(frame.get(row, canon::COUNTY))
                .and_then(|county| self.lookups.basin_for_county(&county))
                .map(|basin| Value::Text(basin.to_string()));
            frame.set(row, canon::BASIN, basin);
        }
    }

    fn lookup_formation_families(&self, frame: &mut Frame) {
        for row in 0..frame.row_count() {
            let family = match (
                cell_text(frame.get(row, canon::BASIN)),
                cell_text(frame.get(row, canon::FORMATION)),
            ) {
                (Some(basin), Some(formation)) => self
                    .lookups
                    .formation_family(&basin, &formation)
                    .map(|family| Value::Text(family.to_string())),
                _ => None,
            };
            frame.set(row, canon::FORM_FAM, family);
        }
    }

    /// Coerces the date-only columns to pure dates; unparseable values
    /// become null.
    fn normalize_dates(&self, frame: &mut Frame) {
        for column in [canon::DATE_IN, canon::DATE_OUT] {
            for row in 0..frame.row_count() {
                let coerced = frame
                    .get(row, column)
                    .as_ref()
                    .and_then(Value::as_date)
                    .map(Value::Date);
                frame.set(row, column, coerced);
            }
        }
    }

    /// Builds START_DATE/END_DATE. Sources carrying a time column compose
    /// date+time; the POG extracts only have dates, which read as midnight.
    fn compose_run_window(&self, frame: &mut Frame, kinds: &[SourceKind]) {
        let pairs = [
            (canon::DATE_IN, canon::TIME_IN, canon::START_DATE),
            (canon::DATE_OUT, canon::TIME_OUT, canon::END_DATE),
        ];
        for (date_col, time_col, target) in pairs {
            for (row, kind) in kinds.iter().enumerate() {
                let date = frame.get(row, date_col).as_ref().and_then(Value::as_date);
                let stamp = match kind {
                    SourceKind::MotorKpi | SourceKind::CamRunTracker => {
                        let time = frame.get(row, time_col).as_ref().and_then(Value::as_time);
                        match (date, time) {
                            (Some(date), Some(time)) => {
                                Some(Value::DateTime(NaiveDateTime::new(date, time)))
                            }
                            _ => None,
                        }
                    }
                    SourceKind::PogCamUsage | SourceKind::PogMmUsage => date
                        .map(|date| Value::DateTime(date.and_time(NaiveTime::MIN))),
                };
                frame.set(row, target, stamp);
            }
        }
    }

    /// Lobe/stage composition: separate counts join with `:`; the CAM
    /// extract already stores a combined value with a `-` delimiter.
    fn compose_lobe_stage(&self, frame: &mut Frame, kinds: &[SourceKind]) {
        for (row, kind) in kinds.iter().enumerate() {
            match kind {
                SourceKind::MotorKpi | SourceKind::PogCamUsage | SourceKind::PogMmUsage => {
                    let lobes = cell_text(frame.get(row, canon::LOBES));
                    let stages = cell_text(frame.get(row, canon::STAGES));
                    if let (Some(lobes), Some(stages)) = (lobes, stages) {
                        frame.set(
                            row,
                            canon::LOBE_STAGE,
                            Some(Value::Text(format!("{lobes}:{stages}"))),
                        );
                    }
                }
                SourceKind::CamRunTracker => {
                    if let Some(combined) = cell_text(frame.get(row, canon::LOBE_STAGE)) {
                        frame.set(
                            row,
                            canon::LOBE_STAGE,
                            Some(Value::Text(combined.replace('-', ":"))),
                        );
                    }
                }
            }
        }
    }

    /// Tool-owner classification (`DDS`).
    fn classify_tool_owner(&self, frame: &mut Frame, kinds: &[SourceKind]) {
        for (row, kind) in kinds.iter().enumerate() {
            match kind {
                SourceKind::MotorKpi => {
                    frame.set(row, canon::DDS, Some(Value::Text("SDT".to_string())));
                }
                SourceKind::CamRunTracker => {
                    if let Some(owner) = cell_text(frame.get(row, canon::DDS))
                        && let Some(captures) = self.owner_token.captures(&owner)
                    {
                        frame.set(
                            row,
                            canon::DDS,
                            Some(Value::Text(captures[1].to_string())),
                        );
                    }
                }
                SourceKind::PogCamUsage | SourceKind::PogMmUsage => {
                    let owner = cell_text(frame.get(row, canon::JOB_TYPE))
                        .map(|job| normalize_key(&job))
                        .and_then(|job| {
                            if job.contains("DIRECTIONAL") {
                                Some("SDT")
                            } else if job.contains("RENTAL") {
                                Some("Other")
                            } else {
                                None
                            }
                        })
                        .map(|owner| Value::Text(owner.to_string()));
                    frame.set(row, canon::DDS, owner);
                }
            }
        }
    }

    /// Motor KPI reports circulating and drilling hours separately; its
    /// total is their sum with null operands read as zero. Other sources
    /// arrive with totals already populated and are left alone.
    fn compute_total_hours(&self, frame: &mut Frame, kinds: &[SourceKind]) {
        for (row, kind) in kinds.iter().enumerate() {
            match kind {
                SourceKind::MotorKpi => {
                    let circulating = frame
                        .get(row, canon::CIRC_HOURS)
                        .as_ref()
                        .and_then(Value::as_number)
                        .unwrap_or(0.0);
                    let drilling = frame
                        .get(row, canon::DRILLING_HOURS)
                        .as_ref()
                        .and_then(Value::as_number)
                        .unwrap_or(0.0);
                    frame.set(
                        row,
                        canon::TOTAL_HOURS,
                        Some(Value::Float(circulating + drilling)),
                    );
                }
                SourceKind::CamRunTracker
                | SourceKind::PogCamUsage
                | SourceKind::PogMmUsage => {}
            }
        }
    }

    /// As-of stamp for every row. Unconditional overwrite, not fill-once.
    fn stamp_update(&self, frame: &mut Frame) {
        for row in 0..frame.row_count() {
            frame.set(row, canon::UPDATE, Some(Value::Date(self.today)));
        }
    }

    /// Motor-type decision table.
    fn classify_motor_type(&self, frame: &mut Frame, kinds: &[SourceKind]) {
        for (row, kind) in kinds.iter().enumerate() {
            let motor_type = match kind {
                SourceKind::MotorKpi => {
                    let serial = cell_text(frame.get(row, canon::SN))
                        .map(|s| normalize_key(&s))
                        .unwrap_or_default();
                    let make = cell_text(frame.get(row, canon::MOTOR_MAKE))
                        .map(|s| normalize_key(&s))
                        .unwrap_or_default();
                    if serial.contains("MLA07") {
                        Some("CAM DD")
                    } else if make.contains("TDI") {
                        Some("TDI CONV")
                    } else {
                        Some("3RD PARTY")
                    }
                }
                SourceKind::CamRunTracker => Some("CAM RENTAL"),
                SourceKind::PogCamUsage => cell_text(frame.get(row, canon::JOB_TYPE))
                    .map(|job| normalize_key(&job))
                    .and_then(|job| {
                        if job.contains("RENTAL") {
                            Some("CAM RENTAL")
                        } else if job.contains("DIRECTIONAL") {
                            Some("CAM DD")
                        } else {
                            None
                        }
                    }),
                SourceKind::PogMmUsage => Some("TDI CONV"),
            };
            frame.set(
                row,
                canon::MOTOR_TYPE2,
                motor_type.map(|value| Value::Text(value.to_string())),
            );
        }
    }
}

/// Resolves every row's source discriminator up front so the stages can
/// dispatch exhaustively. An unknown discriminator is an internal error,
/// not a silent fallthrough.
fn row_kinds(frame: &Frame) -> Result<Vec<SourceKind>> {
    (0..frame.row_count())
        .map(|row| {
            let text = cell_text(frame.get(row, canon::SOURCE)).unwrap_or_default();
            SourceKind::parse(&text)
                .with_context(|| format!("Row {} has an invalid SOURCE value", row + 2))
        })
        .collect()
}
