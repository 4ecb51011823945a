//! Canonical schema listing from a mapping specification.
//!
//! Renders the canonical column order and, per source, the raw column
//! feeding each canonical column. Useful when authoring or reviewing the
//! mapping file.

use anyhow::{Context, Result};
use log::info;

use crate::{cli::ColumnsArgs, io_utils, mapping::MappingSpec, source::SourceKind, table};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.mapping, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let spec = MappingSpec::load(&args.mapping, delimiter, encoding)
        .with_context(|| format!("Loading mapping specification from {:?}", args.mapping))?;

    let sources: Vec<SourceKind> = match &args.source {
        Some(id) => vec![SourceKind::parse(id)?],
        None => {
            let mut listed: Vec<SourceKind> = spec.mapped_sources().collect();
            listed.sort_by_key(SourceKind::id);
            listed
        }
    };

    let mut headers = vec!["#".to_string(), "canonical".to_string()];
    headers.extend(sources.iter().map(|kind| kind.id().to_string()));

    let mut rows = Vec::new();
    for (idx, canonical) in spec.canonical_columns().iter().enumerate() {
        let mut row = vec![(idx + 1).to_string(), canonical.clone()];
        for kind in &sources {
            let mapping = spec.mapping_for(*kind)?;
            let mapped: Vec<&str> = mapping
                .iter()
                .filter(|(_, target)| *target == canonical)
                .map(|(source, _)| source)
                .collect();
            row.push(mapped.join(", "));
        }
        rows.push(row);
    }

    table::print_table(&headers, &rows);
    info!(
        "Listed {} canonical column(s) for {} source(s)",
        spec.canonical_columns().len(),
        sources.len()
    );
    Ok(())
}
