//! Run summaries logged after a merge or QC pass.

use std::collections::BTreeMap;

use log::info;

use crate::{canon, data::cell_text, frame::Frame, table, validate::Issue};

/// Per-source row counts plus the best-populated columns, mirroring the
/// operator's sanity check after a merge.
pub fn log_merge_summary(frame: &Frame) {
    info!(
        "Merged {} row(s) across {} column(s)",
        frame.row_count(),
        frame.columns().len()
    );

    let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
    for row in 0..frame.row_count() {
        let source = cell_text(frame.get(row, canon::SOURCE)).unwrap_or_else(|| "?".to_string());
        *by_source.entry(source).or_default() += 1;
    }
    for (source, count) in &by_source {
        info!("  {source}: {count} row(s)");
    }

    let rows = fill_statistics(frame, 20);
    let headers = vec![
        "column".to_string(),
        "non-null".to_string(),
        "fill %".to_string(),
    ];
    for line in table::render_table(&headers, &rows).lines() {
        info!("{line}");
    }
}

/// Top `limit` columns by fill percentage, descending.
pub fn fill_statistics(frame: &Frame, limit: usize) -> Vec<Vec<String>> {
    let total = frame.row_count();
    let mut stats: Vec<(String, usize, f64)> = frame
        .columns()
        .iter()
        .map(|column| {
            let populated = frame.populated_count(column);
            let pct = if total == 0 {
                0.0
            } else {
                populated as f64 / total as f64 * 100.0
            };
            (column.clone(), populated, pct)
        })
        .collect();
    stats.sort_by(|a, b| b.2.total_cmp(&a.2));
    stats
        .into_iter()
        .take(limit)
        .map(|(column, populated, pct)| {
            vec![column, populated.to_string(), format!("{pct:.1}")]
        })
        .collect()
}

pub fn log_qc_summary(rows: usize, issues: &[Issue]) {
    let mut dirty: Vec<usize> = issues.iter().map(|issue| issue.row).collect();
    dirty.sort_unstable();
    dirty.dedup();
    info!(
        "Found {} issue(s) across {} row(s); {} row(s) clean",
        issues.len(),
        dirty.len(),
        rows.saturating_sub(dirty.len())
    );
}
