use crate::config::{REQUIRED_COLUMNS, SourceConfig};
use crate::data::clean::{CleanReport, clean};
use crate::data::error::PipelineError;
use crate::data::loader::load_table;
use crate::data::model::RawTable;

/// Loader + Validator: fetch the source once and clean it.
///
/// The result is cached by the session; filter changes never come back here.
pub fn load_dataset(config: &SourceConfig) -> Result<CleanReport, PipelineError> {
    let raw = load_table(config)?;
    log::info!(
        "loaded {} rows with columns {:?}",
        raw.len(),
        raw.headers
    );
    clean_table(&raw, config)
}

/// Validator step on an already loaded table.
pub fn clean_table(raw: &RawTable, config: &SourceConfig) -> Result<CleanReport, PipelineError> {
    let report = clean(raw, &REQUIRED_COLUMNS, config.class_column.as_deref())?;
    log::info!(
        "{} usable blocks, {} dropped, Cu range {:.3}..{:.3}",
        report.dataset.len(),
        report.dropped(),
        report.dataset.grade_range.0,
        report.dataset.grade_range.1
    );
    Ok(report)
}
