use super::error::PipelineError;
use super::model::{BlockDataset, ClassLabel, RawTable, Sample};
use crate::config::CLASS_COLUMN_ALIASES;

/// Result of cleaning a raw table.
#[derive(Debug, Clone)]
pub struct CleanReport {
    pub dataset: BlockDataset,
    /// Rows dropped because `Cu` was missing or not a number.
    pub dropped_grade: usize,
    /// Rows with a valid grade but an unusable coordinate.
    pub dropped_coords: usize,
}

impl CleanReport {
    pub fn dropped(&self) -> usize {
        self.dropped_grade + self.dropped_coords
    }
}

/// Validate the schema and coerce the raw table into samples.
///
/// `required` lists the coordinate and grade columns in `X, Y, Z, Cu` order.
/// `class_column` names the classification column; when `None` the usual
/// aliases are tried. A missing classification column is not an error, and
/// one holding only blank labels is treated as missing.
///
/// Rows are dropped when `Cu` is not a finite number, and also when any
/// coordinate is not, since such a block cannot be placed. The two causes
/// are counted apart, so `dataset.len() == raw.len() - dropped_grade` only
/// holds when every coordinate parses.
pub fn clean(
    raw: &RawTable,
    required: &[&str; 4],
    class_column: Option<&str>,
) -> Result<CleanReport, PipelineError> {
    let indices = required.map(|c| raw.column_index(c));
    let [Some(xi), Some(yi), Some(zi), Some(cui)] = indices else {
        let missing = required
            .iter()
            .zip(indices)
            .filter(|(_, idx)| idx.is_none())
            .map(|(c, _)| c.to_string())
            .collect();
        return Err(PipelineError::Schema {
            required: required.iter().map(|c| c.to_string()).collect(),
            missing,
        });
    };

    let class_idx = find_class_column(raw, class_column);

    let mut samples = Vec::with_capacity(raw.len());
    let mut dropped_grade = 0;
    let mut dropped_coords = 0;

    for row in &raw.rows {
        let Some(grade) = row[cui].as_f64() else {
            dropped_grade += 1;
            continue;
        };
        let (Some(x), Some(y), Some(z)) = (row[xi].as_f64(), row[yi].as_f64(), row[zi].as_f64())
        else {
            dropped_coords += 1;
            continue;
        };
        let classification = class_idx
            .and_then(|i| row[i].as_label())
            .map(|l| ClassLabel::new(&l));

        samples.push(Sample {
            x,
            y,
            z,
            grade,
            classification,
        });
    }

    if dropped_grade > 0 {
        log::warn!("dropped {dropped_grade} rows with a missing or non-numeric Cu value");
    }
    if dropped_coords > 0 {
        log::warn!("dropped {dropped_coords} rows with a missing or non-numeric coordinate");
    }

    let has_labels = samples.iter().any(|s| s.classification.is_some());
    if class_idx.is_some() && !has_labels {
        log::warn!("classification column holds no labels; ignoring it");
    }

    let dataset = BlockDataset::from_samples(samples, has_labels).ok_or_else(|| {
        PipelineError::Data(format!(
            "all {} rows were dropped while cleaning (missing or non-numeric values)",
            raw.len()
        ))
    })?;

    Ok(CleanReport {
        dataset,
        dropped_grade,
        dropped_coords,
    })
}

fn find_class_column(raw: &RawTable, configured: Option<&str>) -> Option<usize> {
    let matches = |header: &str, name: &str| header.trim().to_lowercase() == name.trim().to_lowercase();
    match configured {
        Some(name) => raw.headers.iter().position(|h| matches(h, name)),
        None => raw
            .headers
            .iter()
            .position(|h| CLASS_COLUMN_ALIASES.iter().any(|a| matches(h, a))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::REQUIRED_COLUMNS;
    use crate::data::model::{CellValue, UNCLASSIFIED_KEY, UNCLASSIFIED_LABEL};

    fn table(headers: &[&str], rows: Vec<Vec<CellValue>>) -> RawTable {
        let mut t = RawTable::new(headers.iter().map(|h| h.to_string()).collect());
        for r in rows {
            t.push_row(r);
        }
        t
    }

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    fn i(v: i64) -> CellValue {
        CellValue::Integer(v)
    }

    #[test]
    fn unparseable_grades_are_dropped_not_zeroed() {
        let raw = table(
            &["X", "Y", "Z", "Cu"],
            vec![
                vec![i(0), i(0), i(0), s("1.5")],
                vec![i(1), i(1), i(1), s("bad")],
                vec![i(2), i(2), i(2), s("3.0")],
            ],
        );
        let report = clean(&raw, &REQUIRED_COLUMNS, None).unwrap();
        let grades: Vec<f64> = report.dataset.samples.iter().map(|s| s.grade).collect();
        assert_eq!(grades, vec![1.5, 3.0]);
        assert_eq!(report.dropped_grade, 1);

        let bad = raw.rows.iter().filter(|r| r[3].as_f64().is_none()).count();
        assert_eq!(report.dataset.len(), raw.len() - bad);
    }

    #[test]
    fn missing_columns_are_all_reported() {
        let raw = table(&["X", "Y", "Grade"], vec![vec![i(0), i(0), i(1)]]);
        match clean(&raw, &REQUIRED_COLUMNS, None) {
            Err(PipelineError::Schema { missing, .. }) => assert_eq!(missing, vec!["Z", "Cu"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn headers_are_matched_after_trimming() {
        let raw = table(&[" X", "Y ", "Z", " Cu "], vec![vec![i(1), i(2), i(3), s("0.2")]]);
        assert_eq!(clean(&raw, &REQUIRED_COLUMNS, None).unwrap().dataset.len(), 1);
    }

    #[test]
    fn nothing_left_is_a_data_error() {
        let raw = table(
            &["X", "Y", "Z", "Cu"],
            vec![vec![i(0), i(0), i(0), s("")], vec![i(0), i(0), i(0), CellValue::Null]],
        );
        assert!(matches!(
            clean(&raw, &REQUIRED_COLUMNS, None),
            Err(PipelineError::Data(_))
        ));

        let header_only = table(&["X", "Y", "Z", "Cu"], Vec::new());
        assert!(matches!(
            clean(&header_only, &REQUIRED_COLUMNS, None),
            Err(PipelineError::Data(_))
        ));
    }

    #[test]
    fn bad_coordinates_are_counted_separately() {
        let raw = table(
            &["X", "Y", "Z", "Cu"],
            vec![vec![s("?"), i(0), i(0), s("1.0")], vec![i(1), i(1), i(1), s("2.0")]],
        );
        let report = clean(&raw, &REQUIRED_COLUMNS, None).unwrap();
        assert_eq!(report.dataset.len(), 1);
        assert_eq!(report.dropped_coords, 1);
        assert_eq!(report.dropped(), 1);
    }

    #[test]
    fn classification_aliases_and_blank_labels() {
        let raw = table(
            &["X", "Y", "Z", "Cu", "clasificación"],
            vec![
                vec![i(0), i(0), i(0), s("1.0"), s(" Ore ")],
                vec![i(1), i(1), i(1), s("2.0"), s("")],
                vec![i(2), i(2), i(2), s("0.1"), s("ESTERIL")],
            ],
        );
        let ds = clean(&raw, &REQUIRED_COLUMNS, None).unwrap().dataset;
        assert!(ds.has_classification);
        assert_eq!(ds.samples[0].class_key(), "ore");
        assert_eq!(ds.samples[1].classification, None);
        assert_eq!(ds.classes["esteril"], "ESTERIL");
        assert_eq!(ds.classes[UNCLASSIFIED_KEY], UNCLASSIFIED_LABEL);
    }

    #[test]
    fn all_blank_classification_column_counts_as_absent() {
        let raw = table(
            &["X", "Y", "Z", "Cu", "Classification"],
            vec![
                vec![i(0), i(0), i(0), s("1.0"), s("")],
                vec![i(1), i(1), i(1), s("2.0"), s("  ")],
                vec![i(2), i(2), i(2), s("3.0"), CellValue::Null],
            ],
        );
        let ds = clean(&raw, &REQUIRED_COLUMNS, None).unwrap().dataset;
        assert!(!ds.has_classification);
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn configured_class_column_overrides_aliases() {
        let raw = table(
            &["X", "Y", "Z", "Cu", "Classification", "Rock"],
            vec![vec![i(0), i(0), i(0), s("1.0"), s("Ore"), s("Porphyry")]],
        );
        let ds = clean(&raw, &REQUIRED_COLUMNS, Some("rock")).unwrap().dataset;
        assert_eq!(ds.samples[0].class_key(), "porphyry");

        let none = clean(&raw, &REQUIRED_COLUMNS, Some("Lithology")).unwrap().dataset;
        assert!(!none.has_classification);
    }
}
