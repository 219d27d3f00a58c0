use std::collections::BTreeSet;

use crate::chart::{ChartSpec, Encoding, render};
use crate::config::SourceConfig;
use crate::data::clean::CleanReport;
use crate::data::error::PipelineError;
use crate::data::filter::{FilterSpec, GradeBound, default_class_selection};
use crate::data::model::BlockDataset;
use crate::pipeline::load_dataset;

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Transient message shown above the chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Success(String),
    Error(String),
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: SourceConfig,
    pub phase: Phase,

    /// Cleaned dataset, cached for the session (None until a load succeeds).
    pub dataset: Option<BlockDataset>,

    /// Selected grade bounds; `max` is ignored in threshold mode.
    pub grade_min: f64,
    pub grade_max: f64,
    pub threshold_mode: bool,

    /// Selected class keys; `None` when the dataset is unclassified.
    pub selected_classes: Option<BTreeSet<String>>,

    pub encoding: Encoding,

    /// Chart for the current selection (cached until the selection changes).
    pub chart: Option<ChartSpec>,

    pub banner: Option<Banner>,
}

impl AppState {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            dataset: None,
            grade_min: 0.0,
            grade_max: 0.0,
            threshold_mode: false,
            selected_classes: None,
            encoding: Encoding::default(),
            chart: None,
            banner: None,
        }
    }

    /// Advance the load cycle by one frame. `Idle` becomes `Loading` so one
    /// frame with the loading notice is painted before the blocking fetch
    /// runs on the next call. Returns `true` when another frame is needed.
    pub fn advance(&mut self) -> bool {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Loading;
                true
            }
            Phase::Loading => {
                self.load();
                false
            }
            Phase::Loaded | Phase::Failed => false,
        }
    }

    /// Start over from `Idle`; the cached dataset stays until the new load
    /// finishes.
    pub fn request_reload(&mut self) {
        log::info!("reloading {}", self.config.location);
        self.phase = Phase::Idle;
    }

    /// Run Loader + Validator for the configured source (blocking).
    pub fn load(&mut self) {
        self.phase = Phase::Loading;
        let result = load_dataset(&self.config);
        self.finish_load(result);
    }

    /// Ingest the outcome of a load.
    pub fn finish_load(&mut self, result: Result<CleanReport, PipelineError>) {
        match result {
            Ok(report) => {
                let mut msg = format!("Loaded {} blocks", report.dataset.len());
                if report.dropped() > 0 {
                    msg.push_str(&format!(
                        " ({} rows without a numeric Cu or coordinate were skipped)",
                        report.dropped()
                    ));
                }
                self.set_dataset(report.dataset);
                self.banner = Some(Banner::Success(msg));
            }
            Err(e) => self.fail(e),
        }
    }

    /// Show a single error and drop anything that could be half-rendered.
    pub fn fail(&mut self, error: PipelineError) {
        log::error!("pipeline failed: {error}");
        self.phase = Phase::Failed;
        self.dataset = None;
        self.chart = None;
        self.banner = Some(Banner::Error(format!("Error loading or processing the data: {error}")));
    }

    /// Ingest a newly cleaned dataset and apply the default selection.
    pub fn set_dataset(&mut self, dataset: BlockDataset) {
        let defaults = FilterSpec::default_for(&dataset);
        (self.grade_min, self.grade_max) = dataset.grade_range;
        self.threshold_mode = false;
        self.selected_classes = defaults.classes;
        if !dataset.has_classification {
            self.encoding = Encoding::Continuous;
        }

        self.dataset = Some(dataset);
        self.phase = Phase::Loaded;
        self.refilter();
    }

    /// The filter described by the current widget values.
    pub fn filter_spec(&self) -> FilterSpec {
        let grade = if self.threshold_mode {
            GradeBound::AtLeast(self.grade_min)
        } else {
            GradeBound::Range {
                min: self.grade_min,
                max: self.grade_max,
            }
        };
        FilterSpec {
            grade,
            classes: self.selected_classes.clone(),
        }
    }

    /// Re-run Filter + Chart Builder on the cached dataset.
    pub fn refilter(&mut self) {
        if let Some(ds) = &self.dataset {
            let chart = render(ds, &self.filter_spec(), self.encoding);
            log::debug!("{} of {} blocks visible", chart.point_count(), ds.len());
            self.chart = Some(chart);
        }
    }

    /// Set the grade range, keeping `min <= max`.
    pub fn set_grade_range(&mut self, min: f64, max: f64) {
        self.grade_min = min.min(max);
        self.grade_max = max.max(min);
        self.refilter();
    }

    pub fn set_threshold_mode(&mut self, on: bool) {
        self.threshold_mode = on;
        self.refilter();
    }

    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
        self.refilter();
    }

    /// Toggle a single class key.
    pub fn toggle_class(&mut self, key: &str) {
        if let Some(selected) = &mut self.selected_classes {
            if !selected.remove(key) {
                selected.insert(key.to_string());
            }
            self.refilter();
        }
    }

    /// Select every class, waste rock included.
    pub fn select_all(&mut self) {
        let Some(ds) = &self.dataset else {
            return;
        };
        if self.selected_classes.is_some() {
            self.selected_classes = Some(ds.classes.keys().cloned().collect());
            self.refilter();
        }
    }

    /// Deselect every class; nothing is drawn.
    pub fn select_none(&mut self) {
        if self.selected_classes.is_some() {
            self.selected_classes = Some(BTreeSet::new());
            self.refilter();
        }
    }

    /// Back to the load-time selection.
    pub fn reset_filters(&mut self) {
        if let Some(ds) = &self.dataset {
            (self.grade_min, self.grade_max) = ds.grade_range;
            self.threshold_mode = false;
            self.selected_classes = ds
                .has_classification
                .then(|| default_class_selection(ds.classes.keys()));
            self.refilter();
        }
    }

    /// Number of blocks in the current chart.
    pub fn visible_count(&self) -> usize {
        self.chart.as_ref().map_or(0, ChartSpec::point_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clean::clean;
    use crate::data::model::{
        CellValue, ClassLabel, RawTable, Sample, UNCLASSIFIED_KEY, UNCLASSIFIED_LABEL,
    };
    use crate::config::REQUIRED_COLUMNS;

    fn report() -> CleanReport {
        let mk = |x: f64, grade: f64, class: &str| Sample {
            x,
            y: x,
            z: x,
            grade,
            classification: Some(ClassLabel::new(class)),
        };
        CleanReport {
            dataset: BlockDataset::from_samples(
                vec![mk(0.0, 0.2, "Ore"), mk(1.0, 1.2, "Waste"), mk(2.0, 2.2, "Esteril")],
                true,
            )
            .unwrap(),
            dropped_grade: 1,
            dropped_coords: 0,
        }
    }

    #[test]
    fn successful_load_applies_defaults() {
        let mut state = AppState::new(SourceConfig::default());
        state.finish_load(Ok(report()));

        assert_eq!(state.phase, Phase::Loaded);
        assert_eq!((state.grade_min, state.grade_max), (0.2, 2.2));
        assert_eq!(state.visible_count(), 2);
        assert!(matches!(state.banner, Some(Banner::Success(ref m)) if m.contains("1 rows")));
    }

    #[test]
    fn failed_load_shows_one_error_and_no_chart() {
        let mut state = AppState::new(SourceConfig::default());
        state.finish_load(Ok(report()));
        state.finish_load(Err(PipelineError::Data("all 3 rows were dropped".into())));

        assert_eq!(state.phase, Phase::Failed);
        assert!(state.chart.is_none());
        assert!(state.dataset.is_none());
        assert!(matches!(state.banner, Some(Banner::Error(_))));
    }

    #[test]
    fn filter_changes_reuse_the_cached_dataset() {
        let mut state = AppState::new(SourceConfig::default());
        state.finish_load(Ok(report()));

        state.select_all();
        assert_eq!(state.visible_count(), 3);

        state.set_grade_range(1.0, 3.0);
        assert_eq!(state.visible_count(), 2);

        state.set_threshold_mode(true);
        state.set_grade_range(2.0, 0.0);
        assert_eq!((state.grade_min, state.grade_max), (0.0, 2.0));

        state.toggle_class("ore");
        state.set_grade_range(0.0, 3.0);
        assert_eq!(state.visible_count(), 2);

        state.select_none();
        assert_eq!(state.visible_count(), 0);
        assert!(state.chart.is_some());

        state.reset_filters();
        assert_eq!(state.visible_count(), 2);
        assert!(!state.threshold_mode);
    }

    #[test]
    fn grouping_by_class_splits_series() {
        let mut state = AppState::new(SourceConfig::default());
        state.finish_load(Ok(report()));
        state.set_encoding(Encoding::ByClassification);
        assert_eq!(state.chart.as_ref().unwrap().series.len(), 2);
    }

    fn classified_table(labels: &[&str]) -> RawTable {
        let mut t = RawTable::new(
            ["X", "Y", "Z", "Cu", "Classification"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
        );
        for (n, label) in labels.iter().enumerate() {
            let v = n as i64;
            t.push_row(vec![
                CellValue::Integer(v),
                CellValue::Integer(v),
                CellValue::Integer(v),
                CellValue::Float(1.0 + v as f64),
                CellValue::String(label.to_string()),
            ]);
        }
        t
    }

    #[test]
    fn blank_classification_column_shows_every_block() {
        let mut state = AppState::new(SourceConfig::default());
        state.finish_load(clean(&classified_table(&["", "", ""]), &REQUIRED_COLUMNS, None));

        assert_eq!(state.selected_classes, None);
        assert_eq!(state.visible_count(), 3);
        state.select_all();
        assert_eq!(state.visible_count(), 3);
    }

    #[test]
    fn blank_labels_are_a_selectable_class() {
        let mut state = AppState::new(SourceConfig::default());
        state.finish_load(clean(&classified_table(&["Ore", "", "Waste"]), &REQUIRED_COLUMNS, None));
        state.set_encoding(Encoding::ByClassification);

        assert_eq!(state.visible_count(), 3);
        let names: Vec<String> = state
            .chart
            .as_ref()
            .unwrap()
            .series
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(names, vec!["Ore", "Waste", UNCLASSIFIED_LABEL]);

        state.toggle_class(UNCLASSIFIED_KEY);
        assert_eq!(state.visible_count(), 2);
        state.select_all();
        assert_eq!(state.visible_count(), 3);
    }

    #[test]
    fn reload_paints_a_loading_frame_before_fetching() {
        let missing = std::env::temp_dir().join("cu-block-viewer-missing/blocks.csv");
        let mut state = AppState::new(SourceConfig::new(missing.to_string_lossy()));
        state.finish_load(Ok(report()));

        state.request_reload();
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.advance());
        assert_eq!(state.phase, Phase::Loading);
        assert!(state.chart.is_some());

        assert!(!state.advance());
        assert_eq!(state.phase, Phase::Failed);
        assert!(state.chart.is_none());
        assert!(!state.advance());
    }
}
