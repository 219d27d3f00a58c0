use std::collections::BTreeSet;

use super::model::{BlockDataset, Sample, UNCLASSIFIED_KEY};

/// Absolute tolerance applied to the grade bounds.
pub const GRADE_EPSILON: f64 = 1e-9;

/// Class key left out of the default selection (waste rock).
pub const WASTE_CLASS: &str = "esteril";

// ---------------------------------------------------------------------------
// Filter predicate
// ---------------------------------------------------------------------------

/// Constraint on the Cu grade. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradeBound {
    Range { min: f64, max: f64 },
    AtLeast(f64),
}

impl GradeBound {
    pub fn contains(&self, grade: f64) -> bool {
        match *self {
            GradeBound::Range { min, max } => {
                grade >= min - GRADE_EPSILON && grade <= max + GRADE_EPSILON
            }
            GradeBound::AtLeast(min) => grade >= min - GRADE_EPSILON,
        }
    }
}

/// What the user selected for one run.
///
/// `classes` holds lowercase class keys, with blank labels under
/// [`UNCLASSIFIED_KEY`]. `None` means classification filtering is inactive;
/// an empty set matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub grade: GradeBound,
    pub classes: Option<BTreeSet<String>>,
}

impl FilterSpec {
    /// Full grade range, and every class except waste rock selected when the
    /// dataset is classified.
    pub fn default_for(dataset: &BlockDataset) -> Self {
        let (min, max) = dataset.grade_range;
        FilterSpec {
            grade: GradeBound::Range { min, max },
            classes: dataset
                .has_classification
                .then(|| default_class_selection(dataset.classes.keys())),
        }
    }

    pub fn matches(&self, sample: &Sample) -> bool {
        if !self.grade.contains(sample.grade) {
            return false;
        }
        match &self.classes {
            None => true,
            Some(selected) => selected.contains(sample.class_key()),
        }
    }
}

/// Case-folded selection of every class key except [`WASTE_CLASS`]. The
/// unclassified bucket is included.
pub fn default_class_selection<'a>(keys: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
    keys.into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| k != WASTE_CLASS)
        .collect()
}

/// Return indices of samples that pass the filter, in dataset order.
pub fn filtered_indices(dataset: &BlockDataset, spec: &FilterSpec) -> Vec<usize> {
    dataset
        .samples
        .iter()
        .enumerate()
        .filter(|(_, s)| spec.matches(s))
        .map(|(i, _)| i)
        .collect()
}
