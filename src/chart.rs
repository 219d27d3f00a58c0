use eframe::egui::Color32;

use crate::color::{ClassColors, ColorScale};
use crate::data::filter::{FilterSpec, filtered_indices};
use crate::data::model::{BlockDataset, Sample};

pub const MARKER_SIZE: f32 = 5.0;
pub const MARKER_OPACITY: f32 = 0.8;
pub const CHART_TITLE: &str = "Mining blocks colored by Cu grade";
pub const COLOR_BAR_TITLE: &str = "Cu grade";

/// How the filtered samples are split into series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// One series, colored by grade.
    #[default]
    Continuous,
    /// One series per classification, each still colored by grade.
    ByClassification,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub position: [f64; 3],
    pub color: Color32,
    pub hover: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    /// Legend / outline colour. `None` for the single continuous series.
    pub legend_color: Option<Color32>,
    pub points: Vec<ChartPoint>,
}

/// Everything the presenter needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: &'static str,
    pub axis_titles: [&'static str; 3],
    pub color_bar_title: &'static str,
    pub color_scale: ColorScale,
    pub marker_size: f32,
    pub marker_opacity: f32,
    pub series: Vec<ChartSeries>,
    /// Bounding box of the *full* dataset, so the camera does not jump when
    /// the filter changes.
    pub bounds: ([f64; 3], [f64; 3]),
}

impl ChartSpec {
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }
}

/// Filter the dataset and lay the survivors out as chart series.
///
/// Pure: the same inputs always give the same chart.
pub fn render(dataset: &BlockDataset, filter: &FilterSpec, encoding: Encoding) -> ChartSpec {
    let (gmin, gmax) = dataset.grade_range;
    let scale = ColorScale::new(gmin, gmax);
    let visible = filtered_indices(dataset, filter);

    let series = match encoding {
        Encoding::Continuous => vec![ChartSeries {
            name: "Blocks".to_string(),
            legend_color: None,
            points: visible
                .iter()
                .map(|&i| chart_point(&dataset.samples[i], &scale, None))
                .collect(),
        }],
        Encoding::ByClassification => grouped_series(dataset, &visible, &scale),
    };

    ChartSpec {
        title: CHART_TITLE,
        axis_titles: ["X", "Y", "Z"],
        color_bar_title: COLOR_BAR_TITLE,
        color_scale: scale,
        marker_size: MARKER_SIZE,
        marker_opacity: MARKER_OPACITY,
        series,
        bounds: bounding_box(&dataset.samples),
    }
}

fn grouped_series(dataset: &BlockDataset, visible: &[usize], scale: &ColorScale) -> Vec<ChartSeries> {
    let legend = ClassColors::new(dataset.classes.keys());

    dataset
        .class_entries()
        .filter_map(|(key, display)| {
            let points: Vec<ChartPoint> = visible
                .iter()
                .map(|&i| &dataset.samples[i])
                .filter(|s| s.class_key() == key.as_str())
                .map(|s| chart_point(s, scale, Some(display.as_str())))
                .collect();
            (!points.is_empty()).then(|| ChartSeries {
                name: display.clone(),
                legend_color: Some(legend.color_for(key)),
                points,
            })
        })
        .collect()
}

fn chart_point(sample: &Sample, scale: &ColorScale, class: Option<&str>) -> ChartPoint {
    ChartPoint {
        position: sample.position(),
        color: scale.color_for(sample.grade),
        hover: hover_text(sample, class),
    }
}

/// `X: 10.00, Y: 20.00, Z: 3100.00, Cu: 0.85` with an optional class line.
pub fn hover_text(sample: &Sample, class: Option<&str>) -> String {
    let mut text = format!(
        "X: {:.2}, Y: {:.2}, Z: {:.2}, Cu: {:.2}",
        sample.x, sample.y, sample.z, sample.grade
    );
    if let Some(c) = class {
        text.push('\n');
        text.push_str(c);
    }
    text
}

fn bounding_box(samples: &[Sample]) -> ([f64; 3], [f64; 3]) {
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for s in samples {
        for (axis, v) in s.position().into_iter().enumerate() {
            lo[axis] = lo[axis].min(v);
            hi[axis] = hi[axis].max(v);
        }
    }
    if samples.is_empty() {
        return ([0.0; 3], [0.0; 3]);
    }
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use approx::assert_relative_eq;

    use crate::color::plasma;
    use crate::data::filter::GradeBound;
    use crate::data::model::{ClassLabel, UNCLASSIFIED_LABEL};

    fn sample(x: f64, grade: f64, class: Option<&str>) -> Sample {
        Sample {
            x,
            y: x * 2.0,
            z: -x,
            grade,
            classification: class.map(ClassLabel::new),
        }
    }

    fn classified() -> BlockDataset {
        BlockDataset::from_samples(
            vec![
                sample(0.0, 0.5, Some("Ore")),
                sample(1.0, 1.5, Some("Waste")),
                sample(2.0, 2.5, Some("ore")),
                sample(3.0, 0.1, Some("esteril")),
                sample(4.0, 1.0, None),
            ],
            true,
        )
        .unwrap()
    }

    #[test]
    fn colour_bounds_come_from_the_full_dataset() {
        let ds = classified();
        let spec = FilterSpec {
            grade: GradeBound::Range { min: 1.0, max: 2.0 },
            classes: None,
        };
        let chart = render(&ds, &spec, Encoding::Continuous);
        assert_relative_eq!(chart.color_scale.min, 0.1);
        assert_relative_eq!(chart.color_scale.max, 2.5);
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.point_count(), 2);
        assert_eq!(chart.bounds, ([0.0, 0.0, -4.0], [4.0, 8.0, 0.0]));
        // 1.5 sits at (1.5 - 0.1) / 2.4 of the scale, not at the top.
        let p = &chart.series[0].points[0];
        assert_eq!(p.color, plasma(((1.5 - 0.1) / (2.5 - 0.1)) as f32));
    }

    #[test]
    fn grouped_series_follow_selected_classes() {
        let ds = classified();
        let spec = FilterSpec::default_for(&ds);
        let chart = render(&ds, &spec, Encoding::ByClassification);
        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ore", "Waste", UNCLASSIFIED_LABEL]);
        assert_eq!(chart.series[0].points.len(), 2);
        assert_eq!(chart.series[2].legend_color, Some(Color32::GRAY));
        assert!(chart.series.iter().all(|s| s.legend_color.is_some()));
        assert_eq!(chart.marker_size, MARKER_SIZE);
        assert_eq!(chart.marker_opacity, MARKER_OPACITY);
    }

    #[test]
    fn unlabelled_samples_get_their_own_series_without_class_filter() {
        let ds = classified();
        let spec = FilterSpec {
            grade: GradeBound::AtLeast(0.0),
            classes: None,
        };
        let chart = render(&ds, &spec, Encoding::ByClassification);
        let last = chart.series.last().unwrap();
        assert_eq!(last.name, UNCLASSIFIED_LABEL);
        assert_eq!(last.points.len(), 1);
        assert_eq!(chart.point_count(), ds.len());
    }

    #[test]
    fn empty_selection_renders_an_empty_chart() {
        let ds = classified();
        let spec = FilterSpec {
            grade: GradeBound::AtLeast(0.0),
            classes: Some(BTreeSet::new()),
        };
        assert!(render(&ds, &spec, Encoding::Continuous).is_empty());
        assert!(render(&ds, &spec, Encoding::ByClassification).series.is_empty());
    }

    #[test]
    fn hover_shows_two_decimals() {
        let s = Sample {
            x: 1.0,
            y: 2.346,
            z: -3.0,
            grade: 0.8567,
            classification: None,
        };
        assert_eq!(hover_text(&s, None), "X: 1.00, Y: 2.35, Z: -3.00, Cu: 0.86");
        assert_eq!(hover_text(&s, Some("Ore")), "X: 1.00, Y: 2.35, Z: -3.00, Cu: 0.86\nOre");
    }
}
