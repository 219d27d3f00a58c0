use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the raw table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as read from CSV / JSON / Parquet, before any
/// schema is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Coerce the cell to a finite `f64`.
    ///
    /// Text is trimmed and parsed; anything that is not a finite number
    /// (including `"nan"`, `"inf"` and blanks) is `None`, i.e. missing.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            CellValue::Float(v) => *v,
            CellValue::Integer(i) => *i as f64,
            CellValue::String(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Bool(_) | CellValue::Null => return None,
        };
        v.is_finite().then_some(v)
    }

    /// Text form of the cell, `None` for nulls and blank strings.
    pub fn as_label(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::String(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – loader output, untyped
// ---------------------------------------------------------------------------

/// Rows exactly as they came out of the source file.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column names in source order.
    pub headers: Vec<String>,
    /// One entry per row; each row has `headers.len()` cells.
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        RawTable {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding with nulls / truncating to the header width.
    pub fn push_row(&mut self, mut cells: Vec<CellValue>) {
        cells.resize(self.headers.len(), CellValue::Null);
        self.rows.push(cells);
    }

    /// Index of the column whose trimmed name equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

// ---------------------------------------------------------------------------
// ClassLabel – rock classification with a case-folded key
// ---------------------------------------------------------------------------

/// Class key of samples with a blank classification. Cleaned labels are
/// never blank, so it cannot collide with a real class.
pub const UNCLASSIFIED_KEY: &str = "";

/// Display text for [`UNCLASSIFIED_KEY`].
pub const UNCLASSIFIED_LABEL: &str = "Unclassified";

/// A classification label. Comparison happens on `key` (lowercase), while
/// `display` keeps the casing found in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabel {
    pub key: String,
    pub display: String,
}

impl ClassLabel {
    pub fn new(text: &str) -> Self {
        let display = text.trim().to_string();
        ClassLabel {
            key: display.to_lowercase(),
            display,
        }
    }
}

// ---------------------------------------------------------------------------
// Sample / BlockDataset – the cleaned data
// ---------------------------------------------------------------------------

/// One block of the 3D model.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Copper grade, Cu %.
    pub grade: f64,
    pub classification: Option<ClassLabel>,
}

impl Sample {
    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Case-folded class key, [`UNCLASSIFIED_KEY`] when the label is blank.
    pub fn class_key(&self) -> &str {
        self.classification
            .as_ref()
            .map_or(UNCLASSIFIED_KEY, |c| c.key.as_str())
    }
}

/// The cleaned dataset plus indices computed once at load time.
#[derive(Debug, Clone)]
pub struct BlockDataset {
    /// All samples, in source order.
    pub samples: Vec<Sample>,
    /// Whether the source carried a classification column.
    pub has_classification: bool,
    /// Distinct class keys → display text (first casing seen). Blank labels
    /// are listed under [`UNCLASSIFIED_KEY`].
    pub classes: BTreeMap<String, String>,
    /// Grade extent over every sample: `(min, max)`.
    pub grade_range: (f64, f64),
}

impl BlockDataset {
    /// Build indices from cleaned samples. Returns `None` when `samples` is
    /// empty since there is no grade extent to speak of.
    pub fn from_samples(samples: Vec<Sample>, has_classification: bool) -> Option<Self> {
        let first = samples.first()?.grade;
        let mut grade_range = (first, first);
        let mut classes = BTreeMap::new();

        for s in &samples {
            grade_range.0 = grade_range.0.min(s.grade);
            grade_range.1 = grade_range.1.max(s.grade);
            match &s.classification {
                Some(c) => classes
                    .entry(c.key.clone())
                    .or_insert_with(|| c.display.clone()),
                None => classes
                    .entry(UNCLASSIFIED_KEY.to_string())
                    .or_insert_with(|| UNCLASSIFIED_LABEL.to_string()),
            };
        }

        Some(BlockDataset {
            samples,
            has_classification,
            classes,
            grade_range,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Class entries in legend order: labelled classes sorted by key, then
    /// the unclassified bucket if any sample has a blank label.
    pub fn class_entries(&self) -> impl Iterator<Item = (&String, &String)> {
        self.classes
            .iter()
            .filter(|(k, _)| k.as_str() != UNCLASSIFIED_KEY)
            .chain(self.classes.get_key_value(UNCLASSIFIED_KEY))
    }
}
