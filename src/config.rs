use std::fmt;
use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Published Google Sheets export of the block model.
pub const DEFAULT_SOURCE: &str =
    "https://docs.google.com/spreadsheets/d/1CeNxt3T8Y0ktm8PrvfnbCtAkR1H2LCY4/export?format=csv&gid=0";

/// Columns every source must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["X", "Y", "Z", "Cu"];

/// Accepted names for the optional classification column (case-insensitive).
pub const CLASS_COLUMN_ALIASES: [&str; 3] = ["Classification", "Clasificación", "Clasificacion"];

// ---------------------------------------------------------------------------
// Source format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceFormat {
    Csv,
    Json,
    Parquet,
}

impl SourceFormat {
    pub fn name(self) -> &'static str {
        match self {
            SourceFormat::Csv => "CSV",
            SourceFormat::Json => "JSON",
            SourceFormat::Parquet => "Parquet",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Parser)]
#[command(
    name = "cu-block-viewer",
    about = "Interactive 3D view of mining blocks colored by copper grade"
)]
pub struct Args {
    /// URL (http/https) or local path of the block model table
    #[arg(long, env = "CU_VIEWER_SOURCE", default_value = DEFAULT_SOURCE)]
    pub source: String,

    /// Force the payload format instead of detecting it
    #[arg(long, env = "CU_VIEWER_FORMAT", value_enum)]
    pub format: Option<SourceFormat>,

    /// Name of the classification column (defaults to Classification / Clasificación)
    #[arg(long, env = "CU_VIEWER_CLASS_COLUMN")]
    pub class_column: Option<String>,

    /// HTTP timeout in seconds (transport default when omitted)
    #[arg(long, env = "CU_VIEWER_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

/// Where and how to read the block model.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub location: String,
    pub format: Option<SourceFormat>,
    pub class_column: Option<String>,
    pub timeout: Option<Duration>,
}

impl SourceConfig {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            format: None,
            class_column: None,
            timeout: None,
        }
    }

    /// Whether the location is fetched over HTTP rather than read from disk.
    pub fn is_remote(&self) -> bool {
        let l = self.location.trim_start().to_ascii_lowercase();
        l.starts_with("http://") || l.starts_with("https://")
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE)
    }
}

impl From<Args> for SourceConfig {
    fn from(args: Args) -> Self {
        Self {
            location: args.source,
            format: args.format,
            class_column: args.class_column.filter(|c| !c.trim().is_empty()),
            timeout: args.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_published_sheet() {
        let args = Args::parse_from(["cu-block-viewer"]);
        let cfg = SourceConfig::from(args);
        assert_eq!(cfg.location, DEFAULT_SOURCE);
        assert!(cfg.is_remote());
        assert_eq!(cfg.format, None);
        assert_eq!(cfg.timeout, None);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "cu-block-viewer",
            "--source",
            "data/blocks.parquet",
            "--format",
            "parquet",
            "--class-column",
            "Rock",
            "--timeout-secs",
            "15",
        ]);
        let cfg = SourceConfig::from(args);
        assert!(!cfg.is_remote());
        assert_eq!(cfg.format, Some(SourceFormat::Parquet));
        assert_eq!(cfg.class_column.as_deref(), Some("Rock"));
        assert_eq!(cfg.timeout, Some(Duration::from_secs(15)));
    }
}
