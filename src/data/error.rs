use thiserror::Error;

/// Failure to obtain a raw table from the data source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("the data source returned an empty payload")]
    Empty,
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("malformed {format} data: {reason:#}")]
    Parse {
        format: &'static str,
        reason: anyhow::Error,
    },
}

/// Everything that can stop a pipeline run before a chart is drawn.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not load the block model: {0}")]
    Load(#[from] LoadError),
    #[error("the file must contain the columns {}; missing: {}", .required.join(", "), .missing.join(", "))]
    Schema {
        required: Vec<String>,
        missing: Vec<String>,
    },
    #[error("no usable rows: {0}")]
    Data(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_message_lists_missing_columns() {
        let e = PipelineError::Schema {
            required: vec!["X".into(), "Y".into(), "Z".into(), "Cu".into()],
            missing: vec!["Z".into(), "Cu".into()],
        };
        assert_eq!(
            e.to_string(),
            "the file must contain the columns X, Y, Z, Cu; missing: Z, Cu"
        );
    }
}
