use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::LoadError;
use super::model::{CellValue, RawTable};
use crate::config::{SourceConfig, SourceFormat};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Fetch the configured source once and parse it into a [`RawTable`].
///
/// No retries: the first failure is returned to the caller.
pub fn load_table(config: &SourceConfig) -> Result<RawTable, LoadError> {
    let payload = if config.is_remote() {
        fetch_remote(config)?
    } else {
        read_local(&config.location)?
    };

    if payload.body.iter().all(u8::is_ascii_whitespace) {
        return Err(LoadError::Empty);
    }

    let format = resolve_format(
        config.format,
        &config.location,
        payload.content_type.as_deref(),
        &payload.body,
    )?;
    log::debug!(
        "parsing {} bytes from {} as {format}",
        payload.body.len(),
        config.location
    );

    parse_payload(format, payload.body)
}

/// Parse an in-memory payload of a known format.
pub fn parse_payload(format: SourceFormat, body: Bytes) -> Result<RawTable, LoadError> {
    let parsed = match format {
        SourceFormat::Csv => parse_csv(&body),
        SourceFormat::Json => parse_json(&body),
        SourceFormat::Parquet => parse_parquet(body),
    };
    parsed.map_err(|reason| LoadError::Parse {
        format: format.name(),
        reason,
    })
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

struct Payload {
    body: Bytes,
    content_type: Option<String>,
}

fn fetch_remote(config: &SourceConfig) -> Result<Payload, LoadError> {
    let url = config.location.trim();
    let http_err = |source: reqwest::Error| LoadError::Http {
        url: url.to_string(),
        source,
    };

    let mut builder = reqwest::blocking::Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    let client = builder.build().map_err(http_err)?;

    log::info!("fetching block model from {url}");
    let resp = client.get(url).send().map_err(http_err)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(LoadError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = resp.bytes().map_err(http_err)?;

    Ok(Payload { body, content_type })
}

fn read_local(path: &str) -> Result<Payload, LoadError> {
    log::info!("reading block model from {path}");
    let body = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_string(),
        source,
    })?;
    Ok(Payload {
        body: Bytes::from(body),
        content_type: None,
    })
}

// ---------------------------------------------------------------------------
// Format detection
// ---------------------------------------------------------------------------

/// What a hint (MIME type, extension, magic bytes) says about the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hint {
    Format(SourceFormat),
    Spreadsheet,
}

/// Decide how to parse a payload.
///
/// Order: explicit override, `Content-Type`, `format=` query parameter or
/// path extension, then the payload's leading bytes.
pub fn resolve_format(
    forced: Option<SourceFormat>,
    location: &str,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<SourceFormat, LoadError> {
    if let Some(f) = forced {
        return Ok(f);
    }

    let hint = content_type
        .and_then(hint_from_content_type)
        .or_else(|| hint_from_location(location))
        .unwrap_or_else(|| sniff(body));

    match hint {
        Hint::Format(f) => Ok(f),
        Hint::Spreadsheet => Err(LoadError::UnsupportedFormat(
            "native spreadsheet workbooks cannot be read; publish or export the sheet as CSV"
                .to_string(),
        )),
    }
}

fn hint_from_content_type(content_type: &str) -> Option<Hint> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "text/csv" | "application/csv" | "text/comma-separated-values" => {
            Some(Hint::Format(SourceFormat::Csv))
        }
        "application/json" | "text/json" => Some(Hint::Format(SourceFormat::Json)),
        "application/vnd.apache.parquet" | "application/x-parquet" => {
            Some(Hint::Format(SourceFormat::Parquet))
        }
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        | "application/vnd.ms-excel"
        | "application/vnd.oasis.opendocument.spreadsheet" => Some(Hint::Spreadsheet),
        _ => None,
    }
}

fn hint_from_extension(ext: &str) -> Option<Hint> {
    match ext.to_ascii_lowercase().as_str() {
        "csv" => Some(Hint::Format(SourceFormat::Csv)),
        "json" => Some(Hint::Format(SourceFormat::Json)),
        "parquet" | "pq" => Some(Hint::Format(SourceFormat::Parquet)),
        "xlsx" | "xlsm" | "xls" | "ods" => Some(Hint::Spreadsheet),
        _ => None,
    }
}

fn hint_from_location(location: &str) -> Option<Hint> {
    let (path, query) = match location.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (location, None),
    };

    let from_query = query.and_then(|q| {
        q.split(['&', '#'])
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == "format")
            .and_then(|(_, v)| hint_from_extension(v))
    });

    from_query.or_else(|| {
        let path = path.split('#').next().unwrap_or(path);
        let last = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let (_, ext) = last.rsplit_once('.')?;
        hint_from_extension(ext)
    })
}

fn sniff(body: &[u8]) -> Hint {
    const PARQUET_MAGIC: &[u8] = b"PAR1";
    const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
    const OLE_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0";

    if body.starts_with(PARQUET_MAGIC) {
        return Hint::Format(SourceFormat::Parquet);
    }
    if body.starts_with(ZIP_MAGIC) || body.starts_with(OLE_MAGIC) {
        return Hint::Spreadsheet;
    }
    match body.iter().copied().find(|b| !b.is_ascii_whitespace()) {
        Some(b'[') => Hint::Format(SourceFormat::Json),
        _ => Hint::Format(SourceFormat::Csv),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Header row with column names, one block per line. Rows shorter than the
/// header are padded with nulls.
fn parse_csv(body: &[u8]) -> Result<RawTable> {
    let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body);

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        bail!("CSV has no header row");
    }

    let mut table = RawTable::new(headers);
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        table.push_row(record.iter().map(guess_cell_type).collect());
    }

    Ok(table)
}

fn guess_cell_type(s: &str) -> CellValue {
    let t = s.trim();
    if t.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = t.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = t.parse::<f64>() {
        return CellValue::Float(f);
    }
    if t == "true" || t == "false" {
        return CellValue::Bool(t == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, i.e. `df.to_json(orient='records')`:
///
/// ```json
/// [
///   { "X": 10.0, "Y": 20.0, "Z": 3100.0, "Cu": 0.85, "Classification": "Ore" },
///   ...
/// ]
/// ```
fn parse_json(body: &[u8]) -> Result<RawTable> {
    let root: JsonValue = serde_json::from_slice(body).context("parsing JSON")?;
    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut objects = Vec::with_capacity(records.len());
    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let mut table = RawTable::new(headers);
    for obj in objects {
        let row = table
            .headers
            .iter()
            .map(|h| obj.get(h).map(json_to_cell).unwrap_or(CellValue::Null))
            .collect();
        table.push_row(row);
    }

    Ok(table)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Parquet file with one scalar column per attribute, as written by
/// `df.to_parquet()` (Pandas) or `df.write_parquet()` (Polars).
fn parse_parquet(body: Bytes) -> Result<RawTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(body)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut table = RawTable::new(headers);
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let columns: Vec<Vec<CellValue>> = batch
            .columns()
            .iter()
            .enumerate()
            .map(|(i, col)| {
                column_cells(col).with_context(|| format!("column '{}'", table.headers[i]))
            })
            .collect::<Result<_>>()?;

        for row in 0..batch.num_rows() {
            table.push_row(columns.iter().map(|c| c[row].clone()).collect());
        }
    }

    Ok(table)
}

/// Convert one Arrow column into cells, casting exotic types to text.
fn column_cells(col: &ArrayRef) -> Result<Vec<CellValue>> {
    let n = col.len();
    let cells = match col.data_type() {
        DataType::Int32 => {
            let arr = col.as_primitive::<Int32Type>();
            (0..n)
                .map(|i| null_or(col, i, || CellValue::Integer(arr.value(i) as i64)))
                .collect()
        }
        DataType::Int64 => {
            let arr = col.as_primitive::<Int64Type>();
            (0..n)
                .map(|i| null_or(col, i, || CellValue::Integer(arr.value(i))))
                .collect()
        }
        DataType::Float32 => {
            let arr = col.as_primitive::<Float32Type>();
            (0..n)
                .map(|i| null_or(col, i, || CellValue::Float(arr.value(i) as f64)))
                .collect()
        }
        DataType::Float64 => {
            let arr = col.as_primitive::<Float64Type>();
            (0..n)
                .map(|i| null_or(col, i, || CellValue::Float(arr.value(i))))
                .collect()
        }
        DataType::Boolean => {
            let arr = col.as_boolean();
            (0..n)
                .map(|i| null_or(col, i, || CellValue::Bool(arr.value(i))))
                .collect()
        }
        DataType::Utf8 => {
            let arr = col.as_string::<i32>();
            (0..n)
                .map(|i| null_or(col, i, || CellValue::String(arr.value(i).to_string())))
                .collect()
        }
        DataType::LargeUtf8 => {
            let arr = col.as_string::<i64>();
            (0..n)
                .map(|i| null_or(col, i, || CellValue::String(arr.value(i).to_string())))
                .collect()
        }
        DataType::Int8 | DataType::Int16 | DataType::UInt8 | DataType::UInt16 | DataType::UInt32 => {
            let widened = cast(col, &DataType::Int64).context("widening integer column")?;
            return column_cells(&widened);
        }
        DataType::UInt64 | DataType::Float16 | DataType::Decimal128(_, _) => {
            let widened = cast(col, &DataType::Float64).context("widening numeric column")?;
            return column_cells(&widened);
        }
        // Dictionary-encoded categoricals and anything else textual.
        _ => {
            let text = cast(col, &DataType::Utf8)
                .with_context(|| format!("unsupported column type {:?}", col.data_type()))?;
            return column_cells(&text);
        }
    };
    Ok(cells)
}

fn null_or(col: &ArrayRef, row: usize, value: impl FnOnce() -> CellValue) -> CellValue {
    if col.is_null(row) {
        CellValue::Null
    } else {
        value()
    }
}
