use crate::config::MIN_UPLOAD_RETURNS;
use thiserror::Error;

// ──────────────────────────────────────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("failed to read CSV: {0}")]
    Read(#[from] csv::Error),

    #[error("CSV header is missing required column(s): {}", .missing.join(", "))]
    MissingColumns { missing: Vec<&'static str> },

    #[error("too few valid Date/Close records (found {found}, need at least 2)")]
    TooFewRecords { found: usize },

    #[error("too few monthly returns could be computed (found {found}, need at least 2)")]
    TooFewReturns { found: usize },

    #[error("not enough history: found {found} monthly returns, need at least {required}")]
    InsufficientHistory { found: usize, required: usize },
}

/// One usable row of an OHLCV upload.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceRecord {
    pub date: String,
    pub close: f64,
}

// ──────────────────────────────────────────────────────────────────────────────
// Parsing
// ──────────────────────────────────────────────────────────────────────────────

/// Parses `Date`/`Close` rows out of CSV text, sorted by date string ascending.
///
/// Header names are matched case-insensitively. Rows with an empty date or a
/// close that is not a finite number are skipped.
pub fn parse_price_records(text: &str) -> Result<Vec<PriceRecord>, CsvImportError> {
    let cleaned = text
        .split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(cleaned.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();
    let date_idx = headers.iter().position(|h| h == "date");
    let close_idx = headers.iter().position(|h| h == "close");
    let (date_idx, close_idx) = match (date_idx, close_idx) {
        (Some(d), Some(c)) => (d, c),
        (d, c) => {
            let mut missing = Vec::new();
            if d.is_none() {
                missing.push("Date");
            }
            if c.is_none() {
                missing.push("Close");
            }
            return Err(CsvImportError::MissingColumns { missing });
        }
    };

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let date = row.get(date_idx).unwrap_or_default();
        if date.is_empty() {
            continue;
        }
        let Some(close) = row
            .get(close_idx)
            .and_then(|c| c.parse::<f64>().ok())
            .filter(|c| c.is_finite())
        else {
            continue;
        };
        records.push(PriceRecord {
            date: date.to_string(),
            close,
        });
    }

    if records.len() < 2 {
        return Err(CsvImportError::TooFewRecords {
            found: records.len(),
        });
    }

    records.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(records)
}

/// Simple returns `close[t] / close[t-1] - 1`, skipping pairs whose previous close is not positive.
pub fn simple_returns(records: &[PriceRecord]) -> Vec<f64> {
    records
        .windows(2)
        .filter(|w| w[0].close > 0.0)
        .map(|w| w[1].close / w[0].close - 1.0)
        .collect()
}

/// CSV text to monthly simple returns (at least 2).
pub fn parse_monthly_returns(text: &str) -> Result<Vec<f64>, CsvImportError> {
    let records = parse_price_records(text)?;
    let returns = simple_returns(&records);
    if returns.len() < 2 {
        return Err(CsvImportError::TooFewReturns {
            found: returns.len(),
        });
    }
    Ok(returns)
}

/// Full upload acceptance: parses and requires `MIN_UPLOAD_RETURNS` monthly returns.
pub fn import_upload(text: &str) -> Result<Vec<f64>, CsvImportError> {
    let returns = parse_monthly_returns(text)?;
    if returns.len() < MIN_UPLOAD_RETURNS {
        return Err(CsvImportError::InsufficientHistory {
            found: returns.len(),
            required: MIN_UPLOAD_RETURNS,
        });
    }
    Ok(returns)
}
