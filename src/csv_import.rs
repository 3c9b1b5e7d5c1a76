//! CSV ingestion for job applications.
//!
//! The whole file is parsed in memory against the fixed field schema. Cell
//! problems are collected across every row and reported together, so a user
//! can fix a spreadsheet in one pass. A file with any bad cell yields no records.

use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::models::{Application, ID_KEY, RecordSet};
use crate::schema::{Field, FieldKind};

/// How many cell errors are spelled out in the error message.
const REPORTED_ERRORS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellProblem {
    InvalidBoolean,
    InvalidYear,
}

/// A single cell that failed coercion. `row` is 1-based and counts the header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellError {
    pub row: usize,
    pub field: String,
    pub value: String,
    pub problem: CellProblem,
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.problem {
            CellProblem::InvalidBoolean => write!(
                f,
                "Row {}: Invalid boolean value \"{}\" for {} (expected true/false, yes/no or 1/0)",
                self.row, self.value, self.field
            ),
            CellProblem::InvalidYear => write!(
                f,
                "Row {}: Invalid year \"{}\" for {} (expected a whole number)",
                self.row, self.value, self.field
            ),
        }
    }
}

/// Every cell error found in one file, in row order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<CellError>,
}

impl ValidationReport {
    fn push(&mut self, error: CellError) {
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[CellError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors left out of the summary message.
    pub fn suppressed(&self) -> usize {
        self.errors.len().saturating_sub(REPORTED_ERRORS)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: Vec<String> = self
            .errors
            .iter()
            .take(REPORTED_ERRORS)
            .map(|e| e.to_string())
            .collect();
        write!(f, "{}", shown.join("; "))?;
        if self.suppressed() > 0 {
            write!(f, " (and {} more errors)", self.suppressed())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Invalid file format: expected non-empty UTF-8 text")]
    InvalidFormat,

    #[error("CSV file is empty or has no data rows")]
    EmptyFile,

    #[error("CSV file has no headers")]
    NoHeaders,

    #[error("No valid data rows found in CSV file")]
    NoDataRows,

    #[error("Data validation failed: {0}")]
    DataValidationFailed(ValidationReport),
}

/// Where a header column's values go.
#[derive(Debug, Clone)]
enum Column {
    Id,
    Known(Field),
    Extra(String),
}

impl Column {
    /// Template headers first, then the normalized names an export or API dump carries.
    fn from_header(header: &str) -> Self {
        if header == ID_KEY {
            return Column::Id;
        }
        match Field::from_header(header).or_else(|| Field::from_name(header)) {
            Some(field) => Column::Known(field),
            None => Column::Extra(header.to_string()),
        }
    }
}

/// Parse raw file bytes. Non UTF-8 input is rejected as `InvalidFormat`.
pub fn parse_csv_bytes(bytes: &[u8]) -> Result<RecordSet, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidFormat)?;
    parse_csv(text)
}

pub fn parse_csv(text: &str) -> Result<RecordSet, ParseError> {
    if text.is_empty() {
        return Err(ParseError::InvalidFormat);
    }
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    // (1-based line number, line) for every non-blank line
    let lines: Vec<(usize, &str)> = text
        .trim()
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| (idx + 1, line))
        .collect();

    if lines.len() < 2 {
        return Err(ParseError::EmptyFile);
    }

    let header = tokenize_line(lines[0].1);
    if header.first().is_none_or(|first| first.is_empty()) {
        return Err(ParseError::NoHeaders);
    }
    let columns: Vec<Column> = header.iter().map(|h| Column::from_header(h)).collect();

    let mut records = Vec::new();
    let mut report = ValidationReport::default();
    let mut blank_rows = 0;

    for &(row, line) in &lines[1..] {
        let cells = tokenize_line(line);
        if cells.iter().all(|cell| cell.is_empty()) {
            blank_rows += 1;
            continue;
        }
        records.push(build_row(row, &columns, &cells, &mut report));
    }

    debug!(
        columns = columns.len(),
        rows = records.len(),
        blank_rows,
        errors = report.len(),
        "Parsed CSV"
    );

    if records.is_empty() {
        return Err(ParseError::NoDataRows);
    }
    if !report.is_empty() {
        return Err(ParseError::DataValidationFailed(report));
    }
    Ok(records)
}

fn build_row(
    row: usize,
    columns: &[Column],
    cells: &[String],
    report: &mut ValidationReport,
) -> Application {
    let mut app = Application::default();

    for (idx, column) in columns.iter().enumerate() {
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");

        let field = match column {
            Column::Known(field) => *field,
            Column::Id => {
                app.id = Some(cell.to_string());
                continue;
            }
            Column::Extra(name) => {
                app.set_extra(name, cell.to_string());
                continue;
            }
        };

        match field.kind() {
            FieldKind::Text => app.set_text(field, cell.to_string()),
            FieldKind::Flag => {
                let value = parse_flag(cell).unwrap_or_else(|| {
                    report.push(cell_error(row, field, cell, CellProblem::InvalidBoolean));
                    false
                });
                app.set_flag(field, value);
            }
            FieldKind::Year => match parse_year(cell) {
                Ok(year) => app.year = year,
                Err(()) => {
                    report.push(cell_error(row, field, cell, CellProblem::InvalidYear));
                    app.year = None;
                }
            },
        }
    }

    app
}

fn cell_error(row: usize, field: Field, value: &str, problem: CellProblem) -> CellError {
    CellError {
        row,
        field: field.name().to_string(),
        value: value.to_string(),
        problem,
    }
}

/// Split one CSV line into trimmed cells.
///
/// `""` inside quotes is a literal quote; commas inside quotes are content.
/// An unterminated quote swallows the rest of the line.
pub fn tokenize_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());

    cells
}

/// `None` means the cell is not a recognised boolean token.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

/// Empty means unknown. Otherwise the whole trimmed cell must be an integer.
fn parse_year(raw: &str) -> Result<Option<i64>, ()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse::<i64>().map(Some).map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{template_csv, template_header};

    fn report_of(result: Result<RecordSet, ParseError>) -> ValidationReport {
        match result {
            Err(ParseError::DataValidationFailed(report)) => report,
            other => panic!("expected DataValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_tokenize_plain_and_trimmed() {
        assert_eq!(tokenize_line("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(tokenize_line("a,,"), vec!["a", "", ""]);
        assert_eq!(tokenize_line(""), vec![""]);
    }

    #[test]
    fn test_tokenize_quoted_comma_and_escaped_quotes() {
        let cells = tokenize_line(r#""Smith, Inc.","She said ""hi""",x"#);
        assert_eq!(cells, vec!["Smith, Inc.", r#"She said "hi""#, "x"]);
    }

    #[test]
    fn test_tokenize_unterminated_quote_absorbs_rest_of_line() {
        let cells = tokenize_line(r#"a,"b,c,d"#);
        assert_eq!(cells, vec!["a", "b,c,d"]);
    }

    #[test]
    fn test_parse_flag_tokens() {
        for raw in ["true", "TRUE", " yes ", "1", "Yes"] {
            assert_eq!(parse_flag(raw), Some(true), "{raw}");
        }
        for raw in ["false", "False", "no", "0", "", "   "] {
            assert_eq!(parse_flag(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(parse_flag("y"), None);
    }

    #[test]
    fn test_parse_year_is_strict() {
        assert_eq!(parse_year(""), Ok(None));
        assert_eq!(parse_year(" 2024 "), Ok(Some(2024)));
        assert_eq!(parse_year("5 years"), Err(()));
        assert_eq!(parse_year("twenty"), Err(()));
    }

    #[test]
    fn test_parse_valid_rows() {
        let csv = "Company,Job Title,Year,Referred,Design Related,Status\n\
                   Acme,Designer,2023,yes,0,Rejected\n\
                   \"Smith, Inc.\",\"She said \"\"hi\"\"\",,,TRUE,No Answer/Ongoing\n";
        let records = parse_csv(csv).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].company.as_deref(), Some("Acme"));
        assert_eq!(records[0].year, Some(2023));
        assert_eq!(records[0].referred, Some(true));
        assert_eq!(records[0].design_related, Some(false));
        assert_eq!(records[0].status.as_deref(), Some("Rejected"));

        assert_eq!(records[1].company.as_deref(), Some("Smith, Inc."));
        assert_eq!(records[1].job_title.as_deref(), Some(r#"She said "hi""#));
        assert_eq!(records[1].year, None);
        assert_eq!(records[1].referred, Some(false));
        assert_eq!(records[1].design_related, Some(true));

        // columns missing from the header stay absent
        assert!(records[0].email_questions.is_none());
        assert!(records[0].applied_on.is_none());
        assert!(records.iter().all(|r| r.id.is_none()));
    }

    #[test]
    fn test_parse_short_row_fills_defaults() {
        let csv = "Company,Job Title,Year,Referred\nAcme\n";
        let records = parse_csv(csv).unwrap();
        assert_eq!(records[0].company.as_deref(), Some("Acme"));
        assert_eq!(records[0].job_title.as_deref(), Some(""));
        assert_eq!(records[0].year, None);
        assert_eq!(records[0].referred, Some(false));
    }

    #[test]
    fn test_unknown_headers_pass_through() {
        let csv = "Company,Salary Band\nAcme,\"120,000\"\n";
        let records = parse_csv(csv).unwrap();
        assert_eq!(records[0].extra["Salary Band"], "120,000");
    }

    #[test]
    fn test_id_column_sets_record_id() {
        let records = parse_csv("id,Company,Referred\nabc,Acme,yes\n,Globex,no\n").unwrap();
        assert_eq!(records[0].id.as_deref(), Some("abc"));
        assert!(!records[1].has_id());
        assert!(records.iter().all(|r| r.extra.is_empty()));
    }

    #[test]
    fn test_normalized_headers_map_to_fields() {
        let csv = "Company,Job_Title,Design_Related,Year\nAcme,Designer,true,2024\n";
        let records = parse_csv(csv).unwrap();
        assert_eq!(records[0].job_title.as_deref(), Some("Designer"));
        assert_eq!(records[0].design_related, Some(true));
        assert!(records[0].extra.is_empty());
    }

    #[test]
    fn test_normalized_header_values_are_validated() {
        let err = parse_csv("Company,Tailored_App\nAcme,maybe\n").unwrap_err();
        match err {
            ParseError::DataValidationFailed(report) => {
                assert_eq!(report.len(), 1);
                assert_eq!(report.errors()[0].field, "Tailored_App");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_blank_rows_are_dropped() {
        let csv = "Company,Job Title,Referred\n\n , ,\nAcme,Designer,no\n,,\n\n";
        let records = parse_csv(csv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let csv = "Company,Referred\r\nAcme,yes\r\n";
        let records = parse_csv(csv).unwrap();
        assert_eq!(records[0].referred, Some(true));
    }

    #[test]
    fn test_byte_order_mark_is_stripped() {
        let csv = "\u{feff}Company,Referred\nAcme,no\n";
        let records = parse_csv(csv).unwrap();
        assert_eq!(records[0].company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_invalid_boolean_reports_row_and_field() {
        let csv = "Company,Referred,Design Related\nAcme,yes,no\nGlobex,no,maybe\n";
        let report = report_of(parse_csv(csv));
        assert_eq!(report.len(), 1);

        let error = &report.errors()[0];
        assert_eq!(error.row, 3);
        assert_eq!(error.field, "Design_Related");
        assert_eq!(error.value, "maybe");
        assert_eq!(error.problem, CellProblem::InvalidBoolean);
        assert!(report.to_string().contains("Row 3"));
        assert!(report.to_string().contains("Design_Related"));
    }

    #[test]
    fn test_row_numbers_follow_original_lines() {
        let csv = "Company,Referred\n\nAcme,perhaps\n";
        let report = report_of(parse_csv(csv));
        assert_eq!(report.errors()[0].row, 3);
    }

    #[test]
    fn test_invalid_year_is_reported() {
        let csv = "Company,Year\nAcme,5 years\n";
        let report = report_of(parse_csv(csv));
        assert_eq!(report.errors()[0].field, "Year");
        assert_eq!(report.errors()[0].problem, CellProblem::InvalidYear);
    }

    #[test]
    fn test_error_message_caps_at_three() {
        let csv = "Company,Referred,Tailored App\nA,x,y\nB,z,w\nC,v,ok\n";
        let result = parse_csv(csv);
        let message = result.clone().unwrap_err().to_string();
        let report = report_of(result);

        assert_eq!(report.len(), 6);
        assert_eq!(report.suppressed(), 3);
        assert!(message.starts_with("Data validation failed: Row 2"));
        assert!(message.contains("(and 3 more errors)"));
        assert!(!message.contains("\"v\""));
    }

    #[test]
    fn test_precondition_errors() {
        assert_eq!(parse_csv(""), Err(ParseError::InvalidFormat));
        assert_eq!(parse_csv("   \n  "), Err(ParseError::EmptyFile));
        assert_eq!(parse_csv("Company,Year\n"), Err(ParseError::EmptyFile));
        assert_eq!(parse_csv(",Year\nAcme,2020"), Err(ParseError::NoHeaders));
    }

    #[test]
    fn test_all_blank_data_rows_is_no_data() {
        assert_eq!(parse_csv("Company,Year\n,\n , \n"), Err(ParseError::NoDataRows));
        assert_eq!(parse_csv("Company,Year\n,\n\" \",\n"), Err(ParseError::NoDataRows));
    }

    #[test]
    fn test_single_content_row_among_blank_rows() {
        let records = parse_csv("Company,Year\n,\nx\n,,").unwrap();
        assert_eq!(
            records,
            vec![Application {
                company: Some("x".to_string()),
                ..Default::default()
            }]
        );
    }

    #[test]
    fn test_invalid_utf8_is_invalid_format() {
        assert_eq!(parse_csv_bytes(&[0xff, 0xfe, 0x00]), Err(ParseError::InvalidFormat));
        assert_eq!(parse_csv_bytes(b""), Err(ParseError::InvalidFormat));
    }

    #[test]
    fn test_template_round_trip() {
        let records = parse_csv(&template_csv()).unwrap();
        assert_eq!(records.len(), 1);

        let app = &records[0];
        assert_eq!(app.design_related, Some(true));
        assert_eq!(app.year, Some(1));
        assert_eq!(app.status.as_deref(), Some("No Answer/Ongoing"));
        for field in Field::ALL.iter().filter(|f| f.kind() == FieldKind::Flag) {
            if *field != Field::DesignRelated {
                assert!(!app.flag(*field), "{} should be false", field.name());
            }
        }
        assert!(app.extra.is_empty());
    }

    #[test]
    fn test_every_header_field_is_present() {
        let csv = format!("{}\nAcme,Designer,2024,,,,,,,,,,,,,Offered\n", template_header());
        let records = parse_csv(&csv).unwrap();
        let json = serde_json::to_value(&records[0]).unwrap();
        for field in Field::ALL {
            assert!(json.get(field.name()).is_some(), "missing {}", field.name());
        }
    }
}
