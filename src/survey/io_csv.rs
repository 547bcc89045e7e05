// Primitives for reading the quarter CSV files.

use crate::survey::*;

/// Reads a quarter file into a table. The first record names the columns;
/// cells that parse as numbers become numeric, blank cells stay empty and
/// everything else is kept as text.
pub fn read_table(path: &Path) -> SurveyResult<Table> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .context(CsvOpenSnafu {
            path: path.display().to_string(),
        })?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<Datum>> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineSnafu { lineno })?;
        if idx == 0 {
            columns = line.iter().map(|s| s.trim().to_string()).collect();
            continue;
        }
        rows.push(line.iter().map(parse_cell).collect());
    }
    debug!(
        "read_table: {}: {} columns, {} records",
        path.display(),
        columns.len(),
        rows.len()
    );
    Ok(Table::new(columns, rows))
}

fn parse_cell(cell: &str) -> Datum {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Datum::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(x) => Datum::Number(x),
        Err(_) => Datum::Text(trimmed.to_string()),
    }
}
