// The variable dictionary published alongside the microdata. Informational
// only; the estimator never consumes it.

use crate::survey::*;

use calamine::{open_workbook, Reader, Xlsx};
use reqwest::blocking::Client;

pub const DICTIONARY_URL: &str =
    "https://www.bls.gov/cex/pumd/ce_pumd_interview_diary_dictionary.xlsx";

/// The two reference tables of the dictionary workbook: variable metadata
/// and code metadata.
#[derive(PartialEq, Debug, Clone)]
pub struct DataDictionary {
    pub vars: Table,
    pub codes: Table,
}

/// Downloads the dictionary workbook into `dest_dir` and reads it.
pub fn fetch_data_dictionary(client: &Client, dest_dir: &Path) -> SurveyResult<DataDictionary> {
    let resp = client
        .get(DICTIONARY_URL)
        .send()
        .and_then(|r| r.error_for_status())
        .context(RetrievalSnafu {
            url: DICTIONARY_URL.to_string(),
        })?;
    let bytes = resp.bytes().context(RetrievalSnafu {
        url: DICTIONARY_URL.to_string(),
    })?;
    let path = dest_dir.join("ce_pumd_interview_diary_dictionary.xlsx");
    fs::write(&path, &bytes).context(IoSnafu {
        path: path.display().to_string(),
    })?;
    read_dictionary(&path)
}

/// Reads an already-downloaded dictionary workbook: worksheet 1 holds the
/// variable metadata, worksheet 2 the code metadata.
pub fn read_dictionary(path: &Path) -> SurveyResult<DataDictionary> {
    let display = path.display().to_string();
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu {
        path: display.clone(),
    })?;
    let vars = worksheet_table(&mut workbook, 1, &display)?;
    let codes = worksheet_table(&mut workbook, 2, &display)?;
    info!(
        "read_dictionary: {} variable entries, {} code entries",
        vars.rows.len(),
        codes.rows.len()
    );
    Ok(DataDictionary { vars, codes })
}

fn worksheet_table<R>(workbook: &mut Xlsx<R>, index: usize, path: &str) -> SurveyResult<Table>
where
    R: std::io::Read + std::io::Seek,
{
    let wrange = workbook
        .worksheet_range_at(index)
        .context(EmptyExcelSnafu {})?
        .context(OpeningExcelSnafu {
            path: path.to_string(),
        })?;
    let mut rows_iter = wrange.rows();
    let header = rows_iter.next().context(EmptyExcelSnafu {})?;
    let columns: Vec<String> = header.iter().map(cell_to_string).collect();
    let rows: Vec<Vec<Datum>> = rows_iter
        .map(|row| row.iter().map(cell_to_datum).collect())
        .collect();
    Ok(Table::new(columns, rows))
}

fn cell_to_datum(cell: &calamine::DataType) -> Datum {
    match cell {
        calamine::DataType::Float(f) => Datum::Number(*f),
        calamine::DataType::Int(i) => Datum::Number(*i as f64),
        calamine::DataType::String(s) if s.trim().is_empty() => Datum::Empty,
        calamine::DataType::String(s) => Datum::Text(s.trim().to_string()),
        calamine::DataType::Bool(b) => Datum::Text(b.to_string()),
        _ => Datum::Empty,
    }
}

fn cell_to_string(cell: &calamine::DataType) -> String {
    match cell {
        calamine::DataType::String(s) => s.trim().to_string(),
        calamine::DataType::Float(f) => format!("{}", f),
        calamine::DataType::Int(i) => format!("{}", i),
        _ => String::new(),
    }
}
