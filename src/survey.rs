use log::{debug, info, warn};

use panel_estimation::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::survey::config_reader::*;

pub mod config_reader;
pub mod dictionary;
pub mod extract;
pub mod fetch;
pub mod io_csv;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SurveyError {
    #[snafu(display("Error downloading {url}"))]
    Retrieval { source: reqwest::Error, url: String },
    #[snafu(display("Error opening archive {path}"))]
    ArchiveOpen {
        source: zip::result::ZipError,
        path: String,
    },
    #[snafu(display("Error unpacking archive member {name}"))]
    ArchiveRead {
        source: std::io::Error,
        name: String,
    },
    #[snafu(display("No quarter files found under {dir}"))]
    QuarterFilesNotFound { dir: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display(""))]
    EmptyExcel {},
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV record {lineno}"))]
    CsvLine { source: csv::Error, lineno: usize },
    #[snafu(display("Error opening {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("I/O error on {path}"))]
    Io {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    Estimation { source: EstimationError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

// The last two digits of a year, as used in the quarter file names.
fn short_year(year: i32) -> String {
    format!("{:02}", year.rem_euclid(100))
}

/// The five quarter file paths for a survey year, under the directory that
/// holds the fmli CSV files. The fifth file is the first-quarter file of the
/// following year; the first may carry the revised `x` suffix.
pub fn quarter_file_paths(
    fmli_dir: &Path,
    year: i32,
    first_quarter_revised: bool,
) -> Vec<PathBuf> {
    let yy = short_year(year);
    let next_yy = short_year(year + 1);
    let q1_suffix = if first_quarter_revised { "x" } else { "" };
    vec![
        fmli_dir.join(format!("fmli{}1{}.csv", yy, q1_suffix)),
        fmli_dir.join(format!("fmli{}2.csv", yy)),
        fmli_dir.join(format!("fmli{}3.csv", yy)),
        fmli_dir.join(format!("fmli{}4.csv", yy)),
        fmli_dir.join(format!("fmli{}1.csv", next_yy)),
    ]
}

/// Locates the directory holding the fmli quarter files somewhere under
/// `data_dir`. The archives nest them in a per-year subdirectory.
pub fn find_fmli_dir(data_dir: &Path) -> SurveyResult<PathBuf> {
    let pattern = format!("{}/**/fmli*.csv", data_dir.display());
    let first = glob::glob(pattern.as_str())
        .ok()
        .and_then(|mut paths| paths.find_map(|p| p.ok()));
    let path = first.context(QuarterFilesNotFoundSnafu {
        dir: data_dir.display().to_string(),
    })?;
    Ok(path.parent().unwrap_or(data_dir).to_path_buf())
}

/// Reads, normalizes and assembles the five quarter files of a survey year.
pub fn load_panel(
    data_dir: &Path,
    year: i32,
    first_quarter_revised: bool,
) -> SurveyResult<Panel> {
    let fmli_dir = find_fmli_dir(data_dir)?;
    let paths = quarter_file_paths(&fmli_dir, year, first_quarter_revised);
    let mut builder = PanelBuilder::new();
    for (idx, path) in paths.iter().enumerate() {
        let nominal_quarter = (idx + 1) as u8;
        info!(
            "load_panel: reading quarter {} from {}",
            nominal_quarter,
            path.display()
        );
        let raw = io_csv::read_table(path)?;
        let normalized =
            normalize_quarter(&raw, year, nominal_quarter).context(EstimationSnafu {})?;
        builder.add_quarter(normalized);
    }
    builder.build().context(EstimationSnafu {})
}

/// Runs every estimate of the configuration over one assembled panel and
/// returns the summary document.
pub fn run_estimation(config: &SurveyConfig, data_dir: &Path) -> SurveyResult<JSValue> {
    let first_quarter_revised = config.first_quarter_revised.unwrap_or(true);
    let panel = load_panel(data_dir, config.survey_year, first_quarter_revised)?;

    let mut results: Vec<JSValue> = Vec::new();
    for request in config.estimates.iter() {
        let variable_type: VariableType =
            request.variable_type.parse().context(EstimationSnafu {})?;
        let estimate = estimate_annual(&panel, request.variable.as_str(), variable_type)
            .context(EstimationSnafu {})?;
        if estimate.is_nan() {
            warn!(
                "estimate for {} is undefined: some quarter has zero total effective weight",
                request.variable
            );
        }
        debug!("run_estimation: {} -> {}", request.variable, estimate);
        results.push(json!({
            "variable": request.variable,
            "variableType": request.variable_type,
            "estimate": json_number(estimate),
        }));
    }

    let output_config = OutputConfig {
        survey_year: config.survey_year,
        first_quarter_revised,
    };
    Ok(json!({ "config": output_config, "results": results }))
}

// NaN has no JSON representation; an undefined estimate is emitted as null.
fn json_number(x: f64) -> JSValue {
    if x.is_nan() {
        JSValue::Null
    } else {
        json!(x)
    }
}

/// Compares the computed summary against a reference summary on disk.
/// Differences are printed and turned into an error.
pub fn check_reference(summary: &JSValue, reference_path: &str) -> SurveyResult<()> {
    let reference = read_summary(reference_path.to_string())?;
    let pretty = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
    let pretty_ref = serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    if pretty_ref != pretty {
        warn!("Found differences with the reference summary");
        print_diff(pretty_ref.as_str(), pretty.as_str(), "\n");
        whatever!("Difference detected between calculated summary and reference summary");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const QUARTER_HEADER: &str = "NEWID,QINTRVMO,QINTRVYR,FINLWT21,TOTEXPPQ";

    fn write_quarter(dir: &Path, name: &str, rows: &[(i64, i64, f64, f64)]) {
        let mut contents = String::from(QUARTER_HEADER);
        for (id, month, weight, value) in rows {
            contents.push_str(&format!("\n{},{},2016,{},{}", id, month, weight, value));
        }
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn quarter_paths_follow_the_survey_naming() {
        let dir = Path::new("data");
        let revised = quarter_file_paths(dir, 2016, true);
        assert_eq!(revised[0], dir.join("fmli161x.csv"));
        assert_eq!(revised[1], dir.join("fmli162.csv"));
        assert_eq!(revised[4], dir.join("fmli171.csv"));

        let unrevised = quarter_file_paths(dir, 1999, false);
        assert_eq!(unrevised[0], dir.join("fmli991.csv"));
        // The fifth file rolls over the century.
        assert_eq!(unrevised[4], dir.join("fmli001.csv"));
    }

    #[test]
    fn csv_cells_become_typed_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.csv");
        fs::write(&path, "NEWID,STATE,BLANK\n1234561,TX,\n1234572,5.5,x\n").unwrap();

        let table = io_csv::read_table(&path).unwrap();
        assert_eq!(table.columns, vec!["NEWID", "STATE", "BLANK"]);
        assert_eq!(table.rows[0][0], Datum::Number(1234561.0));
        assert_eq!(table.rows[0][1], Datum::Text("TX".to_string()));
        assert_eq!(table.rows[0][2], Datum::Empty);
        assert_eq!(table.rows[1][1], Datum::Number(5.5));
        assert_eq!(table.rows[1][2], Datum::Text("x".to_string()));
    }

    #[test]
    fn extract_archive_restores_members() {
        use zip::write::{ExtendedFileOptions, FileOptions};
        use zip::CompressionMethod;

        let dir = tempfile::tempdir().unwrap();
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = || {
                FileOptions::<ExtendedFileOptions>::default()
                    .compression_method(CompressionMethod::Stored)
            };
            zip.start_file("intrvw16/fmli161.csv", options()).unwrap();
            zip.write_all(QUARTER_HEADER.as_bytes()).unwrap();
            zip.start_file("intrvw16/readme.txt", options()).unwrap();
            zip.write_all(b"notes").unwrap();
            zip.finish().unwrap();
        }
        let zip_path = dir.path().join("intrvw16.zip");
        fs::write(&zip_path, &buf).unwrap();

        let members = extract::extract_archive(&zip_path, dir.path()).unwrap();
        assert_eq!(members.len(), 2);
        let extracted = members.get("intrvw16/fmli161.csv").unwrap();
        assert_eq!(fs::read_to_string(extracted).unwrap(), QUARTER_HEADER);
    }

    #[test]
    fn offline_estimation_runs_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let fmli_dir = dir.path().join("intrvw16");
        fs::create_dir_all(&fmli_dir).unwrap();
        // One consuming unit, weight 1000, spending 100 in every wave;
        // months in scope run 1, 3, 3, 3, 1.
        write_quarter(&fmli_dir, "fmli161.csv", &[(1234561, 2, 1000.0, 100.0)]);
        write_quarter(&fmli_dir, "fmli162.csv", &[(1234562, 6, 1000.0, 100.0)]);
        write_quarter(&fmli_dir, "fmli163.csv", &[(1234563, 9, 1000.0, 100.0)]);
        write_quarter(&fmli_dir, "fmli164.csv", &[(1234564, 12, 1000.0, 100.0)]);
        write_quarter(&fmli_dir, "fmli171.csv", &[(1234565, 3, 1000.0, 100.0)]);

        let config = SurveyConfig {
            survey_year: 2016,
            first_quarter_revised: Some(false),
            data_dir: None,
            output_path: None,
            estimates: vec![EstimateRequest {
                variable: "TOTEXPPQ".to_string(),
                variable_type: "expense".to_string(),
            }],
        };
        let summary = run_estimation(&config, dir.path()).unwrap();

        assert_eq!(summary["config"]["surveyYear"], json!(2016));
        let results = summary["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["variable"], json!("TOTEXPPQ"));
        let estimate = results[0]["estimate"].as_f64().unwrap();
        assert!((estimate - 720.0).abs() < 1e-9);
    }

    #[test]
    fn missing_quarter_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let res = find_fmli_dir(dir.path());
        assert!(matches!(
            res,
            Err(SurveyError::QuarterFilesNotFound { .. })
        ));
    }
}
