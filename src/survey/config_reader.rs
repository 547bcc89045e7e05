use crate::survey::*;

use serde::{Deserialize, Serialize};

/// One estimate to compute: a survey variable and how it combines across
/// quarters.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub variable: String,
    #[serde(rename = "variableType")]
    pub variable_type: String,
}

/// A run configuration, read from JSON.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "surveyYear")]
    pub survey_year: i32,
    /// Whether to prefer the revised first-quarter file. Defaults to true.
    #[serde(rename = "firstQuarterRevised")]
    pub first_quarter_revised: Option<bool>,
    /// A directory with already-extracted quarter files. When present,
    /// nothing is downloaded.
    #[serde(rename = "dataDir")]
    pub data_dir: Option<String>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
    pub estimates: Vec<EstimateRequest>,
}

/// The configuration block echoed into the output summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "surveyYear")]
    pub survey_year: i32,
    #[serde(rename = "firstQuarterRevised")]
    pub first_quarter_revised: bool,
}

pub fn read_config(path: String) -> SurveyResult<SurveyConfig> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let config: SurveyConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Reads a reference summary for comparison against the computed one.
pub fn read_summary(path: String) -> SurveyResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
