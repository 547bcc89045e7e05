use clap::Parser;

/// This is an annual estimation program for consumer expenditure interview data.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON run configuration describing the survey year and the
    /// estimates to compute. Individual flags below override single fields of the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (integer) The nominal survey year to estimate. Required unless --config is given.
    #[clap(short, long, value_parser)]
    pub year: Option<i32>,

    /// (string) The name of the survey variable to estimate, for example TOTEXPPQ.
    #[clap(long, value_parser)]
    pub variable: Option<String>,

    /// ('expense' or 'demographic') How the variable combines across quarters: a flow
    /// accumulated over the months in scope, or a point-in-time quantity.
    #[clap(long, value_parser)]
    pub variable_type: Option<String>,

    /// (directory, optional) A directory holding already-extracted quarter files. When
    /// given, nothing is downloaded and the files are used as-is.
    #[clap(short, long, value_parser)]
    pub data_dir: Option<String>,

    /// Use the original first-quarter file instead of the revised one (the file with the
    /// 'x' suffix).
    #[clap(long, takes_value = false)]
    pub unrevised_first_quarter: bool,

    /// (file path or empty) If specified, the estimate summary will be written in JSON
    /// format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, cextab will check
    /// that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// Download the variable dictionary workbook and report its contents.
    #[clap(long, takes_value = false)]
    pub show_dictionary: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
