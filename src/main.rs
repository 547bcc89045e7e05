use log::info;

use clap::Parser;
use snafu::{prelude::*, ErrorCompat};

use std::fs;
use std::path::PathBuf;

mod args;
mod survey;

use crate::args::Args;
use crate::survey::config_reader::{read_config, EstimateRequest, SurveyConfig};
use crate::survey::{IoSnafu, ParsingJsonSnafu, SurveyResult};

fn main() {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}

fn run(args: &Args) -> SurveyResult<()> {
    if args.show_dictionary {
        let client = reqwest::blocking::Client::new();
        let tmp = tempfile::tempdir().whatever_context("cannot create a temporary directory")?;
        let dictionary = survey::dictionary::fetch_data_dictionary(&client, tmp.path())?;
        println!(
            "dictionary: {} variable entries, {} code entries",
            dictionary.vars.rows.len(),
            dictionary.codes.rows.len()
        );
        if args.config.is_none() && args.year.is_none() {
            return Ok(());
        }
    }

    let config = resolve_config(args)?;
    info!("config: {:?}", config);

    // Keeps a downloaded archive alive until estimation is done.
    let mut _download_dir: Option<tempfile::TempDir> = None;
    let data_dir: PathBuf = match config.data_dir.clone() {
        Some(dir) => PathBuf::from(dir),
        None => {
            let tmp =
                tempfile::tempdir().whatever_context("cannot create a temporary directory")?;
            let client = reqwest::blocking::Client::new();
            let zip_path =
                survey::fetch::download_interview_archive(&client, config.survey_year, tmp.path())?;
            survey::extract::extract_archive(&zip_path, tmp.path())?;
            let dir = tmp.path().to_path_buf();
            _download_dir = Some(tmp);
            dir
        }
    };

    let summary = survey::run_estimation(&config, &data_dir)?;
    let pretty = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
    println!("{}", pretty);

    let out_path = args.out.clone().or_else(|| config.output_path.clone());
    if let Some(path) = out_path {
        fs::write(&path, &pretty).context(IoSnafu { path: path.clone() })?;
        info!("summary written to {}", path);
    }

    if let Some(reference) = args.reference.as_deref() {
        survey::check_reference(&summary, reference)?;
        info!("summary matches the reference");
    }

    Ok(())
}

// The run configuration: a JSON file, or assembled from the flags.
fn resolve_config(args: &Args) -> SurveyResult<SurveyConfig> {
    if let Some(path) = args.config.clone() {
        let mut config = read_config(path)?;
        // Flags override single fields of the file.
        if let Some(dir) = args.data_dir.clone() {
            config.data_dir = Some(dir);
        }
        if args.unrevised_first_quarter {
            config.first_quarter_revised = Some(false);
        }
        return Ok(config);
    }

    let year = match args.year {
        Some(y) => y,
        None => whatever!("either --config or --year must be provided"),
    };
    let variable = match args.variable.clone() {
        Some(v) => v,
        None => whatever!("--variable is required when no --config is given"),
    };
    let variable_type = match args.variable_type.clone() {
        Some(t) => t,
        None => whatever!("--variable-type is required when no --config is given"),
    };
    Ok(SurveyConfig {
        survey_year: year,
        first_quarter_revised: Some(!args.unrevised_first_quarter),
        data_dir: args.data_dir.clone(),
        output_path: None,
        estimates: vec![EstimateRequest {
            variable,
            variable_type,
        }],
    })
}
