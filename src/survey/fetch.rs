// Retrieval of the public-use microdata archives.

use crate::survey::*;

use reqwest::blocking::Client;

// One ZIP per survey year, holding the five quarter CSV files.
const ARCHIVE_URL_BASE: &str = "https://www.bls.gov/cex/pumd/data/comma";

pub fn interview_archive_url(year: i32) -> String {
    format!("{}/intrvw{:02}.zip", ARCHIVE_URL_BASE, year.rem_euclid(100))
}

/// Downloads the interview archive for `year` into `dest_dir` and returns
/// the path of the saved file. Network failures propagate immediately;
/// there is no retry.
pub fn download_interview_archive(
    client: &Client,
    year: i32,
    dest_dir: &Path,
) -> SurveyResult<PathBuf> {
    let url = interview_archive_url(year);
    info!("download_interview_archive: {}", url);
    let resp = client
        .get(url.as_str())
        .send()
        .and_then(|r| r.error_for_status())
        .context(RetrievalSnafu { url: url.clone() })?;
    let bytes = resp.bytes().context(RetrievalSnafu { url: url.clone() })?;

    let dest_path = dest_dir.join(format!("intrvw{:02}.zip", year.rem_euclid(100)));
    fs::write(&dest_path, &bytes).context(IoSnafu {
        path: dest_path.display().to_string(),
    })?;
    info!(
        "download_interview_archive: {} bytes saved to {}",
        bytes.len(),
        dest_path.display()
    );
    Ok(dest_path)
}
