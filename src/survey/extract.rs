// Unpacking the downloaded archives.

use crate::survey::*;

use std::collections::BTreeMap;
use std::fs::File;
use std::io;

use zip::ZipArchive;

/// Extracts every file member of the archive into `dest_dir` and returns
/// the member name to extracted path mapping.
pub fn extract_archive(
    zip_path: &Path,
    dest_dir: &Path,
) -> SurveyResult<BTreeMap<String, PathBuf>> {
    let display = zip_path.display().to_string();
    let file = File::open(zip_path).context(IoSnafu {
        path: display.clone(),
    })?;
    let mut archive = ZipArchive::new(file).context(ArchiveOpenSnafu {
        path: display.clone(),
    })?;

    let mut members: BTreeMap<String, PathBuf> = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).context(ArchiveOpenSnafu {
            path: display.clone(),
        })?;
        let name = entry.name().to_string();
        if entry.is_dir() {
            continue;
        }
        // Member names with traversal components are skipped rather than
        // written outside the destination.
        let rel = match entry.enclosed_name() {
            Some(p) => p,
            None => {
                warn!("extract_archive: skipping unsafe member name {:?}", name);
                continue;
            }
        };
        let out_path = dest_dir.join(rel);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).context(IoSnafu {
                path: parent.display().to_string(),
            })?;
        }
        let mut out = File::create(&out_path).context(IoSnafu {
            path: out_path.display().to_string(),
        })?;
        io::copy(&mut entry, &mut out).context(ArchiveReadSnafu { name: name.clone() })?;
        members.insert(name, out_path);
    }
    info!(
        "extract_archive: {} members into {}",
        members.len(),
        dest_dir.display()
    );
    Ok(members)
}
