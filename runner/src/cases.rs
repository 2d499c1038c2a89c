#[cfg(test)]
#[path = "cases_test.rs"]
mod cases_test;

use crate::{config::ConfigErrors, job::JobDescriptor};
use itertools::Itertools;
use std::{
    ffi::OsString,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};
use tracing::debug;

/// suffix appended to a case path to name its output file
pub const RESULT_SUFFIX: &str = ".result";

/// read the ordered case list, one case path per line
///
/// Blank lines and lines starting with `#` are skipped; everything else is
/// taken verbatim, duplicates included.
pub fn read_case_list(path: &Path) -> Result<Vec<PathBuf>, ConfigErrors> {
    let into_error = |e| ConfigErrors::CaseList {
        path: path.to_path_buf(),
        source: e,
    };

    let file = File::open(path).map_err(into_error)?;
    let lines = BufReader::new(file)
        .lines()
        .collect::<Result<Vec<String>, _>>()
        .map_err(into_error)?;

    let cases = lines
        .into_iter()
        .map(|line| line.trim_end().to_owned())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect_vec();

    debug!("Read {} cases from {}", cases.len(), path.to_string_lossy());

    Ok(cases)
}

/// path of the result file written for one case
pub fn result_path(case: &Path) -> PathBuf {
    let mut path = OsString::from(case.as_os_str());
    path.push(RESULT_SUFFIX);

    PathBuf::from(path)
}

/// build the job for one case: stdin from the case file, stdout truncated at
/// `<case>.result`, both owned by this job alone
pub fn case_job(
    case: &Path,
    command: &[String],
    environment: &[(String, String)],
) -> Result<JobDescriptor, ConfigErrors> {
    let stdin = File::open(case).map_err(|e| ConfigErrors::CaseInput {
        path: case.to_path_buf(),
        source: e,
    })?;

    let output = result_path(case);
    let stdout = File::create(&output).map_err(|e| ConfigErrors::CaseOutput {
        path: output,
        source: e,
    })?;

    Ok(JobDescriptor {
        command: command.to_vec(),
        environment: environment.to_vec(),
        stdin_source: Some(stdin),
        stdout_sink: Some(stdout),
        label: case.to_string_lossy().into_owned(),
    })
}
