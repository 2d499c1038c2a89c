#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::Error,
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;
use tracing::error;

/// worker sample count used when none is given, matching the stock driver
pub const DEFAULT_SAMPLES: u64 = 50_000_000;

// check if a file is executable
pub fn check_executable(path: &Path) -> Result<bool, ConfigErrors> {
    if !path.is_file() {
        Err(ConfigErrors::FileNotFound)
    } else {
        match File::open(path).map(|file| file.metadata()) {
            Ok(Ok(metadata)) => Ok((metadata.mode() & 0o111) != 0),
            Ok(Err(e)) | Err(e) => Err(ConfigErrors::MetadataNotFound(e)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read config file {path}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: Error,
    },
    #[error("Config file was invalid")]
    InvalidConfig(#[from] serde_yaml::Error),
    #[error("File not found")]
    FileNotFound,
    #[error("Metadata not found")]
    MetadataNotFound(#[from] Error),
    #[error("Failed to read case list {path}")]
    CaseList {
        path: PathBuf,
        #[source]
        source: Error,
    },
    #[error("Failed to open case input {path}")]
    CaseInput {
        path: PathBuf,
        #[source]
        source: Error,
    },
    #[error("Failed to create result file {path}")]
    CaseOutput {
        path: PathBuf,
        #[source]
        source: Error,
    },
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    // the worker launched once per benchmark case
    pub worker: WorkerConfig,

    // extra variables merged over the sampling overlay, keys unique
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    // tick of the dispatcher's completion poll loop
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    pub exec: PathBuf,
    #[serde(default)]
    pub params: Vec<String>,
}

/// sampling variables understood by the worker, derived from one sample count
///
/// `CALC_PCT_PARAM` carries the percentile window in addition to the count,
/// the remaining variables take the count and an offset of zero.
pub fn sampling_env(n_sample: u64) -> Vec<(String, String)> {
    vec![
        ("CALC_PCT_PARAM".to_owned(), format!("0 -1 {n_sample} 0")),
        ("CALC_BPOS_SAMPLE".to_owned(), format!("{n_sample} 0")),
        ("CALC_POS_SAMPLE".to_owned(), format!("{n_sample} 0")),
        ("CALC_RPOS_SAMPLE".to_owned(), format!("{n_sample} 0")),
        ("CALC_RAPOS_SAMPLE".to_owned(), format!("{n_sample} 0")),
    ]
}

impl HarnessConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let file = File::open(path).map_err(|e| ConfigErrors::ReadConfig {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(serde_yaml::from_reader(file)?)
    }

    /// full worker command line, executable first
    pub fn command(&self) -> Vec<String> {
        let mut command = vec![self.worker.exec.to_string_lossy().into_owned()];
        command.extend(self.worker.params.iter().cloned());

        command
    }

    /// environment overlay for one worker invocation
    ///
    /// `samples` of None disables sampling entirely; the config's `env` table
    /// wins over the derived sampling variables on key collisions.
    pub fn environment(&self, samples: Option<u64>) -> Vec<(String, String)> {
        let mut environment: BTreeMap<String, String> = match samples {
            Some(n_sample) => sampling_env(n_sample).into_iter().collect(),
            None => BTreeMap::new(),
        };
        environment.extend(self.env.clone());

        environment.into_iter().collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// check the worker before launching anything
    pub fn preflight_checks(&self) -> bool {
        // attempt to catch all errors instead of piece-by-piece to make
        // debugging easier for users
        let mut contains_error = false;

        if !self.worker.exec.is_file() {
            error!(
                "Failed to find worker.exec. Either not a file or not found at {}",
                self.worker.exec.to_string_lossy()
            );

            contains_error = true;
        } else {
            match check_executable(&self.worker.exec) {
                Ok(is_executable) => {
                    if !is_executable {
                        error!(
                            "Worker target {} is not executable, this might cause problems",
                            self.worker.exec.to_string_lossy()
                        );
                        contains_error = true;
                    }
                }
                Err(e) => {
                    error!(
                        "Failed to determine if worker.exec ({}) is an executable: {e}",
                        self.worker.exec.to_string_lossy()
                    );

                    contains_error = true;
                }
            }
        }

        contains_error
    }
}

impl Default for HarnessConfig {
    /// the stock driver's hardcoded worker, relative to the working directory
    fn default() -> Self {
        Self {
            worker: WorkerConfig {
                exec: PathBuf::from_str("build/Calc").unwrap(),
                params: Vec::new(),
            },
            env: BTreeMap::new(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}
