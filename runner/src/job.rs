use std::fs::File;

#[derive(Debug)]
/// description of one unit of work to run as an OS process
/// immutable once built, consumed by `Dispatcher::submit`
///
/// Construction validates nothing; a missing executable or a bad argument
/// list surfaces as a launch error at submission time.
pub struct JobDescriptor {
    /// executable followed by its arguments
    pub command: Vec<String>,
    /// variables merged over the ambient environment, keys unique
    pub environment: Vec<(String, String)>,
    /// already-open stdin for the worker, None inherits the harness stdin
    pub stdin_source: Option<File>,
    /// already-open stdout for the worker, None inherits the harness stdout
    pub stdout_sink: Option<File>,
    /// diagnostic name used in logs and failure reports
    pub label: String,
}

impl JobDescriptor {
    /// descriptor with inherited streams and an empty environment overlay
    pub fn plain<S: Into<String>>(label: S, command: Vec<String>) -> Self {
        Self {
            command,
            environment: Vec::new(),
            stdin_source: None,
            stdout_sink: None,
            label: label.into(),
        }
    }
}
