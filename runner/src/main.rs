use clap::Parser;
use microbench_runner::{
    cases,
    config::{HarnessConfig, DEFAULT_SAMPLES},
    dispatch::Dispatcher,
};
use std::{num::NonZeroUsize, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Run a fixed benchmark worker once per case, bounding concurrency")]
struct Args {
    /// case list file, one case path per line, `#` starts a comment
    #[arg(short, long)]
    input: PathBuf,

    /// maximum number of concurrently running workers
    #[arg(short = 'j', long = "jobs", default_value_t = 1)]
    jobs: usize,

    /// number of samples the worker draws per statistic
    #[arg(short, long, default_value_t = DEFAULT_SAMPLES)]
    samples: u64,

    /// launch the worker without any sampling variables
    #[arg(long)]
    no_sample: bool,

    /// harness config file describing the worker
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let Some(capacity) = NonZeroUsize::new(args.jobs) else {
        error!("--jobs must be at least 1");
        exit(1);
    };

    let config = match args.config {
        Some(ref path) => match HarnessConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config: {e}");
                exit(1);
            }
        },
        None => HarnessConfig::default(),
    };

    if config.preflight_checks() {
        exit(1);
    }

    let case_list = match cases::read_case_list(&args.input) {
        Ok(case_list) => case_list,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };

    let samples = (!args.no_sample).then_some(args.samples);
    if samples.is_none() {
        info!("no sample");
    }

    let command = config.command();
    let environment = config.environment(samples);

    let mut dispatcher = Dispatcher::new(capacity, config.poll_interval());
    let mut skipped = 0usize;

    for case in case_list {
        let descriptor = match cases::case_job(&case, &command, &environment) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                // a broken case does not halt the batch
                error!("Skipping case: {e}");
                skipped += 1;
                continue;
            }
        };

        if let Err(e) = dispatcher.submit(descriptor) {
            error!("{e}");
            skipped += 1;
        }
    }

    dispatcher.drain();

    info!(
        "Done with {} jobs ({} failed, {} never launched)",
        dispatcher.completed(),
        dispatcher.failures().len(),
        skipped
    );

    if skipped > 0 {
        exit(1);
    }
}
