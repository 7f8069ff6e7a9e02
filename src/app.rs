use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::{Parser, ValueEnum, error::ErrorKind};
use tracing::{info, info_span};
use uuid::Uuid;

use crate::cleaner::clean_source;
use crate::config::{BalanceType, SampleSizePolicy, SamplingParameters};
use crate::constants::cli::{
    BIN_NAME, EXIT_EMPTY_POPULATION, EXIT_FAILURE, EXIT_INVALID_PARAMETERS, EXIT_UNREADABLE_SOURCE,
};
use crate::constants::events::RUN_START;
use crate::constants::sampler::DEFAULT_SEED;
use crate::errors::SamplingError;
use crate::report::{
    RunSummary, SamplingMode, rounded_seconds, write_run_summary, write_sample_report,
};
use crate::sampler::{ProgressEvent, StreamPass, sample_population, sample_streaming};
use crate::source::CsvFileSource;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BalanceArg {
    Debit,
    Credit,
    Both,
}

impl From<BalanceArg> for BalanceType {
    fn from(value: BalanceArg) -> Self {
        match value {
            BalanceArg::Debit => BalanceType::Debit,
            BalanceArg::Credit => BalanceType::Credit,
            BalanceArg::Both => BalanceType::Both,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "audit-sample",
    disable_help_subcommand = true,
    about = "Audit sampling tool (random non-statistical)",
    long_about = "Select every transaction above the sampling interval plus a seeded random draw from the remainder, then write the sample as CSV and a JSON run summary.",
    after_help = "Exit status: 2 invalid parameters, 3 unreadable input, 4 empty population after cleaning."
)]
struct AuditSampleCli {
    #[arg(long, value_name = "CSV", help = "Path to the population CSV file")]
    input: PathBuf,
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        help = "Directory receiving the sample CSV and runs/<run_id>.json"
    )]
    output_dir: PathBuf,
    #[arg(long, allow_negative_numbers = true, help = "Tolerable misstatement amount")]
    tolerable: f64,
    #[arg(long, allow_negative_numbers = true, help = "Expected misstatement amount")]
    expected: f64,
    #[arg(long, allow_negative_numbers = true, help = "Assurance factor")]
    assurance: f64,
    #[arg(
        long = "balance-type",
        value_enum,
        default_value = "both",
        help = "Balance side to include"
    )]
    balance_type: BalanceArg,
    #[arg(
        long = "high-value",
        allow_negative_numbers = true,
        help = "Override the high-value threshold (sampling interval)"
    )]
    high_value: Option<f64>,
    #[arg(long, default_value_t = DEFAULT_SEED, help = "Deterministic random seed")]
    seed: u64,
    #[arg(long = "include-zeros", help = "Keep zero-amount transactions in the population")]
    include_zeros: bool,
    #[arg(
        long,
        help = "Streaming mode for large CSVs: reads the input twice with reservoir sampling"
    )]
    fast: bool,
    #[arg(
        long = "sample-size",
        conflicts_with = "sample_proportion",
        help = "Draw a fixed number of remainder items instead of balance / interval"
    )]
    sample_size: Option<usize>,
    #[arg(
        long = "sample-proportion",
        allow_negative_numbers = true,
        help = "Draw this share (0, 1] of the remainder items instead of balance / interval"
    )]
    sample_proportion: Option<f64>,
    #[arg(long, help = "Print progress while streaming")]
    progress: bool,
    #[arg(
        long = "run-id",
        help = "Run identifier; a UUID is generated when omitted"
    )]
    run_id: Option<String>,
}

impl AuditSampleCli {
    fn parameters(&self) -> SamplingParameters {
        let sample_size = match (self.sample_size, self.sample_proportion) {
            (Some(count), _) => SampleSizePolicy::Fixed(count),
            (None, Some(share)) => SampleSizePolicy::Proportion(share),
            (None, None) => SampleSizePolicy::BalanceOverInterval,
        };
        SamplingParameters {
            tolerable: self.tolerable,
            expected: self.expected,
            assurance: self.assurance,
            balance_type: self.balance_type.into(),
            high_value_override: self.high_value,
            seed: self.seed,
            include_zeros: self.include_zeros,
            sample_size,
        }
    }
}

/// Run the full sampling workflow from command line arguments.
///
/// `args_iter` excludes the program name. Returns `Ok(None)` when help or
/// version output was requested, otherwise the persisted run summary.
pub fn run_audit_sample<I>(args_iter: I) -> Result<Option<RunSummary>, Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) =
        parse_cli::<AuditSampleCli, _>(std::iter::once(BIN_NAME.to_string()).chain(args_iter))?
    else {
        return Ok(None);
    };

    let params = cli.parameters();
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let span = info_span!("run", run_id = %run_id);
    let _guard = span.enter();
    info!(
        event = RUN_START,
        input = %cli.input.display(),
        tolerable = params.tolerable,
        expected = params.expected,
        assurance = params.assurance,
        balance_type = %params.balance_type,
        seed = params.seed,
        fast = cli.fast,
        "run started"
    );
    params.validate()?;

    let started_at_utc = Utc::now();
    let started = Instant::now();
    let mut source = CsvFileSource::new(&cli.input);
    let (result, data_quality, mode, cleaning, sampling) = if cli.fast {
        let show_progress = cli.progress;
        let mut progress = |event: ProgressEvent| {
            if show_progress {
                let pass = match event.pass {
                    StreamPass::Aggregate => "pass 1/2",
                    StreamPass::Draw => "pass 2/2",
                };
                let state = if event.finished { "done" } else { "reading" };
                eprintln!("{pass}: {} rows {state}", event.rows_read);
            }
        };
        let (result, quality) = sample_streaming(&mut source, &params, &mut progress)?;
        (
            result,
            quality,
            SamplingMode::Streaming,
            Duration::ZERO,
            started.elapsed(),
        )
    } else {
        let (population, quality) = clean_source(&mut source, &params)?;
        let cleaning = started.elapsed();
        if population.is_empty() {
            return Err(SamplingError::EmptyPopulation {
                quality: Box::new(quality),
            }
            .into());
        }
        let sampling_start = Instant::now();
        let result = sample_population(population, &params)?;
        (
            result,
            quality,
            SamplingMode::InMemory,
            cleaning,
            sampling_start.elapsed(),
        )
    };

    let reporting_start = Instant::now();
    let output_report = write_sample_report(&cli.output_dir, &result)?;
    let reporting = reporting_start.elapsed();
    println!("Report generated at: {}", output_report.display());

    let summary = RunSummary {
        run_id,
        started_at_utc,
        finished_at_utc: Utc::now(),
        duration_seconds: rounded_seconds(started.elapsed()),
        cleaning_seconds: rounded_seconds(cleaning),
        sampling_seconds: rounded_seconds(sampling),
        reporting_seconds: rounded_seconds(reporting),
        mode,
        parameters: params,
        data_quality,
        sample_size: result.sample_size(),
        sample_statistics: result.statistics,
        output_report,
        methodology: RunSummary::methodology(),
        version: RunSummary::version(),
    };
    let summary_path = write_run_summary(&cli.output_dir, &summary)?;
    println!("Summary written to: {}", summary_path.display());
    Ok(Some(summary))
}

/// Map a run failure onto the process exit status.
pub fn exit_code(err: &(dyn Error + 'static)) -> u8 {
    if let Some(err) = err.downcast_ref::<SamplingError>() {
        return match err {
            SamplingError::InvalidParameters { .. } => EXIT_INVALID_PARAMETERS,
            SamplingError::UnreadableSource { .. } => EXIT_UNREADABLE_SOURCE,
            SamplingError::EmptyPopulation { .. } => EXIT_EMPTY_POPULATION,
            SamplingError::Io(_) => EXIT_FAILURE,
        };
    }
    if err.downcast_ref::<clap::Error>().is_some() {
        return EXIT_INVALID_PARAMETERS;
    }
    EXIT_FAILURE
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
