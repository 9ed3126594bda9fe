//! Semantix CLI

use clap::{Args, Parser, Subcommand};
use semantix::analysis::{self, Analysis, AnalysisRequest};
use semantix::config::Config;
use semantix::error::{report_error, AnalysisError};
use semantix::{Language, Limits};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "semantix",
    version,
    about = "Semantix - execution tracer, invariant miner and complexity estimator"
)]
struct Cli {
    /// Log level (off, error, warn, info, debug, trace); overrides semantix.toml
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trace, mine invariants and estimate complexity; prints the JSON result
    Analyze {
        #[command(flatten)]
        run: RunArgs,
        /// Extra input files traced only for the empirical complexity fit
        #[arg(long = "scale")]
        scaling: Vec<PathBuf>,
    },
    /// Print the execution trace as JSON
    Trace {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Handle a JSON request (file or `-` for stdin) and print the JSON response
    Request {
        file: PathBuf,
    },
    /// Parse and dump AST (debug)
    Parse {
        file: PathBuf,
        #[arg(long)]
        language: Option<Language>,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        file: PathBuf,
        #[arg(long)]
        language: Option<Language>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Source file; the language is guessed from its extension unless given
    file: PathBuf,
    #[arg(long)]
    language: Option<Language>,
    /// File of `name = value` input bindings
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    max_steps: Option<u64>,
    #[arg(long)]
    max_call_depth: Option<u64>,
    /// Wall-clock budget in milliseconds; 0 disables it
    #[arg(long)]
    wall_clock_ms: Option<u64>,
    /// Approximate bytes the recorded trace may hold
    #[arg(long)]
    max_trace_bytes: Option<u64>,
}

impl RunArgs {
    fn limits(&self, base: Limits) -> Limits {
        Limits {
            max_steps: self.max_steps.unwrap_or(base.max_steps),
            max_call_depth: self.max_call_depth.unwrap_or(base.max_call_depth),
            wall_clock_ms: self.wall_clock_ms.unwrap_or(base.wall_clock_ms),
            max_trace_bytes: self.max_trace_bytes.unwrap_or(base.max_trace_bytes),
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut config = match Config::load(&cwd) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    if let Err(e) = init_logging(&config) {
        eprintln!("Error: {e}");
        std::process::exit(2);
    }

    let result = match &cli.command {
        Command::Analyze { run, scaling } => analyze_file(run, scaling, &config),
        Command::Trace { run } => trace_file(run, &config),
        Command::Request { file } => handle_request(file),
        Command::Parse { file, language } => parse_file(file, *language),
        Command::Tokens { file, language } => tokenize_file(file, *language),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    TermLogger::init(
        config.log.level_filter()?,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;
    if let Some(path) = &config.source {
        log::info!("using {}", path.display());
    }
    Ok(())
}

fn language_for(path: &Path, explicit: Option<Language>) -> Result<Language, String> {
    if let Some(language) = explicit {
        return Ok(language);
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(Language::from_extension)
        .ok_or_else(|| {
            format!(
                "cannot tell the language of {}; pass --language",
                path.display()
            )
        })
}

/// Write `text` and a newline to `out`. A reader that hung up early is not
/// an error.
fn emit(mut out: impl Write, text: &str) -> io::Result<()> {
    let written = writeln!(out, "{text}").and_then(|()| out.flush());
    match written {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

fn emit_json(value: &impl serde::Serialize) -> CliResult {
    emit(io::stdout().lock(), &serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn read_input(path: Option<&Path>) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => Ok(String::new()),
    }
}

/// Print a diagnostic for `error` against whichever text it points into
fn report(run: &RunArgs, source: &str, input: &str, error: &AnalysisError) {
    let input_error = matches!(error, AnalysisError::Syntax(e) if e.span == Default::default())
        && !input.is_empty();
    match (&run.input, input_error) {
        (Some(path), true) => report_error(&path.display().to_string(), input, error),
        _ => report_error(&run.file.display().to_string(), source, error),
    }
}

fn analyze_file(run: &RunArgs, scaling: &[PathBuf], config: &Config) -> CliResult {
    let source = std::fs::read_to_string(&run.file)?;
    let language = language_for(&run.file, run.language)?;
    let input = read_input(run.input.as_deref())?;
    let scaling = scaling
        .iter()
        .map(std::fs::read_to_string)
        .collect::<std::io::Result<Vec<_>>>()?;

    let outcome = Analysis::new(&source, language, run.limits(config.limits))
        .and_then(|analysis| analysis.run(&input, &scaling));
    match outcome {
        Ok(result) => {
            log::info!(
                "{} step(s), {} loop invariant(s), {} recursion invariant(s)",
                result.trace.len(),
                result.loop_invariants.len(),
                result.recursion_invariants.len()
            );
            emit_json(&result)
        }
        Err(e) => {
            report(run, &source, &input, &e);
            Err(e.into())
        }
    }
}

fn trace_file(run: &RunArgs, config: &Config) -> CliResult {
    let source = std::fs::read_to_string(&run.file)?;
    let language = language_for(&run.file, run.language)?;
    let input = read_input(run.input.as_deref())?;

    let outcome = Analysis::new(&source, language, run.limits(config.limits))
        .and_then(|analysis| analysis.trace(&input));
    match outcome {
        Ok(trace) => {
            emit_json(&trace)
        }
        Err(e) => {
            report(run, &source, &input, &e);
            Err(e.into())
        }
    }
}

fn handle_request(path: &Path) -> CliResult {
    let text = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(path)?
    };
    let request: AnalysisRequest = serde_json::from_str(&text)?;
    let response = analysis::analyze_request(&request);
    emit_json(&response)
}

fn parse_file(path: &Path, language: Option<Language>) -> CliResult {
    let source = std::fs::read_to_string(path)?;
    let language = language_for(path, language)?;
    match semantix::parse(&source, language) {
        Ok(program) => {
            emit_json(&program)
        }
        Err(e) => {
            let error = AnalysisError::from(e);
            report_error(&path.display().to_string(), &source, &error);
            Err(error.into())
        }
    }
}

fn tokenize_file(path: &Path, language: Option<Language>) -> CliResult {
    let source = std::fs::read_to_string(path)?;
    let language = language_for(path, language)?;

    let tokens = semantix::lexer::tokenize(&source, language)?;
    let mut listing = String::new();
    for (tok, span) in &tokens {
        writeln!(listing, "{:?} @ {}..{}", tok, span.start, span.end)?;
    }
    emit(io::stdout().lock(), listing.trim_end())?;

    Ok(())
}
