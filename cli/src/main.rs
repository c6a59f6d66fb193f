mod config;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use codespan_reporting::files::{Files, SimpleFiles};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::info;
use tracing_subscriber::EnvFilter;

use readme::{Lifecycle, ProcessEnv, SubstitutionContext};
use runner::Execute;

use crate::config::{Overrides, Settings};

const SUBCOMMANDS: &[&str] = &["run", "plan", "check", "test", "help"];

#[derive(Parser)]
#[command(
    name = "sst",
    version,
    about = "Build and deploy a sample using the commands tagged in its README"
)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the lifecycle and execute it in the sample directory
    Run(SampleArgs),

    /// Print the lifecycle without executing it
    Plan(SampleArgs),

    /// Parse only, don't execute (exit 0 if valid)
    Check(SampleArgs),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct SampleArgs {
    /// Sample directory, or the README inside it
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Deployment target name substituted into `run services deploy|update`
    #[arg(long, env = "SST_SERVICE")]
    service: Option<String>,

    /// Image reference substituted for registry references
    #[arg(long, env = "SST_IMAGE")]
    image: Option<String>,

    /// Config file (default: sst.toml in the sample directory)
    #[arg(long, env = "SST_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Run,
    Plan,
    Check,
}

fn main() {
    // `sst path/to/sample` is shorthand for `sst run path/to/sample`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().skip(1).position(|a| !a.starts_with('-')) {
        if !SUBCOMMANDS.contains(&args[pos + 1].as_str()) {
            args.insert(pos + 1, "run".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose, cli.no_color);

    let exit_code = match cli.command {
        Command::Run(sample) => do_sample(sample, Mode::Run, cli.no_color),
        Command::Plan(sample) => do_sample(sample, Mode::Plan, cli.no_color),
        Command::Check(sample) => do_sample(sample, Mode::Check, cli.no_color),
        Command::Test(test_args) => {
            if test_args.list_categories {
                test_runner::list_categories(&test_args.path);
                0
            } else {
                test_runner::run_tests(&test_args.path, cli.no_color, &test_args.category)
            }
        }
    };
    process::exit(exit_code);
}

fn init_logging(verbose: bool, no_color: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .without_time()
        .init();
}

fn do_sample(args: SampleArgs, mode: Mode, no_color: bool) -> i32 {
    match try_sample(args, mode, no_color) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {:#}", err);
            1
        }
    }
}

fn try_sample(args: SampleArgs, mode: Mode, no_color: bool) -> Result<()> {
    info!("Setting up configuration values");
    let overrides = Overrides {
        service: args.service,
        image: args.image,
        config: args.config,
    };
    let settings = Settings::resolve(&args.path, &overrides, &ProcessEnv)?;
    info!(
        readme = %settings.readme.display(),
        service = %settings.service,
        image = %settings.image,
        "resolved sample"
    );

    let lifecycle = load_lifecycle(&settings, no_color)?;

    match mode {
        Mode::Check => {
            eprintln!(
                "ok: {} parsed successfully ({} commands)",
                settings.readme.display(),
                lifecycle.len()
            );
        }
        Mode::Plan => print!("{}", lifecycle),
        Mode::Run => {
            if lifecycle.is_empty() {
                bail!("no tagged code blocks found in {}", settings.readme.display());
            }
            info!(steps = lifecycle.len(), "Building and deploying sample");
            lifecycle
                .execute(&settings.sample_dir)
                .context("building and deploying sample")?;
            info!("Lifecycle finished");
        }
    }
    Ok(())
}

/// Parse the README, rendering parse errors against the source.
fn load_lifecycle(settings: &Settings, no_color: bool) -> Result<Lifecycle> {
    let source = std::fs::read_to_string(&settings.readme)
        .with_context(|| format!("cannot read '{}'", settings.readme.display()))?;

    let ctx = SubstitutionContext::new(&settings.service, &settings.image);
    let parser = readme::parser::Parser::with_tag(&settings.tag);

    match parser.lifecycle(source.lines(), &ctx) {
        Ok(lifecycle) => Ok(lifecycle),
        Err(err) => {
            emit_parse_error(&settings.readme, source, &err, no_color);
            bail!("{} could not be parsed", settings.readme.display())
        }
    }
}

fn emit_parse_error(path: &Path, source: String, error: &readme::ParseError, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(path.display().to_string(), source);
    let span = files.line_range(file_id, error.line()).unwrap_or(0..0);

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let diagnostic = error.to_diagnostic(file_id, span);
    let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
}
