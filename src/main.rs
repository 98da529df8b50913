//! fairdice - roll and verify provably fair dice from the command line

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use fairdice::config::{LogFormat, OutputFormat};
use fairdice::dice::{parse_dice, DiceRoll};
use fairdice::{Config, DiceService, RollMode, RollResult, Seed, VerificationOutcome};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Provably fair dice roller
#[derive(Parser, Debug)]
#[command(name = "fairdice", version, about = "Roll and verify provably fair dice")]
struct Cli {
    /// Path to a TOML config file (default: ./fairdice.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON, overriding the configured output format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Roll a dice expression such as "2d6+3"
    Roll {
        #[arg(allow_hyphen_values = true)]
        expr: String,

        /// Seed to roll with (a fresh one is generated if omitted)
        #[arg(long)]
        seed: Option<String>,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Check a published roll against its expression and seed
    Verify {
        #[arg(allow_hyphen_values = true)]
        expr: String,

        /// Seed the roll was made with (the root seed for paired rolls)
        #[arg(long)]
        seed: String,

        /// Claimed die results, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        breakdown: Vec<u32>,

        /// Claimed total; checked as well when given
        #[arg(long, allow_hyphen_values = true)]
        total: Option<i32>,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Print a fresh random seed
    Seed,

    /// Derive a child seed from a parent seed and a label
    Derive { parent: String, label: String },
}

#[derive(Args, Debug)]
struct ModeArgs {
    /// Roll twice and keep the higher total
    #[arg(long, conflicts_with = "disadvantage")]
    advantage: bool,

    /// Roll twice and keep the lower total
    #[arg(long)]
    disadvantage: bool,
}

impl ModeArgs {
    fn mode(&self) -> RollMode {
        if self.advantage {
            RollMode::Advantage
        } else if self.disadvantage {
            RollMode::Disadvantage
        } else {
            RollMode::Normal
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout carries only results
    match config.log_format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.json {
        config.output = OutputFormat::Json;
    }

    init_tracing(&config);

    let service = DiceService::new();
    let ok = run(cli.command, config.output, &service, &mut std::io::stdout().lock())?;

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Execute one command, writing its result to `out`. Returns false when a
/// verification was rejected.
fn run(
    command: Command,
    output: OutputFormat,
    service: &DiceService,
    out: &mut impl Write,
) -> Result<bool> {
    match command {
        Command::Roll { expr, seed, mode } => {
            let mode = mode.mode();
            let dice = parse_dice(&expr)?;
            let result = service.roll_with_mode(mode, &expr, seed.map(Seed::from))?;
            info!("Rolled {} ({}) = {}", dice, mode, result.total);
            write_roll(out, output, &dice, &result)?;
            Ok(true)
        }
        Command::Verify {
            expr,
            seed,
            breakdown,
            total,
            mode,
        } => {
            let mode = mode.mode();
            let seed = Seed::from(seed);
            let outcome = match total {
                Some(total) => service.verify_result(
                    mode,
                    &expr,
                    &RollResult {
                        total,
                        breakdown,
                        seed,
                    },
                ),
                None => service.verify_with_mode(mode, &expr, &seed, &breakdown),
            };
            write_outcome(out, output, &outcome)?;
            Ok(outcome.valid)
        }
        Command::Seed => {
            write_seed(out, output, &service.generate_seed())?;
            Ok(true)
        }
        Command::Derive { parent, label } => {
            let derived = service.derive_seed(&Seed::from(parent), &label);
            write_seed(out, output, &derived)?;
            Ok(true)
        }
    }
}

fn write_roll(
    out: &mut impl Write,
    output: OutputFormat,
    dice: &DiceRoll,
    result: &RollResult,
) -> Result<()> {
    match output {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(result)?)?,
        OutputFormat::Text => {
            let faces: Vec<String> = result.breakdown.iter().map(u32::to_string).collect();
            writeln!(out, "total: {}", result.total)?;
            writeln!(out, "breakdown: {}", faces.join(", "))?;
            writeln!(out, "seed: {}", result.seed)?;
            writeln!(
                out,
                "range: {}-{} (average {})",
                dice.min(),
                dice.max(),
                dice.average()
            )?;
        }
    }
    Ok(())
}

fn write_outcome(
    out: &mut impl Write,
    output: OutputFormat,
    outcome: &VerificationOutcome,
) -> Result<()> {
    match output {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(outcome)?)?,
        OutputFormat::Text => match &outcome.reason {
            None => writeln!(out, "valid")?,
            Some(reason) => writeln!(out, "invalid: {}", reason)?,
        },
    }
    Ok(())
}

fn write_seed(out: &mut impl Write, output: OutputFormat, seed: &Seed) -> Result<()> {
    match output {
        OutputFormat::Json => writeln!(out, "{}", serde_json::json!({ "seed": seed }))?,
        OutputFormat::Text => writeln!(out, "{}", seed)?,
    }
    Ok(())
}
