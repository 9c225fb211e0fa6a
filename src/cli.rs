//! CLI argument parsing for the evaluation harness.
use crate::config::TOOL_BIN_ENV;
use crate::paths::DEFAULT_ROOT;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "intent-eval",
    version,
    about = "Comparative evaluation of LM answers with and without recorded intent context",
    after_help = "Commands:\n  fixtures --experiment <sel> --project <dir>  Capture context records\n  run --experiment <sel>                       Invoke the model per condition\n  score --responses <file>                     Score recorded responses\n  bench                                        Time query tool at scale points\n  list                                         Show registered experiments\n\nExamples:\n  intent-eval fixtures --experiment a,c --project ../taskboard\n  intent-eval run --experiment all --runs 3\n  intent-eval score --experiment c --response-text \"Reject: ...\" --no-judge\n  intent-eval bench --tool-bin ./target/release/telos",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Harness root holding measurements/ and scale/
    #[arg(long, value_name = "DIR", global = true, default_value = DEFAULT_ROOT)]
    pub root: PathBuf,

    /// Config file (defaults to <root>/harness.json, then the user config dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Fixtures(FixturesArgs),
    Run(RunArgs),
    Score(ScoreArgs),
    Bench(BenchArgs),
    List(ListArgs),
}

/// Fixture generation inputs.
#[derive(Parser, Debug)]
#[command(about = "Write the context record of each condition for the selected experiments")]
pub struct FixturesArgs {
    /// Experiment id, comma-separated ids, or `all`
    #[arg(long, short = 'e', value_name = "SEL")]
    pub experiment: String,

    /// Project checkout read by git-driven experiments
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Query tool binary
    #[arg(long, value_name = "PATH", env = TOOL_BIN_ENV)]
    pub tool_bin: Option<String>,
}

/// Model run inputs.
#[derive(Parser, Debug)]
#[command(about = "Run experiments against the configured model backend")]
pub struct RunArgs {
    /// Experiment id, comma-separated ids, or `all`
    #[arg(long, short = 'e', value_name = "SEL")]
    pub experiment: String,

    /// Model id (overrides config)
    #[arg(long, short = 'm', value_name = "MODEL")]
    pub model: Option<String>,

    /// Runs per condition (overrides config)
    #[arg(long, short = 'r', value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub runs: Option<u32>,
}

/// Scoring inputs: a results file, or one response for one experiment.
#[derive(Parser, Debug)]
#[command(about = "Score responses with the lexical and judge scorers")]
pub struct ScoreArgs {
    /// Results file written by `run` (single or combined)
    #[arg(long, value_name = "FILE", conflicts_with_all = ["experiment", "response_text"])]
    pub responses: Option<PathBuf>,

    /// Experiment id for single-response scoring
    #[arg(long, short = 'e', value_name = "ID", requires = "response_text")]
    pub experiment: Option<String>,

    /// Response text to score (with --experiment)
    #[arg(long, value_name = "TEXT", requires = "experiment")]
    pub response_text: Option<String>,

    /// Output path (defaults to <root>/measurements/scoring_v2_results.json)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Judge model id (overrides config)
    #[arg(long, value_name = "MODEL")]
    pub judge_model: Option<String>,

    /// Skip the judge scorer and report lexical scores only
    #[arg(long)]
    pub no_judge: bool,
}

/// Benchmark inputs.
#[derive(Parser, Debug)]
#[command(about = "Benchmark query tool latency over the scale points")]
pub struct BenchArgs {
    /// Query tool binary
    #[arg(long, value_name = "PATH", env = TOOL_BIN_ENV)]
    pub tool_bin: Option<String>,
}

#[derive(Parser, Debug)]
#[command(about = "List registered experiments and fixture status")]
pub struct ListArgs {}
