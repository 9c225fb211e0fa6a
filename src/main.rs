use anyhow::{anyhow, Result};
use clap::Parser;
use std::process::ExitCode;

mod bench;
mod cli;
mod config;
mod fixture;
mod judge;
mod model;
mod paths;
mod process;
mod prompt;
mod report;
mod runner;
mod scenarios;
mod scoring;
mod stats;

use cli::{BenchArgs, Command, FixturesArgs, RootArgs, RunArgs, ScoreArgs};
use config::HarnessConfig;
use fixture::{Condition, FixtureStore};
use paths::HarnessPaths;
use scenarios::evidence::{EvidenceSource, NoEvidence, ProjectEvidence};

fn main() -> ExitCode {
    init_tracing();
    let args = RootArgs::parse();
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("intent_eval=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: RootArgs) -> Result<ExitCode> {
    let paths = HarnessPaths::new(args.root);
    tracing::debug!(root = %paths.root().display(), "harness root");
    let config = config::resolve_config(args.config.as_deref(), &paths)?;
    match args.command {
        Command::Fixtures(cmd) => cmd_fixtures(&paths, &config, cmd),
        Command::Run(cmd) => cmd_run(&paths, &config, cmd),
        Command::Score(cmd) => cmd_score(&paths, &config, cmd),
        Command::Bench(cmd) => cmd_bench(&paths, &config, cmd),
        Command::List(_) => cmd_list(&paths),
    }
}

fn cmd_fixtures(
    paths: &HarnessPaths,
    config: &HarnessConfig,
    args: FixturesArgs,
) -> Result<ExitCode> {
    let selected = scenarios::select(&args.experiment)?;
    let project_evidence = match &args.project {
        Some(dir) => {
            if !dir.is_dir() {
                return Err(anyhow!("project directory {} not found", dir.display()));
            }
            let tool_bin = args.tool_bin.unwrap_or_else(|| config.tool_bin.clone());
            Some(ProjectEvidence::new(dir.clone(), tool_bin, config.tool_timeout()))
        }
        None => None,
    };
    if project_evidence.is_none() {
        let needs_project: Vec<&str> = selected
            .iter()
            .filter(|s| s.uses_project())
            .map(|s| s.id())
            .collect();
        if !needs_project.is_empty() {
            return Err(anyhow!(
                "experiment(s) {} read a project checkout; pass --project DIR",
                needs_project.join(", ")
            ));
        }
    }

    let store = FixtureStore::new(paths.clone());
    for scenario in selected {
        let source: &dyn EvidenceSource = match &project_evidence {
            Some(evidence) if scenario.uses_project() => evidence,
            _ => &NoEvidence,
        };
        for path in scenarios::generate_fixtures(scenario, source, &store)? {
            println!("{}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_run(paths: &HarnessPaths, config: &HarnessConfig, args: RunArgs) -> Result<ExitCode> {
    let selected = scenarios::select(&args.experiment)?;
    let model = args.model.unwrap_or_else(|| config.model.clone());
    let settings = runner::RunSettings {
        model: &model,
        runs: args.runs.unwrap_or(config.runs),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    };
    let backend = model::backend_from_config(config)?;
    let store = FixtureStore::new(paths.clone());
    let stamp = runner::file_stamp();

    let mut all = Vec::with_capacity(selected.len());
    for scenario in selected {
        eprintln!(
            "experiment {}: {} (model {model}, {} run(s) per condition)",
            scenario.id(),
            scenario.name(),
            settings.runs
        );
        let results = runner::run_experiment(scenario, &store, backend.as_ref(), settings)?;
        let path = runner::write_results(paths, &results, &stamp)?;
        println!("{}", path.display());
        all.push(results);
    }
    let combined = runner::write_combined(paths, &model, &all, &stamp)?;
    println!("{}", combined.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_score(paths: &HarnessPaths, config: &HarnessConfig, args: ScoreArgs) -> Result<ExitCode> {
    let output = args.output.unwrap_or_else(|| paths.scores_path());
    let judge_model = args.judge_model.unwrap_or_else(|| config.judge_model.clone());
    let backend = if args.no_judge {
        None
    } else {
        Some(model::backend_from_config(config)?)
    };
    let judge = backend.as_deref().map(|backend| report::Judge {
        backend,
        settings: judge::JudgeSettings {
            model: &judge_model,
            max_tokens: config.judge_max_tokens,
        },
    });

    let lines = match (args.responses, args.experiment, args.response_text) {
        (Some(file), _, _) => {
            let document = runner::load_results(&file)?;
            let scores = report::score_results(&document, judge)?;
            report::write_scores(&output, &scores)?;
            report::results_summary(&scores)
        }
        (None, Some(id), Some(text)) => {
            let scenario = scenarios::find(&id.trim().to_ascii_lowercase())
                .ok_or_else(|| anyhow!("unknown experiment {id:?}"))?;
            let score = report::score_response(scenario, &text, judge)?;
            report::write_scores(&output, &score)?;
            report::response_summary(&score)
        }
        _ => {
            return Err(anyhow!(
                "provide either --responses FILE or --experiment ID with --response-text TEXT"
            ))
        }
    };
    println!("results saved to {}", output.display());
    for line in lines {
        println!("{line}");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_bench(paths: &HarnessPaths, config: &HarnessConfig, args: BenchArgs) -> Result<ExitCode> {
    let tool_bin = bench::resolve_tool(args.tool_bin.as_deref().unwrap_or(&config.tool_bin));
    eprintln!(
        "benchmarking {tool_bin}: {} run(s) per query, areas {}",
        config.bench.num_runs,
        config.bench.query_areas.join(", ")
    );
    let report = bench::run_bench(paths, &config.bench, &tool_bin, config.tool_timeout());
    let path = bench::write_report(paths, &report)?;
    println!("results saved to {}", path.display());
    for (intent_count, point) in &report.scale_points {
        if let Some(verdict) = &point.pass_criteria {
            let status = if verdict.pass { "PASS" } else { "FAIL" };
            let p95 = verdict
                .p95_ms
                .map(|p95| format!("{p95:.1}ms"))
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "{intent_count} intents: {status} (p95={p95}, threshold={}ms)",
                verdict.threshold_ms
            );
        }
    }
    if report.any_failed() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_list(paths: &HarnessPaths) -> Result<ExitCode> {
    let store = FixtureStore::new(paths.clone());
    for scenario in scenarios::all() {
        let lexical = scenarios::lexical_scorer(*scenario)?;
        let fixtures: Vec<String> = Condition::ALL
            .iter()
            .map(|&condition| {
                let mark = if store.exists(scenario.id(), condition) {
                    "yes"
                } else {
                    "no"
                };
                format!("{condition}={mark}")
            })
            .collect();
        println!(
            "{}  {:<34} judge={} lexical={}  {}",
            scenario.id(),
            scenario.name(),
            scenario.criteria().len(),
            lexical.criterion_names().len(),
            fixtures.join(" ")
        );
    }
    Ok(ExitCode::SUCCESS)
}
