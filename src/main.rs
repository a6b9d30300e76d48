use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use flexi_logger::{json_format, Duplicate, FileSpec, FlexiLoggerError, Logger, LoggerHandle};
use itertools::Itertools;
use log::info;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tnorder::{
    codegen::emit_numpy,
    contractionpath::{
        paths::{pareto::ParetoSearch, subset_dp::SubsetDp, FindPath, SearchConfig, SearchMethod},
        replay::replay,
        LegPath,
    },
    error::OrderError,
    io::{load_network, IoError},
    tensornetwork::{
        network::Network,
        tensor::{Leg, Tensor},
        validation::normalize_legs,
    },
};

mod cli;

#[derive(Error, Debug)]
enum RunError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error("the input has no sequence to replay")]
    MissingSequence,
    #[error("cannot set up logging")]
    Logging(#[from] FlexiLoggerError),
}

/// Logs to stderr, and additionally as JSON to a file if one is given.
fn setup_logging(cli: &Cli) -> Result<LoggerHandle, FlexiLoggerError> {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let logger = Logger::try_with_env_or_str(level)?;
    match &cli.log_file {
        Some(basename) => logger
            .format_for_files(json_format)
            .log_to_file(
                FileSpec::default()
                    .basename(basename)
                    .suppress_timestamp()
                    .suffix("log.json"),
            )
            .duplicate_to_stderr(Duplicate::Warn)
            .start(),
        None => logger.start(),
    }
}

/// Runs the subset search on a copy with internal legs renumbered to
/// `0..n` and replays the found sequence on the original labels.
fn search_dp(tensors: &[Tensor], config: SearchConfig) -> Result<Vec<Network>, OrderError> {
    let (normalized, mapping) = normalize_legs(tensors);
    let original: FxHashMap<Leg, Leg> = mapping.into_iter().map(|(old, new)| (new, old)).collect();

    let mut opt = SubsetDp::new(&normalized, config.cost_model);
    opt.find_path()?;
    info!(explored = opt.explored(); "Subset search done");
    let Some(history) = opt.get_best_path() else {
        return Ok(Vec::new());
    };
    let history: LegPath = history
        .iter()
        .map(|legs| {
            legs.iter()
                .map(|leg| original.get(leg).copied().unwrap_or(*leg))
                .collect()
        })
        .collect();
    Ok(vec![replay(tensors, &history, config.cost_model)?])
}

fn search_bfs(tensors: &[Tensor], config: SearchConfig) -> Result<Vec<Network>, OrderError> {
    let mut opt = ParetoSearch::new(tensors, config);
    opt.find_path()?;
    info!(rounds = opt.rounds(), compare = opt.compare_enabled(); "Pareto search done");
    Ok(opt.get_best_networks().to_vec())
}

fn report(network: &Network) {
    let name = network.result().map_or("-", Tensor::name);
    let mem = network
        .mem()
        .map_or_else(|| "-".to_string(), |mem| mem.to_string());
    println!("{name}");
    println!("  cpu: {}", network.cpu());
    println!("  mem: {mem}");
    println!(
        "  legs: {}",
        network
            .history()
            .iter()
            .map(|legs| format!("[{}]", legs.iter().join(", ")))
            .join(" ")
    );
    println!("  path: {:?}", network.replace_path());
}

fn run(cli: &Cli) -> Result<(), RunError> {
    let description = load_network(&cli.input)?;
    let config = cli.config(description.config);
    let tensors = &description.tensors;
    info!(tensors = tensors.len(), method:? = cli.method, replay = cli.replay; "Network loaded");

    let networks = if cli.replay {
        let history = description.sequence.as_ref().ok_or(RunError::MissingSequence)?;
        vec![replay(tensors, history, config.cost_model)?]
    } else {
        match cli.method {
            SearchMethod::Dp => search_dp(tensors, config)?,
            SearchMethod::Bfs => search_bfs(tensors, config)?,
        }
    };

    for network in &networks {
        report(network);
    }
    if cli.emit {
        if let Some(best) = networks.first() {
            println!();
            print!("{}", emit_numpy(tensors, best.history(), config.cost_model)?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _logger = match setup_logging(&cli) {
        Ok(logger) => logger,
        Err(err) => {
            eprintln!("error: {}", RunError::from(err));
            return ExitCode::FAILURE;
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
