use std::path::PathBuf;

use clap::Parser;
use tnorder::contractionpath::{
    contraction_cost::{MemoryAccounting, MemoryPolicy},
    paths::{SearchConfig, SearchMethod},
};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON network description.
    pub input: PathBuf,
    #[arg(short, long, value_enum, default_value_t = SearchMethod::Bfs)]
    pub method: SearchMethod,
    /// Memory estimate of a single contraction.
    #[arg(long, value_enum)]
    pub memory: Option<MemoryPolicy>,
    /// How memory snapshots are summarized.
    #[arg(long, value_enum)]
    pub accounting: Option<MemoryAccounting>,
    /// Keep every distinct result instead of pruning dominated ones.
    #[arg(long)]
    pub no_compare: bool,
    /// Replay the sequence given in the input instead of searching.
    #[arg(long)]
    pub replay: bool,
    /// Print numpy code for the best result.
    #[arg(long)]
    pub emit: bool,
    /// Also write JSON logs to `<LOG_FILE>.log.json`.
    #[arg(long)]
    pub log_file: Option<String>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Applies the command line settings on top of the ones from the input.
    pub fn config(&self, base: Option<SearchConfig>) -> SearchConfig {
        let mut config = base.unwrap_or_default();
        if let Some(memory) = self.memory {
            config.cost_model.memory = memory;
        }
        if let Some(accounting) = self.accounting {
            config.cost_model.accounting = accounting;
        }
        if self.no_compare {
            config.compare = false;
        }
        config
    }
}
