use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

use fuzzchain_consensus::{Defuzzifier, FuzzyTrustEngine};
use fuzzchain_core::{Block, Blockchain, MiningEngine, DEFAULT_MAX_ATTEMPTS};
use fuzzchain_crypto::HashAlgorithm;
use fuzzchain_p2p::{RuntimeKind, SimulationConfig};

#[derive(Parser)]
#[command(name = "fuzzchain")]
#[command(about = "Fuzzy-trust Byzantine ledger simulator", long_about = None, version)]
struct Cli {
    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a network simulation (default)
    Run(RunArgs),

    /// Print the fuzzy rule base
    Rules,

    /// Evaluate the trust engine on one input triple
    Evaluate {
        reputation: f64,
        validity: f64,
        consensus: f64,
        /// Use mean-of-maximum instead of centroid defuzzification
        #[arg(long)]
        mean_of_maximum: bool,
    },

    /// Mine a single block and print its wire form
    Mine {
        payload: String,
        #[arg(long, default_value_t = 4)]
        difficulty: usize,
        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        max_attempts: u64,
        /// Hash with SHA3-256 instead of SHA-256
        #[arg(long)]
        sha3: bool,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },

    /// Print the default simulation config as YAML
    DefaultConfig,
}

#[derive(Args, Default)]
struct RunArgs {
    /// YAML simulation config; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    nodes: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated run length in milliseconds
    #[arg(long)]
    duration_ms: Option<u64>,
    /// event_loop or actors
    #[arg(long)]
    runtime: Option<RuntimeKind>,
    #[arg(long)]
    difficulty: Option<usize>,
    /// Wall-clock seconds per simulated second in the actor runtime
    #[arg(long)]
    time_scale: Option<f64>,
    /// Skip the closing chain sync
    #[arg(long)]
    no_sync: bool,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn load_config(args: &RunArgs) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    if let Some(nodes) = args.nodes {
        config.node_count = nodes;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(duration_ms) = args.duration_ms {
        config.duration_ms = duration_ms;
    }
    if let Some(runtime) = args.runtime {
        config.runtime = runtime;
    }
    if let Some(difficulty) = args.difficulty {
        config.node.difficulty = difficulty;
    }
    if let Some(time_scale) = args.time_scale {
        config.time_scale = time_scale;
    }
    if args.no_sync {
        config.sync_on_finish = false;
    }

    config.validate().context("invalid simulation config")?;
    Ok(config)
}

async fn run_simulation(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    info!(
        "Running {} nodes for {} ms on the {} runtime",
        config.node_count, config.duration_ms, config.runtime
    );

    let report = fuzzchain_p2p::run(config).await?;
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

fn print_rules() {
    let engine = FuzzyTrustEngine::new();
    for (i, rule) in engine.rules().iter().enumerate() {
        println!("{:>2}. {}", i + 1, rule);
    }
}

fn evaluate(reputation: f64, validity: f64, consensus: f64, mean_of_maximum: bool) {
    let defuzzifier = if mean_of_maximum {
        Defuzzifier::MeanOfMaximum
    } else {
        Defuzzifier::Centroid
    };
    let engine = FuzzyTrustEngine::new().with_defuzzifier(defuzzifier);
    let eval = engine.evaluate_detailed(reputation, validity, consensus);

    println!("reputation {:?}", eval.reputation);
    println!("validity   {:?}", eval.validity);
    println!("consensus  {:?}", eval.consensus);
    for (rule, strength) in engine.rules().iter().zip(&eval.rule_strengths) {
        if *strength > 0.0 {
            println!("  {:.3}  {}", strength, rule);
        }
    }
    println!("aggregated {:?}", eval.aggregated);
    println!("trust {:.4} ({})", eval.trust, engine.classify(eval.trust));
}

fn mine(payload: &str, difficulty: usize, max_attempts: u64, sha3: bool, seed: u64) -> Result<()> {
    let algorithm = if sha3 {
        HashAlgorithm::Sha3_256
    } else {
        HashAlgorithm::Sha256
    };
    let chain = Blockchain::with_params(difficulty, algorithm);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut block = Block::create(
        chain.next_index(),
        payload,
        chain.latest_block().identifier(),
        &mut rng,
    );

    let result = MiningEngine::new(difficulty, max_attempts)
        .with_algorithm(algorithm)
        .mine(&mut block);
    if !result.success {
        bail!(
            "no nonce met difficulty {} within {} attempts",
            difficulty,
            result.attempts
        );
    }

    println!("nonce      {}", result.nonce);
    println!("digest     {}", result.digest);
    println!("attempts   {} in {} ms ({:.0} H/s)", result.attempts, result.elapsed_ms, result.hash_rate);
    println!("identifier {}", block.identifier());
    println!("{}", block.serialize());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level.as_str())).init();

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run_simulation(args).await?,
        Commands::Rules => print_rules(),
        Commands::Evaluate {
            reputation,
            validity,
            consensus,
            mean_of_maximum,
        } => evaluate(reputation, validity, consensus, mean_of_maximum),
        Commands::Mine {
            payload,
            difficulty,
            max_attempts,
            sha3,
            seed,
        } => mine(&payload, difficulty, max_attempts, sha3, seed)?,
        Commands::DefaultConfig => print!("{}", SimulationConfig::default().to_yaml()?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "fuzzchain", "run", "--nodes", "8", "--seed", "3", "--runtime", "actors", "--no-sync",
        ]);
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.node_count, 8);
        assert_eq!(config.seed, 3);
        assert_eq!(config.runtime, RuntimeKind::Actors);
        assert!(!config.sync_on_finish);
        assert_eq!(config.byzantine_count(), 5);
    }

    #[test]
    fn test_bad_override_is_reported() {
        let args = RunArgs {
            nodes: Some(1),
            ..RunArgs::default()
        };
        assert!(load_config(&args).is_err());
    }
}
