//! il: iterated learning of composition rules
//!
//! Runs generational simulations and the smaller experiments around them:
//! inspecting the grammar a program implies, learning from a fixed speaker,
//! estimating a program's communicative accuracy, and searching quantifier
//! words that trade simplicity against accuracy.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use iterated_learning::{SeedStrategy, Simulation, SimulationConfig, TradeoffAnalysis};
use semantics::TypeTag;
use speech_agent::{Agent, HypothesisSpace, ProgramSpace};

#[derive(Parser)]
#[command(name = "il")]
#[command(about = "Iterated learning of compositional semantics")]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "IL_CONFIG")]
    config: Option<PathBuf>,

    /// Generations, counting generation 0
    #[arg(long)]
    generations: Option<usize>,

    /// Agents per generation
    #[arg(long)]
    agents: Option<usize>,

    /// Data points per agent
    #[arg(long)]
    observations: Option<usize>,

    /// Entities per context
    #[arg(long)]
    context_size: Option<usize>,

    /// Reliability stamped on produced data
    #[arg(long)]
    reliability: Option<f64>,

    /// Seed for the run RNG
    #[arg(long, env = "IL_SEED")]
    seed: Option<u64>,

    /// Root directory for run artifacts
    #[arg(long, env = "IL_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Extra path component under the run directory
    #[arg(long)]
    suffix: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full iterated-learning simulation
    Run {
        /// Generation 0 strategy
        #[arg(long, value_enum)]
        strategy: Option<SeedStrategy>,

        /// Program for the `program` strategy
        #[arg(long)]
        program: Option<String>,

        /// Skip writing run artifacts
        #[arg(long)]
        no_output: bool,
    },
    /// Print the grammar a program implies and sample sentences
    Grammar {
        #[arg(default_value = "( apply L R )")]
        program: String,

        /// Sentences to show
        #[arg(long, default_value_t = 10)]
        show: usize,
    },
    /// Learn from a speaker program's data
    Learn {
        #[arg(default_value = "( apply L R )")]
        program: String,
    },
    /// Estimate a program's communicative accuracy by enumeration
    Estimate {
        #[arg(default_value = "( apply L R )")]
        program: String,

        /// Independent estimates
        #[arg(long, default_value_t = 10)]
        repetitions: usize,
    },
    /// Search quantifier words trading simplicity against accuracy
    Tradeoff {
        /// Weight of communicative accuracy against the prior
        #[arg(long)]
        weight: Option<f64>,

        /// Hypotheses to keep
        #[arg(long)]
        top: Option<usize>,

        /// Skip writing run artifacts
        #[arg(long)]
        no_output: bool,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            SimulationConfig::from_yaml(&content)?
        }
        None => {
            info!("No config file given, using defaults");
            SimulationConfig::default()
        }
    };

    // Apply CLI overrides
    let population = &mut config.population;
    if let Some(generations) = cli.generations {
        population.generations = generations;
    }
    if let Some(agents) = cli.agents {
        population.agents = agents;
    }
    if let Some(observations) = cli.observations {
        population.observations = observations;
    }
    if let Some(context_size) = cli.context_size {
        population.context_size = context_size;
    }
    if let Some(reliability) = cli.reliability {
        population.reliability = reliability;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }
    if let Some(suffix) = &cli.suffix {
        config.output.suffix = suffix.clone();
    }
    Ok(config)
}

fn rng_for(config: &SimulationConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("iterated_learning=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Run {
            strategy,
            program,
            no_output,
        } => {
            if let Some(strategy) = strategy {
                config.population.seed_strategy = strategy;
            }
            if let Some(program) = program {
                config.population.seed_program = program;
            }
            if no_output {
                config.output.enabled = false;
            }

            let summary = Simulation::new(config)?.run().await?;
            println!("Run {}", summary.run_id);
            for (generation, fitness) in summary.fitness().iter().enumerate() {
                let shown: Vec<String> = fitness.iter().map(|f| format!("{:.3}", f)).collect();
                println!("generation {}: {}", generation, shown.join(" "));
            }
        }
        Command::Grammar { program, show } => {
            let simulation = Simulation::new(config)?;
            let space = simulation.space();
            let agent = Agent::new(simulation.config().speaker.clone())
                .with_hypothesis(space.hypothesis(&program)?);
            let search = agent.search()?;

            println!("Program: {}", program);
            println!("\nGrammar:\n{}", search.grammar());
            println!("Terminals:\n{}", search.terminals());

            let mut rng = rng_for(simulation.config());
            let population = &simulation.config().population;
            let context = population.contexts.generate(population.context_size, &mut rng)?;
            println!("Context: {}", context);
            match agent.produce(&context, &mut rng)? {
                Some(production) => {
                    let mut ranked: Vec<_> = production.iter().collect();
                    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
                    for (candidate, weight) in ranked.into_iter().take(show) {
                        println!("{:>10.6}  {}", weight, candidate.utterance());
                    }
                }
                None => println!("No truthful sentence found"),
            }

            if let Some(tree) = search.generate_tree(TypeTag::SENTENCE, 3, 0.6, &mut rng) {
                println!("\nSample tree:\n{}", tree.pretty());
            }
        }
        Command::Learn { program } => {
            let simulation = Simulation::new(config)?;
            let space: &ProgramSpace = simulation.space();
            let config = simulation.config();
            let population = &config.population;
            let mut rng = rng_for(config);

            let speaker = Agent::new(config.speaker.clone()).with_hypothesis(space.hypothesis(&program)?);
            let contexts =
                population
                    .contexts
                    .generate_many(population.context_size, population.observations, &mut rng)?;
            let data = speaker.produce_data(&contexts, population.reliability, &mut rng)?;
            for datum in data.iter().take(10) {
                println!("{}  {}", datum.context, datum.utterance);
            }

            let mut learner = Agent::new(config.speaker.clone());
            learner.learn(space, &data, &mut rng)?;
            if let Some(posterior) = learner.posterior() {
                println!("\nPosterior:");
                for (hypothesis, score) in posterior.iter() {
                    println!("{:>12.4}  prior {:>10.4}  {}", score, space.prior(hypothesis), hypothesis);
                }
            }
            let picked = learner.pick_hypothesis(&mut rng)?.to_string();
            println!("\nPicked: {}", picked);
            println!("Communicative accuracy: {:.4}", learner.communicative_accuracy(&data)?);
        }
        Command::Estimate {
            program,
            repetitions,
        } => {
            let simulation = Simulation::new(config)?;
            let config = simulation.config();
            let population = &config.population;
            let mut rng = rng_for(config);
            let agent = Agent::new(config.speaker.clone())
                .with_hypothesis(simulation.space().hypothesis(&program)?);

            let mut estimates = Vec::with_capacity(repetitions);
            for repetition in 0..repetitions {
                let contexts = population.contexts.generate_many(
                    population.context_size,
                    population.observations,
                    &mut rng,
                )?;
                let data =
                    agent.produce_data_from_enumeration(&contexts, population.reliability, &mut rng)?;
                let accuracy = agent.communicative_accuracy(&data)?;
                info!(repetition, accuracy, "Estimated communicative accuracy");
                estimates.push(accuracy);
            }
            let mean = estimates.iter().sum::<f64>() / estimates.len().max(1) as f64;
            println!("{}: mean communicative accuracy {:.4} over {} runs", program, mean, estimates.len());
        }
        Command::Tradeoff {
            weight,
            top,
            no_output,
        } => {
            if let Some(weight) = weight {
                config.tradeoff.likelihood_weight = weight;
            }
            if let Some(top) = top {
                config.learner.top_n = top;
            }
            if no_output {
                config.output.enabled = false;
            }

            let summary = TradeoffAnalysis::new(config)?.run().await?;
            println!("Tradeoff {} (weight {})", summary.run_id, summary.likelihood_weight);
            for ranked in &summary.hypotheses {
                println!(
                    "{:>12.4}  prior {:>10.4}  accuracy {:>8.4}  {}",
                    ranked.log_posterior, ranked.log_prior, ranked.communicative_accuracy, ranked.hypothesis
                );
            }
        }
    }

    Ok(())
}
