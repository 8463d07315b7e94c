use automata::MealyMachine;
use automata_core::alphabet::{CharAlphabet, SimpleAlphabet};
use automata_core::word::show;
use automata_learning::active::{LStar, LearnerOptions, SimulationOracle, Ttt};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Runs L* or TTT against one of the scenario SULs from the test suite and
/// reports the size of the learned hypothesis.
#[derive(Parser)]
#[command(name = "learn-demo", version, about)]
struct Cli {
    #[command(subcommand)]
    scenario: Option<Scenario>,

    /// Logs the observation table (L*) or discrimination tree (TTT) before
    /// every refinement step.
    #[arg(long, global = true)]
    print_table: bool,
}

#[derive(Subcommand)]
enum Scenario {
    /// Learns the three-state door (open/close/push) SUL.
    Door {
        #[arg(value_enum, default_value_t = Algorithm::Both)]
        algorithm: Algorithm,
    },
    /// Learns the mod-3 counter SUL.
    Mod3 {
        #[arg(value_enum, default_value_t = Algorithm::Both)]
        algorithm: Algorithm,
    },
    /// Learns a two-state toggle over a `CharAlphabet`.
    Toggle {
        #[arg(value_enum, default_value_t = Algorithm::Both)]
        algorithm: Algorithm,
    },
}

#[derive(Copy, Clone, ValueEnum)]
enum Algorithm {
    Lstar,
    Ttt,
    Both,
}

fn door() -> MealyMachine<&'static str, &'static str> {
    MealyMachine::builder(SimpleAlphabet::new(["open", "close", "push"]))
        .with_transitions([
            (0, "open", 1, "opened"),
            (0, "close", 0, "already_closed"),
            (0, "push", 0, "cant_push"),
            (1, "open", 1, "already_open"),
            (1, "close", 0, "closed"),
            (1, "push", 2, "broke"),
            (2, "open", 2, "broken"),
            (2, "close", 2, "broken"),
            (2, "push", 2, "broken"),
        ])
        .build(0)
        .unwrap()
}

fn mod3_counter() -> MealyMachine<&'static str, u8> {
    MealyMachine::builder(SimpleAlphabet::new(["inc"]))
        .with_transitions([(0, "inc", 1, 1), (1, "inc", 2, 2), (2, "inc", 0, 0)])
        .build(0)
        .unwrap()
}

fn toggle() -> MealyMachine<char, u8> {
    MealyMachine::builder(CharAlphabet::of_size(1).into())
        .with_transitions([(0, 'a', 1, 1), (1, 'a', 0, 0)])
        .build(0)
        .unwrap()
}

fn run_lstar<S: automata_core::alphabet::Symbol + std::fmt::Display, O: automata_core::Output>(
    sul: MealyMachine<S, O>,
    print_table: bool,
    label: &str,
    sample: &[S],
) {
    info!("learning {label} with L*");
    let mut learner = LStar::new(SimulationOracle::new(sul));
    let mut options = LearnerOptions::new().with_print_observation_table(print_table);
    let hypothesis = learner.run(&mut options).expect("learning must converge");
    info!(states = hypothesis.size(), "L* converged on {label}");
    let output = hypothesis.transform(&sample.to_vec()).expect("sample drawn from the learned alphabet");
    info!(word = %show(sample), ?output, "sample run through the L* hypothesis for {label}");
}

fn run_ttt<S: automata_core::alphabet::Symbol + std::fmt::Display, O: automata_core::Output>(
    sul: MealyMachine<S, O>,
    print_table: bool,
    label: &str,
    sample: &[S],
) {
    info!("learning {label} with TTT");
    let mut learner = Ttt::new(SimulationOracle::new(sul));
    let mut options = LearnerOptions::new().with_print_observation_table(print_table);
    let hypothesis = learner.run(&mut options).expect("learning must converge");
    info!(states = hypothesis.size(), "TTT converged on {label}");
    let output = hypothesis.transform(&sample.to_vec()).expect("sample drawn from the learned alphabet");
    info!(word = %show(sample), ?output, "sample run through the TTT hypothesis for {label}");
}

fn run_door(algorithm: Algorithm, print_table: bool) {
    let sample = ["open", "push", "close"];
    match algorithm {
        Algorithm::Lstar => run_lstar(door(), print_table, "the door", &sample),
        Algorithm::Ttt => run_ttt(door(), print_table, "the door", &sample),
        Algorithm::Both => {
            run_lstar(door(), print_table, "the door", &sample);
            run_ttt(door(), print_table, "the door", &sample);
        }
    }
}

fn run_mod3(algorithm: Algorithm, print_table: bool) {
    let sample = ["inc", "inc", "inc", "inc"];
    match algorithm {
        Algorithm::Lstar => run_lstar(mod3_counter(), print_table, "the mod-3 counter", &sample),
        Algorithm::Ttt => run_ttt(mod3_counter(), print_table, "the mod-3 counter", &sample),
        Algorithm::Both => {
            run_lstar(mod3_counter(), print_table, "the mod-3 counter", &sample);
            run_ttt(mod3_counter(), print_table, "the mod-3 counter", &sample);
        }
    }
}

fn run_toggle(algorithm: Algorithm, print_table: bool) {
    let sample = ['a', 'a', 'a'];
    match algorithm {
        Algorithm::Lstar => run_lstar(toggle(), print_table, "the toggle", &sample),
        Algorithm::Ttt => run_ttt(toggle(), print_table, "the toggle", &sample),
        Algorithm::Both => {
            run_lstar(toggle(), print_table, "the toggle", &sample);
            run_ttt(toggle(), print_table, "the toggle", &sample);
        }
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stdout)
                .with_filter(tracing_subscriber::filter::LevelFilter::INFO),
        )
        .init();

    let cli = Cli::parse();
    match cli.scenario {
        Some(Scenario::Door { algorithm }) => run_door(algorithm, cli.print_table),
        Some(Scenario::Mod3 { algorithm }) => run_mod3(algorithm, cli.print_table),
        Some(Scenario::Toggle { algorithm }) => run_toggle(algorithm, cli.print_table),
        None => {
            run_door(Algorithm::Both, cli.print_table);
            run_mod3(Algorithm::Both, cli.print_table);
            run_toggle(Algorithm::Both, cli.print_table);
        }
    }
}
