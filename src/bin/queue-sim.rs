use queue_sim::cli::{self, Command};
use queue_sim::config;
use queue_sim::engine;
use queue_sim::error::Result;
use queue_sim::output::{self, formatter_for};
use queue_sim::replication;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = match cli::parse_args() {
        Ok(cli) => cli,
        Err(err) => exit_with(err),
    };
    init_tracing(cli.verbose);

    if let Err(err) = run(cli.command) {
        exit_with(err);
    }
}

fn exit_with(err: queue_sim::error::Error) -> ! {
    eprintln!("Error: {}", err);
    std::process::exit(1);
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("queue_sim={}", default_level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Run(args) => {
            let (config, options) = config::build_run(&args)?;
            let report = engine::run_simulation(&config, &options);
            print!("{}", formatter_for(args.format).run(&report)?);
        }
        Command::Replicate(args) => {
            let (config, options) = config::build_replications(&args)?;
            let report = replication::run_replications(&config, &options);
            print!("{}", formatter_for(args.format).replications(&report)?);
        }
        Command::ListPolicies => print!("{}", output::list_policies()),
        Command::ShowConfig(args) => {
            let scenario = config::build_scenario(&args)?;
            print!(
                "{}",
                output::describe_config(
                    &scenario.simulation.normalized(),
                    &scenario.run,
                    &scenario.replications.normalized(),
                )
            );
        }
    }
    Ok(())
}
