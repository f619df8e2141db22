//! hookstate: declare Stripe webhook endpoints in YAML and reconcile them.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use hookstate::logging::{self, LogFormat};
use hookstate::{load_config_or_env, load_manifests, resource, Client, Resource, Result, StateFile};

#[derive(Parser, Debug)]
#[command(name = "hookstate", version, about = "Declarative Stripe webhook endpoints")]
struct Args {
    /// Manifest file or directory of manifests
    #[arg(long, global = true, env = "HOOKSTATE_MANIFEST", default_value = "hookstate.yaml")]
    manifest: PathBuf,

    /// State file
    #[arg(long, global = true, env = "HOOKSTATE_STATE", default_value = "hookstate.state.json")]
    state: PathBuf,

    /// Provider config (JSON). Defaults to the user config dir, then the environment
    #[arg(long, global = true, env = "HOOKSTATE_PROVIDER_CONFIG")]
    provider_config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resource schemas as JSON
    Schema,
    /// Show what apply would change
    Plan,
    /// Create, update and delete resources to match the manifests
    Apply,
    /// Re-read every resource in state from the API
    Refresh,
    /// Delete every resource in state
    Destroy,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = logging::init_logging(args.log_format) {
        eprintln!("Warning: {}", e);
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Schema => {
            let schemas: Vec<_> = resource::all().iter().map(|r| r.schema()).collect();
            println!("{}", serde_json::to_string_pretty(&schemas)?);
        }
        Command::Plan => {
            let manifests = load_manifests(&args.manifest)?;
            let state = StateFile::load(&args.state)?;
            let plan = hookstate::plan(&manifests, &state)?;
            println!("{}", plan);
        }
        Command::Apply => {
            let manifests = load_manifests(&args.manifest)?;
            let mut state = StateFile::load(&args.state)?;
            let plan = hookstate::plan(&manifests, &state)?;
            if !plan.has_changes() {
                println!("No changes.");
                return Ok(());
            }
            println!("{}", plan);

            let client = client(args.provider_config.as_deref())?;
            let summary = hookstate::apply(&client, &plan, &mut state, &args.state)?;
            println!("{}", summary);
        }
        Command::Refresh => {
            let mut state = StateFile::load(&args.state)?;
            let client = client(args.provider_config.as_deref())?;
            let count = hookstate::refresh(&client, &mut state, &args.state)?;
            println!("Refreshed {} resource(s).", count);
        }
        Command::Destroy => {
            let mut state = StateFile::load(&args.state)?;
            let client = client(args.provider_config.as_deref())?;
            let summary = hookstate::destroy(&client, &mut state, &args.state)?;
            println!("{}", summary);
        }
    }

    Ok(())
}

fn client(provider_config: Option<&Path>) -> Result<Client> {
    let config = load_config_or_env(provider_config)?;
    Ok(Client::new(&config)?)
}
