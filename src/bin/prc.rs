//! prc - Policy Reconcile CLI tool
//!
//! Runs reconciliations against a YAML state file standing in for a device.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use policy_reconcile::commit::commit_and_wait;
use policy_reconcile::value;
use policy_reconcile::{
    evaluate, Describer, Location, ManagedObject, MemoryStore, Placement, PositionManager, ReconcileOptions,
    ReconcileRequest, Reconciler, Schema, Scope, Verb,
};
use tracing_subscriber::EnvFilter;

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Policy Reconcile - bring firewall objects to a desired state
#[derive(Parser, Debug)]
#[command(name = "prc", version, about, long_about = None)]
struct Cli {
    /// Path to the schema file
    #[arg(short, long)]
    schema: PathBuf,

    /// Path to the YAML state file holding the device's objects
    #[arg(long)]
    state: Option<PathBuf>,

    /// Path to a YAML options file (checkMode, aliases, poll)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parent scope of the objects
    #[arg(long, default_value = "shared")]
    scope: String,

    /// Object type in the schema to use (defaults to the first type)
    #[arg(short = 't', long = "type")]
    object_type: Option<String>,

    /// Output location. Use '-' for stdout
    #[arg(short, long, default_value = "-")]
    output: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all types in the schema
    ListTypes,

    /// Apply a verb to one object
    ///
    /// Examples:
    ///   prc -s schema.yaml --state dev.yaml -t address reconcile present -d web.yaml
    ///   prc -s schema.yaml --state dev.yaml -t rule reconcile gathered -f "action == deny"
    Reconcile {
        /// present, absent, merged, replaced, deleted, gathered, enabled or disabled
        verb: Verb,

        /// Desired object as a YAML field map
        #[arg(short, long)]
        desired: Option<PathBuf>,

        /// Uid of the object, when no desired file is given
        #[arg(short, long)]
        uid: Option<String>,

        /// Filter expression for the gathered verb
        #[arg(short, long)]
        filter: Option<String>,

        /// top, bottom, before or after
        #[arg(long)]
        location: Option<Location>,

        /// Reference uid for before/after
        #[arg(long)]
        reference: Option<String>,

        /// Decide without changing anything
        #[arg(long)]
        check: bool,

        /// Save the resulting state back to the state file
        #[arg(long)]
        write_state: bool,

        /// Commit and wait for the job when something changed
        #[arg(long)]
        commit: bool,
    },

    /// Move one object among its siblings
    Position {
        uid: String,

        location: Location,

        reference: Option<String>,

        #[arg(long)]
        check: bool,

        #[arg(long)]
        write_state: bool,
    },

    /// Evaluate a filter expression against a YAML field map
    Filter { expression: String, file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Logs go to stderr; RUST_LOG overrides the default `warn` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> CliResult<()> {
    let schema_content = fs::read_to_string(&cli.schema)
        .map_err(|e| format!("Failed to read schema file {:?}: {}", cli.schema, e))?;
    let schema = Schema::from_yaml(&schema_content)?;

    let mut options = match &cli.config {
        Some(path) => ReconcileOptions::from_yaml(&read(path)?)?,
        None => ReconcileOptions::default(),
    };

    let mut output: Box<dyn Write> = if cli.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(fs::File::create(&cli.output)
            .map_err(|e| format!("Failed to create output file {:?}: {}", cli.output, e))?)
    };

    let object_type = cli
        .object_type
        .clone()
        .or_else(|| schema.type_names().first().map(|s| s.to_string()))
        .ok_or("No types found in schema")?;

    match cli.command {
        Command::ListTypes => {
            for name in schema.type_names() {
                writeln!(output, "{}", name)?;
            }
        }
        Command::Reconcile {
            verb,
            desired,
            uid,
            filter,
            location,
            reference,
            check,
            write_state,
            commit,
        } => {
            options.check_mode |= check;
            let state = cli.state.as_deref().ok_or("reconcile requires --state")?;
            let mut store = load_state(state)?;

            let object_schema = schema.object_type(&object_type)?;
            let mut request = ReconcileRequest::new(cli.scope.as_str(), object_type.as_str(), verb);
            if let Some(path) = &desired {
                let map = value::from_yaml(&read(path)?)
                    .map_err(|e| format!("Failed to parse desired object {:?}: {}", path, e))?;
                request = request.desired(Describer::new(object_schema, &options.aliases)?.to_object(&map)?);
            } else if let Some(uid) = uid {
                request = request.desired(ManagedObject::new(uid));
            }
            if let Some(filter) = filter {
                request = request.filter(filter);
            }
            if location.is_some() || reference.is_some() {
                request = request.placement(Placement {
                    location,
                    reference_uid: reference,
                });
            }

            let check_mode = options.check_mode;
            let poll = options.poll;
            let reconciler = Reconciler::builder(&schema).options(options).build();
            let outcome = reconciler.reconcile(&mut store, &request)?;
            writeln!(output, "{}", serde_json::to_string_pretty(&outcome)?)?;

            if outcome.changed() && !check_mode {
                if commit {
                    let job = commit_and_wait(&mut store, Some("prc reconcile"), &poll)?;
                    eprintln!("{} finished", job);
                }
                if write_state {
                    save_state(state, &store)?;
                }
            }
        }
        Command::Position {
            uid,
            location,
            reference,
            check,
            write_state,
        } => {
            let check_mode = options.check_mode || check;
            let state = cli.state.as_deref().ok_or("position requires --state")?;
            let mut store = load_state(state)?;
            schema.object_type(&object_type)?;

            let scope = Scope::new(cli.scope.as_str());
            let placement = Placement::new(location, reference.as_deref());
            let moved = PositionManager::new(&scope, &object_type)
                .check_mode(check_mode)
                .apply_position(&mut store, &uid, &placement)?;
            writeln!(output, "{}", serde_json::json!({ "changed": moved }))?;

            if moved && !check_mode && write_state {
                save_state(state, &store)?;
            }
        }
        Command::Filter { expression, file } => {
            let candidate = value::from_yaml(&read(&file)?)
                .map_err(|e| format!("Failed to parse field map {:?}: {}", file, e))?;
            writeln!(output, "{}", evaluate(&expression, &candidate)?)?;
        }
    }

    Ok(())
}

fn read(path: &Path) -> CliResult<String> {
    Ok(fs::read_to_string(path).map_err(|e| format!("Failed to read file {:?}: {}", path, e))?)
}

fn load_state(path: &Path) -> CliResult<MemoryStore> {
    Ok(MemoryStore::from_yaml(&read(path)?)
        .map_err(|e| format!("Failed to parse state file {:?}: {}", path, e))?)
}

fn save_state(path: &Path, store: &MemoryStore) -> CliResult<()> {
    fs::write(path, store.to_yaml()?)
        .map_err(|e| format!("Failed to write state file {:?}: {}", path, e))?;
    Ok(())
}
