//! Environment store CLI.
//!
//! Manages the per-environment artifacts under `.fx/`: creates configs,
//! lists environments, validates them, and prints them with secrets masked.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;

use envrunner::core::secrets::mask_secrets;
use envrunner::environment::EnvironmentStore;
use envrunner::exit_codes;
use envrunner::io::paths::ProjectPaths;
use envrunner::io::settings::{generate_project_id, load_settings, write_settings};
use envrunner::logging;

#[derive(Parser)]
#[command(
    name = "envrunner",
    version,
    about = "Per-environment config and state store"
)]
struct Cli {
    /// Project root containing `.fx/`.
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create settings (if missing) and a config for a new environment.
    Init {
        /// Short app name written into the config manifest.
        #[arg(long)]
        app_name: String,
        /// Environment to create. Defaults to `default_env` from settings.
        #[arg(long)]
        env: Option<String>,
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Print environment names, one per line.
    List {
        /// Exclude the local environment.
        #[arg(long)]
        remote: bool,
    },
    /// Load and decrypt an environment, failing on any store error.
    Validate { env: String },
    /// Print config and state of an environment with secrets masked.
    Show { env: String },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init {
            app_name,
            env,
            force,
        } => cmd_init(cli.project, &app_name, env, force),
        Command::List { remote } => cmd_list(cli.project, remote),
        Command::Validate { env } => cmd_validate(cli.project, &env),
        Command::Show { env } => cmd_show(cli.project, &env),
    }
}

fn cmd_init(project: PathBuf, app_name: &str, env: Option<String>, force: bool) -> Result<()> {
    let paths = ProjectPaths::new(&project);
    paths.ensure_root()?;
    let mut settings = load_settings(&paths.settings_path)?;
    if settings.project_id.is_empty() {
        settings.project_id = generate_project_id();
        write_settings(&paths.settings_path, &settings).context("write settings")?;
    }

    let env_name = env.unwrap_or_else(|| settings.default_env.clone());
    let store = EnvironmentStore::with_settings(project, settings);
    if !force && store.check_env_exists(&env_name)? {
        bail!("environment '{env_name}' already exists (use --force to overwrite)");
    }
    let path = store
        .save_config(&env_name, &store.new_env_config(app_name))
        .with_context(|| format!("create environment '{env_name}'"))?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_list(project: PathBuf, remote: bool) -> Result<()> {
    let store = EnvironmentStore::open(project)?;
    let names = if remote {
        store.list_remote_environments()?
    } else {
        store.list_environments()?
    };
    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn cmd_validate(project: PathBuf, env_name: &str) -> Result<()> {
    let store = EnvironmentStore::open(project)?;
    let crypto = store.crypto_for(env_name)?;
    let env = store
        .load_environment(env_name, &crypto)
        .with_context(|| format!("validate environment '{env_name}'"))?;
    println!("{}: ok ({} components)", env.name, env.state.len());
    Ok(())
}

fn cmd_show(project: PathBuf, env_name: &str) -> Result<()> {
    let store = EnvironmentStore::open(project)?;
    let crypto = store.crypto_for(env_name)?;
    let env = store
        .load_environment(env_name, &crypto)
        .with_context(|| format!("load environment '{env_name}'"))?;
    let mut state = env.state;
    mask_secrets(&mut state);
    let doc = json!({
        "name": env.name,
        "config": env.config,
        "state": state.into_value(),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&doc).context("serialize environment")?
    );
    Ok(())
}
