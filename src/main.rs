//! devsetup - Main entry point
//!
//! Interactive menu by default; `install`, `list`, `plan` and `validate`
//! for scripted use.

use std::process::ExitCode;

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use devsetup::bootstrap::ensure_homebrew;
use devsetup::cli::{Cli, Commands};
use devsetup::environment::apply_shellenv;
use devsetup::menu::{Selection, prompt_selection};
use devsetup::summary::render_summary;
use devsetup::{
    Catalog, CommandRunner, Environment, Orchestrator, SetupConfig, SetupError, ShellRunner,
    process_guard, resolve,
};

/// Logs go to stderr; RUST_LOG wins over `--verbose`
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Exits non-zero only when Homebrew provisioning fails after the user
/// opted in, or on bad usage/configuration.
fn main() -> Result<ExitCode> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);
    debug!("CLI arguments parsed: {:?}", cli);

    // Installers must not outlive us if we are interrupted
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    let env = Environment::from_process();
    let catalog = Catalog::builtin();

    match cli.command {
        Some(Commands::Validate { ref file }) => validate_config(file, &catalog),
        Some(Commands::Install { ref ids, defaults }) => {
            let config = load_config(&cli, &env, &catalog)?;
            let requested = requested_ids(ids, defaults, &config)?;
            let mut orchestrator = prepare(&catalog, &config, cli.dry_run, env)?;
            let outcome = orchestrator.install(&requested);
            println!("{}", render_summary(&outcome));
            return Ok(ExitCode::from(outcome.exit_code()));
        }
        Some(Commands::Plan { ref ids, defaults }) => {
            let config = load_config(&cli, &env, &catalog)?;
            let requested = requested_ids(ids, defaults, &config)?;
            print_plan(&catalog, &requested);
        }
        Some(Commands::List) => {
            let mut runner = ShellRunner::new(cli.dry_run);
            // Find brew-installed tools without offering to install Homebrew
            let env = apply_shellenv(env, "");
            print_list(&catalog, &mut runner, &env);
        }
        None => {
            info!("No command specified, starting the menu");
            let config = load_config(&cli, &env, &catalog)?;
            run_menu(&catalog, &config, cli.dry_run, env)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Effective configuration: file, environment overrides, then `--yes`
fn load_config(cli: &Cli, env: &Environment, catalog: &Catalog) -> Result<SetupConfig> {
    let mut config = SetupConfig::load(cli.config.as_deref(), env)?;
    config.validate(catalog).context("Invalid configuration")?;
    config.assume_yes |= cli.yes;
    Ok(config)
}

/// Validate a configuration file and exit non-zero if it is bad
fn validate_config(path: &std::path::Path, catalog: &Catalog) {
    info!("Validating configuration file: {:?}", path);
    let result = SetupConfig::load_from_file(path).and_then(|config| config.validate(catalog));
    match result {
        Ok(()) => {
            info!("Configuration validation successful");
            println!("{} Configuration file is valid: {:?}", "✓".green(), path);
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("{} Configuration validation failed: {:#}", "✗".red(), e);
            std::process::exit(1);
        }
    }
}

fn requested_ids(ids: &[String], defaults: bool, config: &SetupConfig) -> Result<Vec<String>> {
    if defaults {
        return Ok(config.default_packages.clone());
    }
    if ids.is_empty() {
        anyhow::bail!("no packages given (pass package ids or --defaults)");
    }
    Ok(ids.to_vec())
}

/// Bootstrap Homebrew and build the orchestrator. Bootstrap failure is the
/// one error that ends the run.
fn prepare<'c>(
    catalog: &'c Catalog,
    config: &SetupConfig,
    dry_run: bool,
    env: Environment,
) -> Result<Orchestrator<'c, ShellRunner>> {
    let mut runner = ShellRunner::new(dry_run);
    let assume_yes = config.assume_yes;

    let (env, status) = ensure_homebrew(&mut runner, env, &config.homebrew_install_url, |prompt| {
        if assume_yes {
            info!("{} yes (--yes)", prompt);
            return Ok(true);
        }
        Ok(dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?)
    })
    .context("Cannot continue without Homebrew")?;
    debug!("Homebrew status: {:?}", status);

    Ok(Orchestrator::new(catalog, runner, env).with_ruby_fallback(&config.ruby_fallback_version))
}

fn run_menu(catalog: &Catalog, config: &SetupConfig, dry_run: bool, env: Environment) -> Result<()> {
    let mut orchestrator = prepare(catalog, config, dry_run, env)?;

    loop {
        let requested = match prompt_selection(catalog, &config.default_packages)? {
            Selection::Quit => break,
            Selection::Defaults => config.default_packages.clone(),
            Selection::Packages(ids) => ids,
        };

        let outcome = orchestrator.install(&requested);
        println!("{}", render_summary(&outcome));
    }

    info!("Bye");
    Ok(())
}

fn print_plan(catalog: &Catalog, requested: &[String]) {
    for id in catalog.unknown_ids(requested) {
        eprintln!("{} {}, ignoring", "!".yellow(), SetupError::UnknownPackage(id.to_string()));
    }

    let resolution = resolve(catalog, requested);
    println!("{}", "Install order".bold());
    for (step, id) in resolution.order.iter().enumerate() {
        if let Some(descriptor) = catalog.get(id) {
            println!(
                "  {:>2}. {:<12} {:<32} [{}]",
                step + 1,
                id,
                descriptor.name,
                descriptor.method
            );
        }
    }
    for warning in &resolution.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
}

fn print_list(catalog: &Catalog, runner: &mut dyn CommandRunner, env: &Environment) {
    for (index, descriptor) in catalog.iter().enumerate() {
        let status = if runner.is_present(&descriptor.check_command, env) {
            "installed".green()
        } else {
            "missing".red()
        };
        let requires = if descriptor.dependencies.is_empty() {
            String::new()
        } else {
            format!(" (requires {})", descriptor.dependencies.join(", "))
        };
        println!(
            "  {:>2}) {:<12} {:<24} {}{}",
            index + 1,
            descriptor.id,
            descriptor.method.to_string(),
            status,
            requires
        );
    }
}
