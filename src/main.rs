//! Aegis CLI entrypoint.
//!
//! This is the main entrypoint for the aegis command-line tool.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use aegis_deploy::cli::{Cli, Commands, OutputFormatter};
use aegis_deploy::config::ConfigResolver;
use aegis_deploy::error::{AegisError, Result};

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    let formatter = OutputFormatter::new(cli.output);
    match run(&cli, &formatter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, &formatter);
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatches the selected command.
fn run(cli: &Cli, formatter: &OutputFormatter) -> Result<()> {
    match &cli.command {
        Commands::Init { path, force } => cmd_init(path, *force),
        Commands::Validate { warnings } => cmd_validate(cli, *warnings, formatter),
        Commands::Show => cmd_show(cli, formatter),
    }
}

/// Prints an error, listing every violation when validation failed.
fn report_error(error: &AegisError, formatter: &OutputFormatter) {
    let violations = error.violations();
    if violations.is_empty() {
        eprintln!("Error: {error}");
    } else {
        eprintln!("{}", formatter.format_violations(violations));
    }
}

/// Initialize a new project.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing new Aegis project in: {}", path.display());

    let config_path = path.join("aegis.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    let config_template = include_str!("../templates/aegis.yaml");
    std::fs::write(&config_path, config_template)?;
    eprintln!("Created: {}", config_path.display());

    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    let ignored = [".env", "aegis_function.zip"];
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        let missing: Vec<&str> = ignored
            .into_iter()
            .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
            .collect();
        if !missing.is_empty() {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# Aegis")?;
            for entry in missing {
                writeln!(file, "{entry}")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, format!("{}\n", ignored.join("\n")))?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nProject initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Edit aegis.yaml with your function and API settings");
    eprintln!("  2. Copy .env.example to .env for local overrides");
    eprintln!("  3. Run 'aegis validate' to check your configuration");

    Ok(())
}

/// Builds the resolver for the global flags.
fn resolver(cli: &Cli) -> ConfigResolver {
    ConfigResolver::new()
        .with_config_name(cli.config.as_str())
        .with_overrides(cli.overrides())
}

/// Validate configuration.
fn cmd_validate(cli: &Cli, show_warnings: bool, formatter: &OutputFormatter) -> Result<()> {
    let resolution = resolver(cli).resolve()?;
    debug!("Validated {} stage(s)", resolution.descriptor.api.stages.len());

    eprintln!("{}", formatter.format_summary(&resolution, show_warnings));
    Ok(())
}

/// Print the resolved descriptor.
fn cmd_show(cli: &Cli, formatter: &OutputFormatter) -> Result<()> {
    let resolution = resolver(cli).resolve()?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", formatter.format_descriptor(&resolution.descriptor))?;
    Ok(())
}
