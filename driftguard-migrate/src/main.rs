//! Driftguard Migration CLI Tool
//!
//! Applies, rolls back and inspects the application's schema migrations.
//! Exits 0 on success and 1 on any error, naming the failing migration when
//! there is one, so it can gate CI/CD pipelines.

use clap::{Parser, Subcommand};
use colored::Colorize;
use driftguard::migration::{MigrationError, MigrationManager, MigrationStatus, Registry};
use driftguard::{connect, Environment, MayPostgresExecutor, MigrateConfig};
use driftguard_migrate::confirm::confirm_reset;
use driftguard_migrate::settings::{Overrides, Settings};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "driftguard-migrate")]
#[command(about = "Schema migration tool for driftguard")]
#[command(version)]
struct Cli {
    /// Database connection URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Deployment environment (development, test, staging, production)
    #[arg(long, global = true)]
    environment: Option<Environment>,

    /// Configuration file
    #[arg(long, global = true, default_value = driftguard::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Hold a PostgreSQL advisory lock for the duration of the command
    #[arg(long, global = true)]
    advisory_lock: bool,

    /// Verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Migrate {
        /// Show what would be applied without running anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Roll back the most recently applied migration
    Rollback,

    /// Roll back every migration and re-apply them (not allowed in production)
    Reset {
        /// Skip the interactive confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Show applied, pending and unknown migrations
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check applied migrations for drift and modified scripts
    Validate,
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let quiet = cli.quiet;
    let print_metrics = cli.print_metrics;
    let result = run(cli);

    if print_metrics {
        print!("{}", driftguard::metrics::render());
    }

    match result {
        Ok(()) => {
            if !quiet {
                println!("{}", "✅ Success".green());
            }
            process::exit(0);
        }
        Err(e) => {
            report_failure(&e);
            process::exit(1);
        }
    }
}

fn report_failure(error: &anyhow::Error) {
    match error.downcast_ref::<MigrationError>() {
        Some(err) => {
            if let Some(name) = err.migration_name() {
                eprintln!("{} {}", "❌ Migration failed:".red(), name.bold());
            }
            eprintln!("{} {}", "❌ Error:".red(), err);
            if err.is_retryable() {
                eprintln!(
                    "{}",
                    "   Nothing was left half-applied; re-run once the cause is resolved.".yellow()
                );
            }
        }
        None => eprintln!("{} {:#}", "❌ Error:".red(), error),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = MigrateConfig::load_from(&cli.config)?;
    let settings = Settings::from_env(
        config,
        Overrides {
            database_url: cli.database_url,
            environment: cli.environment,
            advisory_lock: cli.advisory_lock,
        },
    )?;
    let registry = driftguard_migrate::registry()?;
    log::debug!(
        "environment {}, ledger {}, advisory lock {}, {} registered migration(s)",
        settings.migrate.environment,
        settings.migrate.ledger_table,
        settings.migrate.advisory_lock,
        registry.len()
    );

    let client = connect(&settings.database_url)?;
    let manager =
        MigrationManager::from_config(MayPostgresExecutor::new(client), &settings.migrate)?;

    match cli.command {
        Commands::Migrate { dry_run } => handle_migrate(&manager, &registry, dry_run)?,
        Commands::Rollback => handle_rollback(&manager, &registry)?,
        Commands::Reset { yes } => handle_reset(&manager, &registry, &settings, yes)?,
        Commands::Status { json } => handle_status(&manager, &registry, json)?,
        Commands::Validate => handle_validate(&manager, &registry)?,
    }
    Ok(())
}

type Manager = MigrationManager<MayPostgresExecutor>;

fn handle_migrate(manager: &Manager, registry: &Registry, dry_run: bool) -> anyhow::Result<()> {
    if dry_run {
        let status = manager.status(registry)?;
        if status.pending.is_empty() {
            println!("No pending migrations to apply");
        } else {
            println!("Would apply {} migration(s):", status.pending.len());
            for (i, pending) in status.pending.iter().enumerate() {
                println!("  {}. {} ({})", i + 1, pending.name, pending.id);
            }
        }
        return Ok(());
    }

    println!("Applying migrations...");
    let report = manager.run_migrations(registry)?;
    if report.is_noop() {
        println!("✅ No migrations to apply ({} already applied)", report.skipped);
    } else {
        for name in &report.applied {
            println!("  ✓ {name}");
        }
        println!(
            "✅ Successfully applied {} migration(s) in {:.2?}",
            report.applied.len(),
            report.elapsed
        );
    }
    Ok(())
}

fn handle_rollback(manager: &Manager, registry: &Registry) -> anyhow::Result<()> {
    println!("Rolling back last migration...");
    match manager.rollback_last_migration(registry)? {
        Some(name) => println!("✅ Rolled back {name}"),
        None => println!("✅ No migrations to roll back"),
    }
    Ok(())
}

fn handle_reset(
    manager: &Manager,
    registry: &Registry,
    settings: &Settings,
    yes: bool,
) -> anyhow::Result<()> {
    let environment = manager.environment();
    if !yes && !environment.is_production() {
        let target = driftguard::connection::redact(&settings.database_url);
        let confirmed = confirm_reset(io::stdin().lock(), io::stdout(), environment, &target)?;
        if !confirmed {
            anyhow::bail!("reset aborted: confirmation not given");
        }
    }
    log::warn!("resetting every migration in the {environment} environment");

    let report = manager.reset_database(registry)?;
    println!(
        "✅ Reset complete: rolled back {}, re-applied {}",
        report.rolled_back.len(),
        report.reapplied.len()
    );
    Ok(())
}

fn handle_status(manager: &Manager, registry: &Registry, json: bool) -> anyhow::Result<()> {
    let status = manager.status(registry)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }
    Ok(())
}

fn print_status(status: &MigrationStatus) {
    println!("\n📊 Migration Status\n");

    if status.applied.is_empty() {
        println!("✅ Applied Migrations: None");
    } else {
        println!("✅ Applied Migrations ({}):", status.applied.len());
        for entry in &status.applied {
            let line = format!(
                "  ✓ {} ({})",
                entry.name,
                entry.applied_at.format("%Y-%m-%d %H:%M:%S")
            );
            if status.unknown.contains(&entry.name) {
                println!("{} {}", line.yellow(), "[not in registry]".yellow());
            } else {
                println!("{line}");
            }
        }
    }

    println!();

    if status.pending.is_empty() {
        println!("⏳ Pending Migrations: None");
    } else {
        println!("⏳ Pending Migrations ({}):", status.pending.len());
        for pending in &status.pending {
            println!("  ⏳ {} ({})", pending.name, pending.id);
        }
    }

    println!(
        "\n📈 Summary: {} applied, {} pending, {} unknown",
        status.applied.len(),
        status.pending.len(),
        status.unknown.len()
    );
}

fn handle_validate(manager: &Manager, registry: &Registry) -> anyhow::Result<()> {
    println!("Validating applied migrations...");
    let status = manager.validate(registry)?;
    println!(
        "✅ {} applied migration(s) match the registry",
        status.applied.len()
    );
    Ok(())
}
