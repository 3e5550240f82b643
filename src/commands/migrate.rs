use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::Config;
use crate::local::LocalStore;
use crate::migration::{migration_status, run_migration};
use crate::models::AppData;
use crate::remote::SqliteRemote;

#[derive(Args)]
pub struct MigrateCommand {
    #[command(subcommand)]
    pub command: MigrateSubcommand,
}

#[derive(Subcommand)]
pub enum MigrateSubcommand {
    /// Copy the local JSON state tree into the relational store
    Run {
        /// Read the source tree from this file instead of the local store
        #[arg(long, short)]
        from: Option<PathBuf>,
    },
    /// Show whether the one-time migration has completed
    Status,
}

impl MigrateCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let database_path = config
            .database_path
            .as_ref()
            .ok_or("No database path configured. Set database_path in config.yaml or MEALWEEK_DATABASE_PATH.")?;
        let remote = SqliteRemote::connect(database_path).await?;

        match &self.command {
            MigrateSubcommand::Run { from } => {
                let source = from.clone().unwrap_or_else(|| config.local_store_path.clone());
                let payload = LocalStore::new(source.clone())
                    .load()?
                    .ok_or_else(|| format!("No state tree found at {}", source.display()))?;
                let data = AppData::from_value(&payload);

                let report = run_migration(&remote, &data).await;

                for (table, counts) in &report.tables {
                    println!(
                        "{:<16} {} inserted, {} skipped, {} failed (of {})",
                        table, counts.inserted, counts.skipped, counts.failed, counts.total
                    );
                }
                for warning in &report.warnings {
                    println!("warning: {}", warning);
                }
                for error in &report.errors {
                    println!("error: {}", error);
                }
                println!(
                    "{}: {} records, {} inserted, {} skipped, {} failed",
                    if report.success { "Migration complete" } else { "Migration FAILED" },
                    report.summary.total_records,
                    report.summary.inserted,
                    report.summary.skipped,
                    report.summary.failed
                );
                if report.success {
                    Ok(())
                } else {
                    Err("migration did not complete cleanly".into())
                }
            }
            MigrateSubcommand::Status => {
                let status = migration_status(&remote).await;
                println!(
                    "Remote reachable: {}",
                    if status.remote_reachable { "yes" } else { "no" }
                );
                match (&status.completed, &status.completed_at) {
                    (true, Some(at)) => println!("Migration completed at {}", at),
                    (true, None) => println!("Migration completed."),
                    (false, _) => println!("Migration has not run."),
                }
                Ok(())
            }
        }
    }
}
