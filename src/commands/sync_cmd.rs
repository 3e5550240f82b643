use clap::{Args, Subcommand};

use super::AppContext;

#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    pub command: SyncSubcommand,
}

#[derive(Subcommand)]
pub enum SyncSubcommand {
    /// Push the current state to the remote store immediately
    Now,
    /// Show connectivity and last-sync details
    Status,
}

impl SyncCommand {
    pub async fn run(&self, ctx: &mut AppContext) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SyncSubcommand::Now => {
                ctx.save().await?;
                let status = ctx.engine.status();
                match status.last_synced_at {
                    Some(at) => println!("Synced at {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                    None => println!("Synced."),
                }
                Ok(())
            }
            SyncSubcommand::Status => {
                ctx.engine.probe_once().await;
                let status = ctx.engine.status();
                println!("Online:      {}", if status.is_online { "yes" } else { "no" });
                println!("Data source: {}", status.data_source);
                match status.last_synced_at {
                    Some(at) => println!("Last sync:   {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                    None => println!("Last sync:   never"),
                }
                if let Some(error) = &status.sync_error {
                    println!("Last error:  {}", error);
                }
                if status.is_read_only {
                    println!("Running read-only from the local fallback store.");
                }
                Ok(())
            }
        }
    }
}
