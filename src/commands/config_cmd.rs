use clap::{Args, Subcommand};

use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show => {
                println!("Config file:    {}", Config::default_config_path().display());
                match &config.database_path {
                    Some(path) => println!("Database:       {}", path.display()),
                    None => println!("Database:       (not configured, local only)"),
                }
                println!("Local store:    {}", config.local_store_path.display());
                println!("Debounce:       {} ms", config.debounce_ms);
                println!("Probe interval: {} s", config.probe_interval_secs);
                Ok(())
            }
        }
    }
}
