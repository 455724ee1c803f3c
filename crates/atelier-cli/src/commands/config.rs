//! Configuration commands.

use atelier_core::storage::Config;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write the default configuration to disk if none exists
    Init,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load_or_default();
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Init => {
            let config = Config::load()?;
            let _ = config;
            println!("Configuration ready.");
        }
    }
    Ok(())
}
