use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Bybit inverse-perpetual funding-rate bot", long_about = None)]
pub struct Args {
    /// TOML settings file. Missing files fall back to defaults.
    #[arg(long, default_value = "frbot.toml")]
    pub config: PathBuf,

    /// Trade on testnet regardless of BYBIT_TEST.
    #[arg(long)]
    pub testnet: bool,
}
