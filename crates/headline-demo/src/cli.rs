use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "headline-demo")]
#[command(
    author,
    version,
    about = "Categorize news headlines with pre-trained NLP classifiers"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web UI
    Serve {
        #[command(flatten)]
        common: CommonArgs,

        /// Listen port
        #[arg(short, long, default_value = "8501")]
        port: u16,

        /// Listen address
        #[arg(short, long, default_value = "127.0.0.1")]
        address: String,

        /// Load every model before accepting requests
        #[arg(long)]
        preload: bool,
    },

    /// Classify one headline with every configured model
    Predict {
        #[command(flatten)]
        common: CommonArgs,

        /// Headline text
        #[arg(long)]
        headline: String,

        /// Print one markdown block per model instead of a table
        #[arg(long)]
        markdown: bool,
    },

    /// Download and unpack every remote model without loading it
    Fetch {
        #[command(flatten)]
        common: CommonArgs,
    },
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Self::Serve { common, .. } | Self::Predict { common, .. } | Self::Fetch { common } => {
                common
            }
        }
    }
}
