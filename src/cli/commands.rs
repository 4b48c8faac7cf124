use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "Phone number lookups over Kafka")]
pub struct Args {
    /// JSON config file (defaults to ./config.json when present)
    #[arg(long, global = true, env = "PHONE_LOOKUP_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Comma-separated broker list, overrides the config file
    #[arg(long, global = true, env = "PHONE_LOOKUP_BROKERS")]
    pub brokers: Option<String>,

    /// Consumer group of the reply subscriber, overrides the config file
    #[arg(long, global = true)]
    pub group_id: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Look up phone numbers by person identifier.
    ///
    /// All identifiers share one connection and are looked up concurrently,
    /// unless --cold is given.
    Lookup {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Open and close a dedicated connection for each identifier
        #[arg(long, default_value = "false")]
        cold: bool,
    },
    /// Check that the reply subscriber gets a partition assignment.
    Check,
    /// Answer lookup requests from a JSON directory file.
    ///
    /// The file maps identifiers to phone numbers, e.g.
    /// {"J.DOE": "+33612345678"}. Unknown identifiers get no reply.
    ServeReplies {
        #[arg(value_name = "FILE")]
        directory: PathBuf,
    },
}
