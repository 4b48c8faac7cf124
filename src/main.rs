use clap::Parser;

use phone_lookup_bridge::{
    cli::{self, Commands},
    kafka::KafkaFactory,
    settings::AppConfig,
};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::commands::Args::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config.with_overrides(cli.brokers, cli.group_id),
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };
    let factory = KafkaFactory::new(config.broker, config.exchange);

    match cli.command {
        Some(Commands::Lookup { ids, cold }) => {
            if let Err(e) = cli::lookup(factory, &ids, cold).await {
                eprintln!("Error looking up phone numbers: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Check) => {
            if let Err(e) = cli::check_connection(&factory).await {
                eprintln!("Error checking broker connection: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::ServeReplies { directory }) => {
            if let Err(e) = cli::serve_replies(&factory, &directory).await {
                eprintln!("Error serving replies: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help to see instructions");
            std::process::exit(0);
        }
    }
}
