use clap::Parser;
use prepx::cli::Cli;
use prepx::utils::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(if cli.verbose { "debug" } else { "warn" });

    if let Err(err) = cli.execute().await {
        match err.downcast_ref::<prepx::Error>() {
            Some(api_err) => eprintln!("Error: {}", api_err.user_message()),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}
