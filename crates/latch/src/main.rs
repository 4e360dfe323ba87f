//! latch CLI - reference driver for both peer roles of the rendezvous
//! handshake

#![forbid(unsafe_code)]

mod cli;
mod commands;
mod exit_codes;
mod logging;
mod output;

use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose, cli.quiet) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(exit_codes::ERROR);
    }

    let json_output = cli.json;

    let result = match cli.command {
        cli::Commands::New(args) => commands::new::execute(args, json_output).await,
        cli::Commands::Join(args) => commands::join::execute(args, json_output).await,
        cli::Commands::Completions(args) => {
            commands::completions::execute(args);
            Ok(())
        }
        cli::Commands::Version => {
            commands::version::execute(json_output);
            Ok(())
        }
    };

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            if json_output {
                let err_json = serde_json::json!({ "error": format!("{}", e) });
                eprintln!("{}", err_json);
            } else {
                output::color::error(&format!("{}", e));
                if let Some(hint) = output::errors::diagnose(&e) {
                    eprintln!("{}", hint);
                }
            }
            let msg = e.to_string();
            let code = if msg.contains("bad key") {
                exit_codes::AUTH_FAILURE
            } else if msg.contains("rendezvous socket")
                || msg.contains("peer connection")
                || msg.contains("peer hung up")
                || msg.contains("timed out")
            {
                exit_codes::NETWORK_ERROR
            } else {
                exit_codes::ERROR
            };
            std::process::exit(code);
        }
    }
}
