//! # CLI Module
//!
//! Command-line interface for the Tokengate token-relay proxy.
//!
//! ## Commands
//!
//! - `start`: validate the environment and launch the relay
//! - `check-config`: validate the environment and print the effective
//!   configuration without starting the server
//! - `start-mock-idp`: launch the mock identity provider next to the relay,
//!   for local development without a real provider
//!
//! All configuration comes from environment variables (see the `env`
//! module); validation failures are printed and the process exits non-zero
//! before any socket is bound.
//!
//! ## Usage Example
//!
//! ```bash
//! export TOKENGATE_TOKEN_URL=https://idp.example.com/oauth2/v1/token
//! export TOKENGATE_CLIENT_ID=client_id
//! export TOKENGATE_CLIENT_SECRET=client_secret
//! export TOKENGATE_REDIRECT_URI=http://localhost:8080/redirect
//! export TOKENGATE_UPSTREAM_URL=http://localhost:9000
//! tokengate start
//! ```

use clap::{Parser, Subcommand};

use crate::env::{self, AppConfig};
use crate::server;

///////////////////////////////////////////////////////////////////////////////
//****                        Private Structs                            ****//
///////////////////////////////////////////////////////////////////////////////

#[derive(Parser)]
#[command(name = "tokengate")]
#[command(about = "Tokengate token-relay proxy CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the token-relay proxy server
    #[command(name = "start")]
    Start,
    /// Validate the environment and print the effective configuration
    #[command(name = "check-config")]
    CheckConfig,
    /// Start a mock identity provider alongside the relay for development
    #[command(name = "start-mock-idp")]
    StartMockIdp {
        #[arg(long)]
        port: Option<u16>,
    },
}

///////////////////////////////////////////////////////////////////////////////
//****                       Public Functions                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Parse CLI arguments and run the selected command
pub async fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            let config = validate_or_exit();
            server::start_server(config).await;
        }
        Commands::CheckConfig => {
            let config = validate_or_exit();
            print_config(&config);
        }
        Commands::StartMockIdp { port } => {
            let config = validate_or_exit();
            server::start_mock_idp_server(config, port.unwrap_or(3001)).await;
        }
    }
}

///////////////////////////////////////////////////////////////////////////////
//****                      Private Functions                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Validate environment variables, exiting non-zero on critical errors
fn validate_or_exit() -> AppConfig {
    match env::validate_environment() {
        Ok(config) => config,
        Err(errors) => {
            for error in errors {
                eprintln!("Environment validation error: {}", error);
            }
            std::process::exit(1);
        }
    }
}

fn print_config(config: &AppConfig) {
    println!("Configuration OK");
    println!("  token endpoint:   {}", config.token_url);
    println!("  client id:        {}", config.client_id);
    println!("  redirect URI:     {}", config.redirect_uri);
    println!("  upstream:         {}", config.upstream_url);
    println!("  protected path:   {}", config.protected_path);
    println!("  header prefix:    {}", config.header_prefix);
    println!("  host:             {}", config.host);
    println!("  port:             {}", config.port);
    println!("  bind address:     {}", config.bind_address);
    println!("  cache TTL:        {}s", config.cache_ttl_secs);
    println!("  cleanup interval: {}s", config.cache_cleanup_interval_secs);
    println!("  client timeout:   {}s", config.client_timeout_secs);
}
