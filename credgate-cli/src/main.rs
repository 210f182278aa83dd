mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "credgate-cli")]
#[command(about = "Inspect request principals and sign test credentials")]
#[command(version)]
pub struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the principals of a request snapshot (JSON)
    Inspect {
        /// Path to the request snapshot JSON file ("-" for stdin)
        snapshot: String,

        /// Extractor configuration file
        #[arg(short, long, default_value = "credgate.toml")]
        config: String,
    },
    /// Render a signed delegation token or SSO cookie value
    Sign {
        /// Hex-encoded 32-byte Ed25519 seed
        #[arg(short, long)]
        key: String,

        /// User the credential speaks for
        #[arg(short, long)]
        user: String,

        /// Path prefix the token is valid for
        #[arg(short, long)]
        scope: Option<String>,

        /// Issuing domain
        #[arg(short, long)]
        domain: Option<String>,

        /// Lifetime in seconds
        #[arg(short, long, default_value_t = 3600)]
        ttl: i64,

        /// Render an SSO cookie value instead of a token
        #[arg(long)]
        cookie: bool,
    },
    /// Generate an Ed25519 key pair
    Keygen,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { snapshot, config } => {
            let report = commands::execute_inspect(&snapshot, &config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Sign {
            key,
            user,
            scope,
            domain,
            ttl,
            cookie,
        } => {
            let value = commands::execute_sign(&key, &user, scope, domain, ttl, cookie)?;
            println!("{}", value);
            Ok(())
        }
        Commands::Keygen => {
            let (seed, public_key) = commands::execute_keygen();
            println!("seed:       {}", seed);
            println!("public key: {}", public_key);
            Ok(())
        }
    }
}
