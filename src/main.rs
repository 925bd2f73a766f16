use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use acme_autopilot::acme::{read_csr_domains, Authorization, Challenge, Identifier};
use acme_autopilot::config::Config;
use acme_autopilot::metrics;
use acme_autopilot::verify::{ChallengeVerifier, Verifier, VerifierConfig};

#[derive(Parser, Debug)]
#[command(name = "acme-autopilot")]
#[command(about = "ACME issuance tooling: CSR inspection, config checks and challenge pre-flight")]
#[command(version)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the identifiers an order for this CSR would contain
    Domains {
        /// PEM or DER certificate signing request
        csr: PathBuf,
    },

    /// Validate a configuration file and the CSR it points to
    Check {
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,
    },

    /// Check that a challenge response is publicly visible
    Verify {
        /// Challenge type (http-01 or dns-01)
        #[arg(long = "type", default_value = "http-01")]
        challenge_type: String,

        #[arg(long)]
        domain: String,

        #[arg(long, default_value = "")]
        token: String,

        /// Expected response body (http-01) or TXT value (dns-01)
        #[arg(long)]
        key_authorization: String,

        #[arg(long, default_value_t = 80)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    metrics::init_metrics();

    match args.command {
        Command::Domains { csr } => {
            let der = std::fs::read(&csr)
                .with_context(|| format!("Failed to read CSR: {:?}", csr))?;
            let domains = read_csr_domains(&der)?;

            for domain in domains.identifiers() {
                println!("{}", domain);
            }
        }
        Command::Check { config } => {
            info!("Loading configuration from {:?}", config);

            let config = Config::load(&config)?;
            let options = config.issue_options()?;
            options.validate()?;

            let domains = read_csr_domains(&options.csr)?.identifiers();
            if domains.is_empty() {
                anyhow::bail!("CSR {:?} names no domains", config.csr);
            }

            info!(domains = ?domains, "Configuration is valid");
        }
        Command::Verify {
            challenge_type,
            domain,
            token,
            key_authorization,
            port,
        } => {
            let config = VerifierConfig {
                http_port: port,
                ..VerifierConfig::default()
            };
            let verifier = Verifier::new(&config)?;

            let challenge = Challenge {
                challenge_type,
                url: String::new(),
                token,
                status: "pending".to_string(),
            };
            let authorization = Authorization {
                url: String::new(),
                identifier: Identifier::dns(domain.trim_start_matches("*.")),
                status: "pending".to_string(),
                challenges: vec![challenge.clone()],
                wildcard: domain.starts_with("*."),
            };

            match verifier
                .verify(&authorization, &challenge, &key_authorization)
                .await
            {
                Ok(()) => info!(domain = %authorization.domain(), "Challenge response is visible"),
                Err(e) => {
                    error!("{}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
