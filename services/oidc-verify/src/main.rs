use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::Parser;
use common_oidc::{fetch_discovery, IdTokenVerifier, JwksFetcher, JwksKeySource};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_verifier_config, KeySource};

/// Validate an OpenID Connect ID token against the configured provider.
#[derive(Debug, Parser)]
#[command(name = "oidc-verify")]
struct Args {
    /// ID token to validate, or `-` to read it from stdin
    token: String,

    /// Nonce sent with the authentication request
    #[arg(long, default_value = "")]
    nonce: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = load_verifier_config()?;
    let client = reqwest::Client::new();

    let jwks_url = match &config.keys {
        KeySource::Jwks(url) => url.clone(),
        KeySource::Discovery(issuer) => {
            fetch_discovery(&client, issuer)
                .await
                .with_context(|| format!("Failed to discover provider metadata for {issuer}"))?
                .jwks_uri
        }
    };

    let source = JwksKeySource::new(JwksFetcher::with_client(client, jwks_url));
    let count = source
        .refresh()
        .await
        .context("Failed to load provider signing keys")?;
    info!(count, url = source.fetcher().url(), "loaded provider signing keys");

    let token = read_token(&args.token)?;
    let verifier = IdTokenVerifier::new(source);
    match verifier.validate(&config.provider, &args.nonce, &token) {
        Ok(claims) => {
            println!("{}", serde_json::to_string_pretty(&claims)?);
            Ok(())
        }
        // The reason is logged by the verifier; the caller only learns the outcome.
        Err(_) => bail!("ID token rejected"),
    }
}

fn read_token(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.trim().to_string());
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read ID token from stdin")?;
    Ok(buffer.trim().to_string())
}
