use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use ed25519_dalek::{
    SigningKey,
    pkcs8::{EncodePrivateKey, EncodePublicKey, spki::der::pem::LineEnding},
};
use rand::{RngCore, rngs::OsRng};
use serde_json::{Value, json};

use token_guard::services::token::{ChaChaCipher, TokenClaims, TokenIssuer, TokenType};

/// Developer tool for the token gate.
///
/// - keygen: Ed25519 signing key (PKCS#8 PEM) + cipher key
/// - mint:   sign a token in the gate's wire format
/// - pubkey: print the key service response for a signing key
#[derive(Parser, Debug)]
#[command(name = "token-gen", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a signing key and a cipher key.
    Keygen {
        /// Write the private key PEM here instead of stdout.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Mint a token.
    Mint {
        /// Path to the issuer's Ed25519 private key in PEM (PKCS#8)
        #[arg(long, value_name = "FILE")]
        private_pem: PathBuf,

        /// Cipher key (same value as TOKEN_CIPHER_KEY on the gate)
        #[arg(long, env = "TOKEN_CIPHER_KEY", hide_env_values = true)]
        cipher_key: String,

        /// CLIENT / SESSION / SERVER / NONE
        #[arg(long = "type", default_value = "SESSION")]
        token_type: String,

        /// Verification context: where `<context>/pubkey` is served.
        #[arg(long)]
        context: String,

        /// Lifetime in milliseconds. Negative never expires.
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        expiry_ms: i64,

        /// Override dateCreated (epoch millis). Default: now.
        #[arg(long)]
        created_ms: Option<i64>,

        /// Assertion as key=value; repeatable. JSON values are kept typed.
        #[arg(long = "assert", value_name = "KEY=VALUE")]
        assertions: Vec<String>,
    },

    /// Print `{"key": ...}` for a private key, as the key service should serve it.
    Pubkey {
        #[arg(long, value_name = "FILE")]
        private_pem: PathBuf,
    },
}

fn load_pem(path: &PathBuf) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn parse_assertion(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("assertion {raw:?} is not KEY=VALUE");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("assertion {raw:?} has an empty key");
    }
    // `42` / `true` / `{"a":1}` stay typed, anything else is a string
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn main() -> Result<()> {
    match Args::parse().command {
        Command::Keygen { out } => {
            let signing_key = SigningKey::generate(&mut OsRng);
            let private_pem = signing_key
                .to_pkcs8_pem(LineEnding::LF)
                .context("encode private key")?;
            let public_pem = signing_key
                .verifying_key()
                .to_public_key_pem(LineEnding::LF)
                .context("encode public key")?;

            let mut cipher_key = [0u8; 32];
            OsRng.fill_bytes(&mut cipher_key);

            match out {
                Some(path) => {
                    fs::write(&path, private_pem.as_bytes())
                        .with_context(|| format!("write {}", path.display()))?;
                    println!("private key: {}", path.display());
                }
                None => print!("{}", private_pem.as_str()),
            }
            print!("{}", public_pem);
            println!("TOKEN_CIPHER_KEY={}", hex::encode(cipher_key));
        }

        Command::Mint {
            private_pem,
            cipher_key,
            token_type,
            context,
            expiry_ms,
            created_ms,
            assertions,
        } => {
            let cipher = ChaChaCipher::from_key_material(&cipher_key).context("cipher key")?;
            let issuer = TokenIssuer::from_pkcs8_pem(&load_pem(&private_pem)?, Arc::new(cipher))?;

            let token_type: TokenType = token_type.parse()?;
            let mut claims =
                TokenClaims::new(token_type, context, created_ms.unwrap_or_else(now_ms))
                    .expires_in(expiry_ms);
            for raw in &assertions {
                let (key, value) = parse_assertion(raw)?;
                claims = claims.assert(key, value);
            }

            println!("{}", issuer.issue(&claims)?);
        }

        Command::Pubkey { private_pem } => {
            // cipher is unused for the public key
            let issuer = TokenIssuer::from_pkcs8_pem(
                &load_pem(&private_pem)?,
                Arc::new(ChaChaCipher::new(&[0u8; 32])),
            )?;
            println!("{}", json!({ "key": issuer.public_key_base64() }));
        }
    }

    Ok(())
}
