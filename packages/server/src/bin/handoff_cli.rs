//! CLI for producing desktop handoff links without the web app
//!
//! Prints the mobile URL as JSON and optionally writes the QR code as SVG.
//! Useful for testing the mobile capture page on a real phone.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use url::Url;
use verification_core::common::SessionId;
use verification_core::domains::handoff::{parse_mobile_link, DesktopHandoff, MobileLink};

#[derive(Parser)]
#[command(name = "handoff_cli")]
#[command(about = "Generate and inspect desktop-to-mobile handoff links")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a mobile verification link and its QR code
    Link {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        cpf: String,
        /// Reuse an existing session instead of minting one
        #[arg(long)]
        session_id: Option<SessionId>,
        #[arg(long, env = "PUBLIC_BASE_URL", default_value = "http://localhost:3000")]
        base_url: String,
        #[arg(long, env = "MOBILE_VERIFY_PATH", default_value = "/verify/mobile")]
        mobile_path: String,
        /// Write the QR code SVG here
        #[arg(long)]
        qr_out: Option<PathBuf>,
    },

    /// Parse a mobile verification URL the way the phone would
    Parse { url: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkOutput {
    session_id: SessionId,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    qr_path: Option<PathBuf>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParseOutput {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<MobileLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Link {
            user_id,
            cpf,
            session_id,
            base_url,
            mobile_path,
            qr_out,
        } => {
            let base = Url::parse(&base_url).context("Invalid base URL")?;
            let handoff = match session_id {
                Some(id) => DesktopHandoff::resume(id, &user_id, &cpf, &base, &mobile_path)?,
                None => DesktopHandoff::start(&user_id, &cpf, &base, &mobile_path)?,
            };
            let code = handoff.regenerate()?;

            if let Some(path) = &qr_out {
                std::fs::write(path, &code.qr_svg)
                    .with_context(|| format!("Failed to write QR code to {}", path.display()))?;
            }

            print_json(&LinkOutput {
                session_id: code.session_id,
                url: code.url,
                qr_path: qr_out,
            })
        }
        Commands::Parse { url } => {
            let parsed = Url::parse(&url).context("Invalid URL")?;
            let output = match parse_mobile_link(parsed.query().unwrap_or_default()) {
                Ok(link) => ParseOutput {
                    valid: true,
                    link: Some(link),
                    error: None,
                },
                Err(e) => ParseOutput {
                    valid: false,
                    link: None,
                    error: Some(e.to_string()),
                },
            };
            print_json(&output)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
