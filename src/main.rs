use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mailroom::config::TelemetryConfig;
use mailroom::{telemetry, Email, EmailConfig, Mailer, TemplateSet};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Render and deliver templated email
#[derive(Parser, Debug)]
#[command(name = "mailroom")]
#[command(about = "Send templated email over SMTP or SendGrid", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the email configuration from the environment
    Check,
    /// Render a template and deliver it
    Send {
        /// Recipient address; repeat for several recipients
        #[arg(long, required = true)]
        to: Vec<String>,

        #[arg(long)]
        subject: String,

        /// Template name without extension
        #[arg(long)]
        template: String,

        /// Directory holding `<template>.txt` and `<template>.html`
        #[arg(long, default_value = "templates")]
        templates_dir: PathBuf,

        /// Template data as a JSON object
        #[arg(long, default_value = "{}")]
        data: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    telemetry::init(&TelemetryConfig::from_env());

    let config = EmailConfig::from_env()?;

    match cli.command {
        Commands::Check => {
            config.validate()?;
            if config.available() {
                let transport = if config.smtp.enabled() { "smtp" } else { "sendgrid" };
                info!(
                    "Email configuration is valid, sending as {} via {}",
                    config.from_address(),
                    transport
                );
            } else if config.testing {
                info!("Testing mode, sends go to the mock transport");
            } else {
                info!("No email transport configured, email sending is disabled");
            }
            Ok(())
        }
        Commands::Send {
            to,
            subject,
            template,
            templates_dir,
            data,
        } => {
            let data: serde_json::Value =
                serde_json::from_str(&data).context("Invalid --data JSON")?;
            let templates = TemplateSet::from_dir(&templates_dir).with_context(|| {
                format!("Failed to load templates from {}", templates_dir.display())
            })?;

            let mailer = Mailer::initialize(config, Some(templates)).await?;
            let email = Email::new(mailer.config().from_address(), to, subject, template, data)?;

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted, abandoning delivery");
                    trigger.cancel();
                }
            });

            mailer.send_with_cancel(&email, &cancel).await?;
            info!("Delivered {:?} to {}", email.subject, email.to.join(", "));
            Ok(())
        }
    }
}
