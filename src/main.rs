use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use gspath::filesystem::FilesystemConfig;
use gspath::storage::{AuthMode, RetrySettings, TransportConfig, read_to_end};
use gspath::{AccessPolicySelector, Encoding, GcsPathBuilder, GcsPathBuilderFactory, OpenOption};

/// Resolve and access gs:// paths
#[derive(Parser)]
#[command(name = "gspath", version, about)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Project that owns the paths and pays for requester-pays buckets
    #[arg(long, global = true, env = "GOOGLE_CLOUD_PROJECT")]
    project: Option<String>,

    /// Bill requests to the project when a bucket is requester-pays
    #[arg(long, global = true)]
    requester_pays: bool,

    /// Send unsigned requests (public buckets only)
    #[arg(long, global = true, conflicts_with = "hmac_access_key_id")]
    anonymous: bool,

    /// HMAC access key id
    #[arg(long, global = true, env = "GCS_HMAC_ACCESS_KEY_ID", requires = "hmac_secret")]
    hmac_access_key_id: Option<String>,

    /// HMAC secret
    #[arg(long, global = true, env = "GCS_HMAC_SECRET", hide_env_values = true)]
    hmac_secret: Option<String>,

    /// Cloud Storage XML API endpoint
    #[arg(long, global = true, default_value = gspath::storage::transport::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Block size used by opened filesystems, in bytes
    #[arg(long, global = true, default_value_t = FilesystemConfig::default().block_size)]
    block_size: usize,

    /// Attempts per request before giving up
    #[arg(long, global = true, default_value_t = RetrySettings::default().max_attempts)]
    max_attempts: u32,

    /// Application name reported to the service
    #[arg(long, global = true, default_value = "gspath")]
    app_name: String,
}

#[derive(Subcommand)]
enum Command {
    /// Validate and resolve paths without touching any object
    Resolve {
        paths: Vec<String>,
        /// Print one JSON object per path
        #[arg(long)]
        json: bool,
    },
    /// Print an object's contents
    Cat { path: String },
    /// Write text to an object
    Put {
        path: String,
        content: String,
        /// Fail if the object already exists
        #[arg(long)]
        create_new: bool,
        /// Character encoding of the stored bytes
        #[arg(long, default_value = "utf-8")]
        encoding: Encoding,
    },
    /// Show whether a path's bucket is requester-pays
    RequesterPays { path: String },
}

impl ConnectionArgs {
    fn factory(&self) -> GcsPathBuilderFactory {
        let auth = match (&self.hmac_access_key_id, &self.hmac_secret) {
            (Some(access_key_id), Some(secret)) => AuthMode::Hmac {
                access_key_id: access_key_id.clone(),
                secret: secret.clone(),
            },
            _ if self.anonymous => AuthMode::Anonymous,
            _ => AuthMode::ApplicationDefault,
        };

        GcsPathBuilderFactory {
            auth,
            application_name: self.app_name.clone(),
            retry: RetrySettings {
                max_attempts: self.max_attempts,
                initial_backoff: Duration::from_secs(1),
            },
            filesystem: FilesystemConfig {
                block_size: self.block_size,
                ..FilesystemConfig::default()
            },
            transport: TransportConfig {
                endpoint_url: self.endpoint.clone(),
                ..TransportConfig::default()
            },
            default_project: self.project.clone(),
            policy: if self.requester_pays {
                AccessPolicySelector::RequesterPays
            } else {
                AccessPolicySelector::Standard
            },
        }
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gspath=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let builder = cli
        .connection
        .factory()
        .build(&HashMap::new())
        .await
        .context("Failed to initialize Cloud Storage client")?;

    match cli.command {
        Command::Resolve { paths, json } => resolve(&builder, &paths, json).await,
        Command::Cat { path } => {
            let path = builder.build(&path).await?;
            let body = read_to_end(path.read().await?)
                .await
                .with_context(|| format!("Failed to read {path}"))?;
            std::io::stdout().write_all(&body)?;
            Ok(())
        }
        Command::Put {
            path,
            content,
            create_new,
            encoding,
        } => {
            let path = builder.build(&path).await?;
            let options: &[OpenOption] = if create_new {
                &[OpenOption::CreateNew]
            } else {
                &OpenOption::DEFAULT_WRITE
            };
            let written = path.write(&content, options, encoding).await?;
            println!("{} {}", "Wrote".green(), written);
            Ok(())
        }
        Command::RequesterPays { path } => {
            let path = builder.build(&path).await?;
            let pays = path.requester_pays().await?;
            let billing = if pays {
                "requester pays".yellow()
            } else {
                "owner pays".normal()
            };
            println!("{}: {}", path.bucket()?, billing);
            Ok(())
        }
    }
}

/// Resolve every path, reporting failures per path
async fn resolve(builder: &GcsPathBuilder, paths: &[String], json: bool) -> Result<()> {
    let mut failed = 0;

    for raw in paths {
        match builder.build(raw).await {
            Ok(path) => {
                let blob = path.blob_id()?;
                if json {
                    let value = serde_json::json!({
                        "input": raw,
                        "uri": path.as_string(),
                        "without_scheme": path.without_scheme(),
                        "bucket": blob.bucket,
                        "object": blob.name,
                    });
                    println!("{value}");
                } else {
                    println!("{} {}", path.as_string().cyan(), path.without_scheme().dimmed());
                }
            }
            Err(e) => {
                failed += 1;
                if json {
                    let value = serde_json::json!({
                        "input": raw,
                        "error": e.to_string(),
                        "retryable": e.is_retryable(),
                    });
                    println!("{value}");
                } else {
                    eprintln!("{} {}", "Invalid:".red().bold(), e);
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} paths could not be resolved", paths.len());
    }
    Ok(())
}
