use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt, path::PathBuf, str::FromStr};

use crate::services::storage_service::{CloudBinding, StorageConfig};

/// Runtime environment the service was started in.
///
/// Decides whether a configured production bucket is used at all; see
/// [`crate::services::storage_service::select_backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => bail!("unknown environment `{}` (expected development or production)", other),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub storage_dir: PathBuf,
    pub bucket_name: Option<String>,
    pub bucket_region: String,
    pub bucket_endpoint: Option<String>,
    pub public_base_url: Option<String>,
    pub auth_file: Option<PathBuf>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "School website admin storage API")]
pub struct Args {
    /// Host to bind to (overrides SCHOOL_SITE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides SCHOOL_SITE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// `development` or `production` (overrides SCHOOL_SITE_ENV)
    #[arg(long)]
    pub environment: Option<String>,

    /// Root of the disk-backed bucket (overrides SCHOOL_SITE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Production bucket name (overrides SCHOOL_SITE_BUCKET)
    #[arg(long)]
    pub bucket_name: Option<String>,

    /// Production bucket region (overrides SCHOOL_SITE_BUCKET_REGION)
    #[arg(long)]
    pub bucket_region: Option<String>,

    /// S3-compatible endpoint (overrides SCHOOL_SITE_BUCKET_ENDPOINT)
    #[arg(long)]
    pub bucket_endpoint: Option<String>,

    /// Public base URL objects are served from (overrides SCHOOL_SITE_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// JSON file listing admin bearer tokens (overrides SCHOOL_SITE_AUTH_FILE)
    #[arg(long)]
    pub auth_file: Option<PathBuf>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::merge(Args::parse(), |name| env::var(name))
    }

    /// Merge CLI args over values produced by `lookup` (normally `std::env::var`).
    fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let optional = |name: &str| -> Result<Option<String>> {
            match lookup(name) {
                Ok(value) if value.trim().is_empty() => Ok(None),
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", name)),
            }
        };

        let env_port = match optional("SCHOOL_SITE_PORT")? {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing SCHOOL_SITE_PORT value `{}`", value))?,
            None => 3000,
        };
        let environment = match args.environment.or(optional("SCHOOL_SITE_ENV")?) {
            Some(value) => value
                .parse::<Environment>()
                .context("parsing SCHOOL_SITE_ENV")?,
            None => Environment::Development,
        };

        Ok(Self {
            host: args
                .host
                .or(optional("SCHOOL_SITE_HOST")?)
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: args.port.unwrap_or(env_port),
            environment,
            storage_dir: args
                .storage_dir
                .or(optional("SCHOOL_SITE_STORAGE_DIR")?.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("./data/bucket")),
            bucket_name: args.bucket_name.or(optional("SCHOOL_SITE_BUCKET")?),
            bucket_region: args
                .bucket_region
                .or(optional("SCHOOL_SITE_BUCKET_REGION")?)
                .unwrap_or_else(|| "auto".into()),
            bucket_endpoint: args
                .bucket_endpoint
                .or(optional("SCHOOL_SITE_BUCKET_ENDPOINT")?),
            public_base_url: args
                .public_base_url
                .or(optional("SCHOOL_SITE_PUBLIC_BASE_URL")?),
            auth_file: args
                .auth_file
                .or(optional("SCHOOL_SITE_AUTH_FILE")?.map(PathBuf::from)),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The explicit storage configuration handed to the bucket provider.
    pub fn storage(&self) -> StorageConfig {
        StorageConfig {
            environment: self.environment,
            cloud: self.bucket_name.as_ref().map(|bucket| CloudBinding {
                bucket: bucket.clone(),
                region: self.bucket_region.clone(),
                endpoint: self.bucket_endpoint.clone(),
            }),
            disk_root: self.storage_dir.clone(),
        }
    }
}
