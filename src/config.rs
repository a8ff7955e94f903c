use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub database_url: String,
    pub cors_origin: String,
    pub max_upload_mb: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Document storage API")]
pub struct Args {
    /// Host to bind to (overrides DOCUMENT_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides DOCUMENT_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded files are stored (overrides DOCUMENT_STORE_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<String>,

    /// Database URL (overrides DOCUMENT_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Origin allowed by CORS (overrides DOCUMENT_STORE_CORS_ORIGIN)
    #[arg(long)]
    pub cors_origin: Option<String>,

    /// Maximum upload body size in MiB (overrides DOCUMENT_STORE_MAX_UPLOAD_MB)
    #[arg(long)]
    pub max_upload_mb: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::merge(args, |key| env::var(key))?, migrate))
    }

    /// Merge CLI args over values read through `lookup`, then defaults.
    fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let env_host = lookup("DOCUMENT_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_var(&lookup, "DOCUMENT_STORE_PORT", 8080)?;
        let env_upload_dir =
            lookup("DOCUMENT_STORE_UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into());
        let env_db = lookup("DOCUMENT_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/documents.db".into());
        let env_cors = lookup("DOCUMENT_STORE_CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".into());
        let env_max_upload = parse_var(&lookup, "DOCUMENT_STORE_MAX_UPLOAD_MB", 50)?;

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            upload_dir: args.upload_dir.unwrap_or(env_upload_dir),
            database_url: args.database_url.unwrap_or(env_db),
            cors_origin: args.cors_origin.unwrap_or(env_cors),
            max_upload_mb: args.max_upload_mb.unwrap_or(env_max_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
