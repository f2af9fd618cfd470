use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{collections::HashSet, env, str::FromStr, time::Duration};

const DEFAULT_PAGE_SIZE: u32 = 4;

/// Garment collections served out of the box, with their listing page sizes.
const DEFAULT_CATEGORIES: &str = "blazers:5,casualshirts,dhotis,formalshirts,indians,jackets,\
                                  kurtas,nehrus,rainjackets,sherwanis,suits,sweaters,tshirts";

/// One catalog collection and the page size its listing uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDescriptor {
    pub key: String,
    pub page_size: u32,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub chunk_size: usize,
    pub asset_bucket: String,
    pub max_upload_bytes: usize,
    pub orphan_grace: Duration,
    pub sweep_interval: Option<Duration>,
    pub store_retries: u32,
    pub categories: Vec<CategoryDescriptor>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Catalog and image asset API")]
pub struct Args {
    /// Host to bind to (overrides CATALOG_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CATALOG_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides CATALOG_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Asset chunk size in bytes (overrides CATALOG_CHUNK_SIZE)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Bucket name recorded on stored assets (overrides CATALOG_ASSET_BUCKET)
    #[arg(long)]
    pub asset_bucket: Option<String>,

    /// Largest accepted upload body (overrides CATALOG_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Age after which unlinked or pending assets are swept (overrides CATALOG_ORPHAN_GRACE_SECS)
    #[arg(long)]
    pub orphan_grace_secs: Option<u64>,

    /// Seconds between background sweeps, 0 disables (overrides CATALOG_SWEEP_INTERVAL_SECS)
    #[arg(long)]
    pub sweep_interval_secs: Option<u64>,

    /// Attempts for transient store failures (overrides CATALOG_STORE_RETRIES)
    #[arg(long)]
    pub store_retries: Option<u32>,

    /// Collections as `key[:page_size]`, comma separated (overrides CATALOG_CATEGORIES)
    #[arg(long)]
    pub categories: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("CATALOG_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_number("CATALOG_PORT", 3000u16)?;
        let env_db = env::var("CATALOG_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/catalog.db".into());
        let env_chunk = env_number("CATALOG_CHUNK_SIZE", 255 * 1024usize)?;
        let env_bucket = env::var("CATALOG_ASSET_BUCKET").unwrap_or_else(|_| "uploads".into());
        let env_upload = env_number("CATALOG_MAX_UPLOAD_BYTES", 10 * 1024 * 1024usize)?;
        let env_grace = env_number("CATALOG_ORPHAN_GRACE_SECS", 86_400u64)?;
        let env_sweep = env_number("CATALOG_SWEEP_INTERVAL_SECS", 3_600u64)?;
        let env_retries = env_number("CATALOG_STORE_RETRIES", 3u32)?;
        let env_categories =
            env::var("CATALOG_CATEGORIES").unwrap_or_else(|_| DEFAULT_CATEGORIES.into());

        // --- Merge ---
        let chunk_size = args.chunk_size.unwrap_or(env_chunk);
        if chunk_size == 0 {
            bail!("chunk size must be greater than zero");
        }
        let sweep_secs = args.sweep_interval_secs.unwrap_or(env_sweep);
        let categories = parse_categories(&args.categories.unwrap_or(env_categories))?;

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            chunk_size,
            asset_bucket: args.asset_bucket.unwrap_or(env_bucket),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_upload),
            orphan_grace: Duration::from_secs(args.orphan_grace_secs.unwrap_or(env_grace)),
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            store_retries: args.store_retries.unwrap_or(env_retries).max(1),
            categories,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read a numeric environment variable, falling back to `default` when unset.
fn env_number<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

/// Parse a `key[:page_size]` list such as `jackets:4,blazers:5,suits`.
pub fn parse_categories(raw: &str) -> Result<Vec<CategoryDescriptor>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, page_size) = match entry.split_once(':') {
            Some((key, size)) => {
                let size = size
                    .trim()
                    .parse::<u32>()
                    .with_context(|| format!("page size for category `{}`", key.trim()))?;
                (key.trim(), size)
            }
            None => (entry, DEFAULT_PAGE_SIZE),
        };

        if key.is_empty() {
            bail!("category entry `{}` has an empty key", entry);
        }
        if page_size == 0 {
            bail!("category `{}` must have a page size above zero", key);
        }
        if !seen.insert(key.to_string()) {
            bail!("category `{}` is listed twice", key);
        }

        out.push(CategoryDescriptor {
            key: key.to_string(),
            page_size,
        });
    }

    if out.is_empty() {
        bail!("at least one catalog category must be configured");
    }
    Ok(out)
}
