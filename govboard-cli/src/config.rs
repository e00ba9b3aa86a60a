use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use govboard_core::{RateLimitConfig, SyncSettings};
use govboard_sources::{CollectorConfig, KoiosConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const DIR_NAME: &str = ".govboard";
const LOCAL_FILE: &str = "govboard.toml";

/// Load environment variables from .env files
///
/// Priority order (highest to lowest):
/// 1. Variables already set in the environment
/// 2. Current directory .env
/// 3. ~/.govboard/.env
pub fn load_dotenv() {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded .env from current directory: {}", path.display());
        loaded_from.push(path);
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            // dotenvy never overwrites variables that are already set
            match dotenvy::from_path(&env_file) {
                Ok(()) => {
                    debug!("Loaded .env from {}", env_file.display());
                    loaded_from.push(env_file);
                }
                Err(e) => warn!("Failed to load {}: {}", env_file.display(), e),
            }
        }
    }

    if loaded_from.is_empty() {
        debug!("No .env files found (current dir or ~/.govboard)");
    }
}

/// The govboard config directory (~/.govboard)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DIR_NAME))
}

// ============================================================================
// TOML Configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GovboardConfig {
    #[serde(default)]
    pub koios: KoiosSection,

    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub github: GithubSection,

    #[serde(default)]
    pub npm: NpmSection,

    #[serde(default)]
    pub geo: GeoSection,

    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KoiosSection {
    #[serde(default = "default_koios_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Rows per list page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Ids per bulk info request
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for KoiosSection {
    fn default() -> Self {
        Self {
            base_url: default_koios_url(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            chunk_size: default_chunk_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_recent_epochs")]
    pub recent_epochs: u32,

    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            recent_epochs: default_recent_epochs(),
            enrich_concurrency: default_enrich_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSection {
    /// Prefixed to repos given without an owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default)]
    pub repos: Vec<String>,

    /// Defaults to the local API server's ingest route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingest_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_ids_url: Option<String>,

    #[serde(default = "default_collector_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    #[serde(default = "default_min_rate_limit_remaining")]
    pub min_rate_limit_remaining: u64,
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            owner: None,
            repos: Vec::new(),
            ingest_url: None,
            existing_ids_url: None,
            batch_size: default_collector_batch_size(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            batch_delay_ms: default_batch_delay_ms(),
            min_rate_limit_remaining: default_min_rate_limit_remaining(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NpmSection {
    #[serde(default)]
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoSection {
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for GeoSection {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    #[serde(default)]
    pub cors_permissive: bool,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_permissive: false,
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

// Default value functions for serde. Library defaults stay the source of truth.
fn default_koios_url() -> String {
    KoiosConfig::default().base_url
}

fn default_timeout_secs() -> u64 {
    KoiosConfig::default().timeout_secs
}

fn default_page_size() -> usize {
    SyncSettings::default().page_size
}

fn default_page_delay_ms() -> u64 {
    SyncSettings::default().page_delay_ms
}

fn default_chunk_size() -> usize {
    SyncSettings::default().chunk_size
}

fn default_recent_epochs() -> u32 {
    SyncSettings::default().recent_epochs
}

fn default_enrich_concurrency() -> usize {
    SyncSettings::default().enrich_concurrency
}

fn default_collector_batch_size() -> usize {
    CollectorConfig::new("", "").batch_size
}

fn default_max_retries() -> u32 {
    CollectorConfig::new("", "").max_retries
}

fn default_retry_delay_ms() -> u64 {
    CollectorConfig::new("", "").retry_delay_ms
}

fn default_batch_delay_ms() -> u64 {
    CollectorConfig::new("", "").batch_delay_ms
}

fn default_min_rate_limit_remaining() -> u64 {
    CollectorConfig::new("", "").min_rate_limit_remaining
}

fn default_min_delay_ms() -> u64 {
    millis(RateLimitConfig::default().min_delay)
}

fn default_initial_backoff_ms() -> u64 {
    millis(RateLimitConfig::default().initial_backoff)
}

fn default_max_backoff_ms() -> u64 {
    millis(RateLimitConfig::default().max_backoff)
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3030))
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl GovboardConfig {
    /// Load config from TOML files
    ///
    /// Priority order (highest to lowest):
    /// 1. ./govboard.toml (project-specific)
    /// 2. ~/.govboard/config.toml (user defaults)
    /// 3. Built-in defaults
    ///
    /// Unreadable or malformed files are skipped with a warning.
    pub fn load() -> Self {
        let global = config_dir().map(|dir| dir.join("config.toml"));
        Self::load_from(global.as_deref(), Path::new(LOCAL_FILE))
    }

    pub fn load_from(global: Option<&Path>, local: &Path) -> Self {
        let mut merged = toml::Table::new();
        for path in global.into_iter().chain(std::iter::once(local)) {
            if let Some(table) = read_table(path) {
                merge_tables(&mut merged, table);
            }
        }

        match toml::Value::Table(merged).try_into::<GovboardConfig>() {
            Ok(config) => config,
            Err(e) => {
                warn!("Invalid configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            recent_epochs: self.sync.recent_epochs,
            page_size: self.koios.page_size,
            page_delay_ms: self.koios.page_delay_ms,
            chunk_size: self.koios.chunk_size,
            enrich_concurrency: self.sync.enrich_concurrency,
        }
    }

    pub fn koios_config(&self) -> KoiosConfig {
        KoiosConfig {
            base_url: self.koios.base_url.clone(),
            timeout_secs: self.koios.timeout_secs,
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            min_delay: Duration::from_millis(self.geo.min_delay_ms),
            initial_backoff: Duration::from_millis(self.geo.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.geo.max_backoff_ms),
        }
    }

    /// Collector endpoints default to the API server on `server.bind`.
    pub fn collector_config(&self) -> CollectorConfig {
        let base = format!("http://{}", self.server.bind);
        let github = &self.github;
        CollectorConfig {
            existing_ids_url: github
                .existing_ids_url
                .clone()
                .unwrap_or_else(|| format!("{base}/api/github/existing-ids")),
            ingest_url: github
                .ingest_url
                .clone()
                .unwrap_or_else(|| format!("{base}/api/github/ingest")),
            batch_size: github.batch_size,
            max_retries: github.max_retries,
            retry_delay_ms: github.retry_delay_ms,
            batch_delay_ms: github.batch_delay_ms,
            min_rate_limit_remaining: github.min_rate_limit_remaining,
        }
    }

    /// Repos from the command line, or the configured list, as owner/name.
    pub fn github_repos(&self, requested: &[String]) -> Result<Vec<String>> {
        let repos: &[String] = if requested.is_empty() { &self.github.repos } else { requested };
        if repos.is_empty() {
            bail!("no repositories given; pass --repo or set [github].repos");
        }

        repos
            .iter()
            .map(|repo| match (repo.contains('/'), self.github.owner.as_deref()) {
                (true, _) => Ok(repo.clone()),
                (false, Some(owner)) => Ok(format!("{owner}/{repo}")),
                (false, None) => bail!("'{repo}' has no owner; use owner/name or set [github].owner"),
            })
            .collect()
    }

    pub fn npm_packages(&self, requested: &[String]) -> Result<Vec<String>> {
        let packages: &[String] = if requested.is_empty() { &self.npm.packages } else { requested };
        if packages.is_empty() {
            bail!("no packages given; pass --package or set [npm].packages");
        }
        Ok(packages.to_vec())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

fn read_table(path: &Path) -> Option<toml::Table> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };
    match contents.parse::<toml::Table>() {
        Ok(table) => {
            info!("Loaded config from {}", path.display());
            Some(table)
        }
        Err(e) => {
            warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

/// Key-by-key merge; overlay wins on scalars and arrays.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

// ============================================================================
// `govboard config`
// ============================================================================

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config directory
    Path,
}

pub fn run_config(args: ConfigArgs, config: &GovboardConfig) -> Result<()> {
    match args.command {
        ConfigCommand::Show => print!("{}", config.to_toml()?),
        ConfigCommand::Path => {
            let dir = config_dir().context("Could not determine home directory")?;
            println!("{}", dir.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_config_dir_returns_path() {
        if let Some(path) = config_dir() {
            assert!(path.ends_with(".govboard"));
        }
    }

    #[test]
    fn test_defaults() {
        let config = GovboardConfig::default();
        assert_eq!(config.sync.recent_epochs, 5);
        assert_eq!(config.sync.enrich_concurrency, 1);
        assert_eq!(config.server.cache_ttl_secs, 600);
        assert_eq!(config.server.bind.to_string(), "127.0.0.1:3030");
        assert_eq!(config.rate_limit_config(), RateLimitConfig::default());
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = GovboardConfig::load_from(
            Some(&dir.path().join("nope.toml")),
            &dir.path().join("govboard.toml"),
        );
        assert_eq!(config.koios.base_url, KoiosConfig::default().base_url);
    }

    #[test]
    fn test_local_overrides_global_per_key() {
        let dir = TempDir::new().unwrap();
        let global = write(
            &dir,
            "config.toml",
            "[koios]\nbase_url = \"https://preprod.koios.rest/api/v1\"\npage_size = 500\n\n[npm]\npackages = [\"a\"]\n",
        );
        let local = write(&dir, "govboard.toml", "[koios]\npage_size = 250\n");

        let config = GovboardConfig::load_from(Some(&global), &local);
        assert_eq!(config.koios.base_url, "https://preprod.koios.rest/api/v1");
        assert_eq!(config.koios.page_size, 250);
        assert_eq!(config.npm.packages, vec!["a"]);
        assert_eq!(config.sync_settings().page_size, 250);
    }

    #[test]
    fn test_malformed_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let global = write(&dir, "config.toml", "[sync]\nrecent_epochs = 9\n");
        let local = write(&dir, "govboard.toml", "[sync\nbroken");

        let config = GovboardConfig::load_from(Some(&global), &local);
        assert_eq!(config.sync.recent_epochs, 9);
    }

    #[test]
    fn test_collector_urls_default_to_local_server() {
        let mut config = GovboardConfig::default();
        config.server.bind = "127.0.0.1:8080".parse().unwrap();

        let collector = config.collector_config();
        assert_eq!(collector.ingest_url, "http://127.0.0.1:8080/api/github/ingest");
        assert_eq!(
            collector.existing_ids_url,
            "http://127.0.0.1:8080/api/github/existing-ids"
        );

        config.github.ingest_url = Some("https://dash.example/api/github/ingest".into());
        assert_eq!(
            config.collector_config().ingest_url,
            "https://dash.example/api/github/ingest"
        );
    }

    #[test]
    fn test_github_repos_use_owner() {
        let mut config = GovboardConfig::default();
        assert!(config.github_repos(&[]).is_err());
        assert!(config.github_repos(&["mesh".into()]).is_err());

        config.github.owner = Some("MeshJS".into());
        config.github.repos = vec!["mesh".into(), "other/tool".into()];
        assert_eq!(
            config.github_repos(&[]).unwrap(),
            vec!["MeshJS/mesh", "other/tool"]
        );
        assert_eq!(
            config.github_repos(&["web3-sdk".into()]).unwrap(),
            vec!["MeshJS/web3-sdk"]
        );
    }

    #[test]
    fn test_show_round_trips_through_toml() {
        let mut config = GovboardConfig::default();
        config.npm.packages = vec!["@meshsdk/core".into()];
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[server]"));
        let parsed: GovboardConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.npm.packages, config.npm.packages);
    }
}
