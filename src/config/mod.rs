use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub web: WebConfig,
    pub provider: ProviderConfig,
    pub playlist: PlaylistConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

/// IPTV provider account and endpoint settings.
///
/// Credentials are never shipped hardcoded; the checked-in defaults are
/// placeholders and the environment overrides in [`Config::load`] are the
/// supported way to inject real values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider, e.g. `http://main.cdnfs.top:80`
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Hostname fragments identifying URLs that need credential injection
    pub host_markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistConfig {
    /// Remote playlist URL used by the import and parse endpoints
    pub url: String,
    /// Local playlist file used by the import-local endpoint
    pub local_path: PathBuf,
    /// Cap per content type on local imports
    pub max_items_per_type: usize,
    /// Placeholder episodes synthesized per imported series
    pub episodes_per_series: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Known-good HLS stream returned when an upstream fetch fails
    pub fallback_stream_url: String,
    pub manifest_timeout_secs: u64,
    pub segment_timeout_secs: u64,
    pub resolver_timeout_secs: u64,
    /// Ceilings guarding manifest rewriting against pathological inputs
    pub max_manifest_bytes: usize,
    pub max_manifest_lines: usize,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            provider: ProviderConfig {
                base_url: "http://main.cdnfs.top:80".to_string(),
                username: "changeme".to_string(),
                password: "changeme".to_string(),
                host_markers: vec!["main.cdnfs.top".to_string(), "iptv-org".to_string()],
            },
            playlist: PlaylistConfig {
                url: "http://main.cdnfs.top:80/get.php?type=m3u&output=hls".to_string(),
                local_path: PathBuf::from("./data/playlist.m3u"),
                max_items_per_type: 500,
                episodes_per_series: 5,
            },
            proxy: ProxyConfig {
                fallback_stream_url:
                    "https://demo.unified-streaming.com/k8s/features/stable/video/tears-of-steel/tears-of-steel.ism/.m3u8"
                        .to_string(),
                manifest_timeout_secs: 10,
                segment_timeout_secs: 30,
                resolver_timeout_secs: 10,
                max_manifest_bytes: 2 * 1024 * 1024,
                max_manifest_lines: 20_000,
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                    .to_string(),
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        let mut config = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            toml::from_str(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::create_dir_all("./data")?;
            std::fs::write(&config_file, contents)?;
            default_config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment always wins over file contents for secrets and the
    /// playlist location, so deployments never rely on checked-in values.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("STREAMVAULT_PLAYLIST_URL") {
            self.playlist.url = url;
        }
        if let Ok(base) = std::env::var("STREAMVAULT_PROVIDER_URL") {
            self.provider.base_url = base;
        }
        if let Ok(username) = std::env::var("STREAMVAULT_PROVIDER_USERNAME") {
            self.provider.username = username;
        }
        if let Ok(password) = std::env::var("STREAMVAULT_PROVIDER_PASSWORD") {
            self.provider.password = password;
        }
    }

    /// Origin used as the Referer on upstream stream requests.
    pub fn provider_referer(&self) -> String {
        match url::Url::parse(&self.provider.base_url) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) => format!("{}://{}/", parsed.scheme(), host),
                None => self.provider.base_url.clone(),
            },
            Err(_) => self.provider.base_url.clone(),
        }
    }
}
