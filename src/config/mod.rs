use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the remote assistant endpoint
    pub base_url: String,

    /// Data directory holding the persisted session token
    pub data_dir: PathBuf,

    /// Seed assistant greeting shown in a fresh conversation
    pub greeting: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            data_dir: default_data_dir(),
            greeting: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("backchat"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

impl Config {
    /// Initialize configuration: defaults, then config file, then environment.
    pub async fn init() -> Result<Self> {
        debug!("Initializing configuration");

        let mut config = match Self::load_from_file().await {
            Ok(file_config) => file_config,
            Err(_) => Self::default(),
        };

        config.load_from_env();

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn load_from_env(&mut self) {
        self.apply_env_overrides(
            std::env::var("BACKCHAT_BASE_URL").ok(),
            std::env::var("BACKCHAT_DATA_DIR").ok(),
            std::env::var("BACKCHAT_GREETING").ok(),
        );
    }

    fn apply_env_overrides(
        &mut self,
        base_url: Option<String>,
        data_dir: Option<String>,
        greeting: Option<String>,
    ) {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }

        if let Some(data_dir) = data_dir {
            self.data_dir = PathBuf::from(data_dir);
        }

        if let Some(greeting) = greeting {
            self.greeting = Some(greeting);
        }
    }

    /// Load configuration from backchat.json files
    ///
    /// Probed in order:
    /// 1. ./.backchat.json
    /// 2. ./backchat.json
    /// 3. $CONFIG_DIR/backchat/backchat.json
    pub async fn load_from_file() -> Result<Self> {
        let mut config_paths = vec![
            PathBuf::from("./.backchat.json"),
            PathBuf::from("./backchat.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            config_paths.push(config_dir.join("backchat").join("backchat.json"));
        }

        for path in config_paths {
            if path.exists() {
                debug!("Loading configuration from: {}", path.display());
                let content = tokio::fs::read_to_string(&path).await?;
                let config: Self = serde_json::from_str(&content)?;
                return Ok(config);
            }
        }

        Err(anyhow::anyhow!("No configuration file found"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow::anyhow!("base_url is required"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            ));
        }

        Ok(())
    }
}
