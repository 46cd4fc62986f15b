use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::{
    error::RelayResult,
    storage::{BackendLocal, KeyValueStore},
};

pub const BOT_TOKEN_KEY: &str = "remoteBotToken";
pub const CHANNEL_ID_KEY: &str = "remoteChannelId";

const CONFIG_FILE: &str = "config.yaml";
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Bot credentials and target channel. Stored as two plain string keys so
/// an absent key simply reads back as empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    pub bot_token: String,
    pub channel_id: String,
}

impl ChannelConfig {
    pub fn new(bot_token: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            channel_id: channel_id.into(),
        }
    }

    pub fn load(store: &dyn KeyValueStore) -> RelayResult<Self> {
        Ok(Self {
            bot_token: store.get(BOT_TOKEN_KEY)?.unwrap_or_default(),
            channel_id: store.get(CHANNEL_ID_KEY)?.unwrap_or_default(),
        })
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> RelayResult<()> {
        store.set(BOT_TOKEN_KEY, &self.bot_token)?;
        store.set(CHANNEL_ID_KEY, &self.channel_id)?;
        log::info!("saved telegram config for channel {}", self.channel_id);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        !self.bot_token.is_empty() && !self.channel_id.is_empty()
    }

    /// Token with everything but the last four characters hidden.
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.bot_token.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{visible}", "*".repeat(chars.len() - 4))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram_api_base: default_telegram_api_base(),
            base_path: PathBuf::new(),
        }
    }
}

fn default_telegram_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.to_string()
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        let parsed = url::Url::parse(&self.telegram_api_base)
            .with_context(|| format!("telegram_api_base {:?} is not a url", self.telegram_api_base))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "telegram_api_base must be an http(s) url, got {:?}",
                self.telegram_api_base
            );
        }

        Ok(())
    }

    pub fn load_with(base_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let store = BackendLocal::new(base_path.as_ref())?;

        // create new if does not exist
        if store.get(CONFIG_FILE)?.is_none() {
            store.set(CONFIG_FILE, &serde_yml::to_string(&Self::default())?)?;
        }

        let config_str = store
            .get(CONFIG_FILE)?
            .context("config file disappeared while loading")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.as_ref().to_path_buf();
        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = BackendLocal::new(&self.base_path)?;
        store.set(CONFIG_FILE, &serde_yml::to_string(&self)?)?;
        Ok(())
    }
}
