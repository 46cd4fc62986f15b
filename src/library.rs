use std::{sync::Arc, time::Instant};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    classify::{self, VideoSource},
    config::ChannelConfig,
    error::{RelayError, RelayResult},
    metadata,
    storage::KeyValueStore,
    telegram::NoticeGateway,
};

pub const LIBRARY_KEY: &str = "videoLibrary";

const MAX_ID_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub thumbnail_url: String,
    pub added_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_message_id: Option<i64>,
}

/// The video collection, newest first, mirrored to `LIBRARY_KEY` after
/// every mutation.
///
/// Mutations take `&mut self`, so one `Library` can't interleave two adds or
/// deletes. Two `Library` values over the same store still overwrite each
/// other's snapshots.
pub struct Library {
    store: Arc<dyn KeyValueStore>,
    gateway: Arc<dyn NoticeGateway>,
    videos: Vec<VideoRecord>,
}

impl Library {
    /// Hydrate from `store`. A missing key is an empty library.
    pub fn load(
        store: Arc<dyn KeyValueStore>,
        gateway: Arc<dyn NoticeGateway>,
    ) -> RelayResult<Self> {
        let now = Instant::now();

        let videos = match store.get(LIBRARY_KEY)? {
            Some(raw) => serde_json::from_str::<Vec<VideoRecord>>(&raw)?,
            None => {
                log::info!("no saved library, starting empty");
                Vec::new()
            }
        };

        log::debug!(
            "took {}ms to load {} videos",
            now.elapsed().as_micros() as f64 / 1000.0,
            videos.len()
        );

        Ok(Self {
            store,
            gateway,
            videos,
        })
    }

    pub fn list(&self) -> &[VideoRecord] {
        &self.videos
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&VideoRecord> {
        self.videos.iter().find(|v| v.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn channel_config(&self) -> RelayResult<ChannelConfig> {
        ChannelConfig::load(self.store.as_ref())
    }

    pub fn save_channel_config(&self, config: &ChannelConfig) -> RelayResult<()> {
        config.save(self.store.as_ref())
    }

    fn persist(&self, videos: &[VideoRecord]) -> RelayResult<()> {
        let raw = serde_json::to_string(videos)?;
        self.store.set(LIBRARY_KEY, &raw)?;
        Ok(())
    }

    /// Classify the url, pick an id that isn't taken yet. Random fallback ids
    /// are redrawn on collision; a taken platform id is an error.
    fn unique_source(&self, url: &str) -> RelayResult<VideoSource> {
        let mut source = classify::classify(url);

        if source.platform.is_known() {
            if self.contains(&source.id) {
                return Err(RelayError::AlreadyExists(source.id));
            }
            return Ok(source);
        }

        for _ in 0..MAX_ID_ATTEMPTS {
            if !self.contains(&source.id) {
                return Ok(source);
            }
            log::debug!("random id {} already taken, drawing again", source.id);
            source.id = classify::random_id();
        }

        Err(RelayError::AlreadyExists(source.id))
    }

    /// Build a record for `url` and put it at the front of the library.
    ///
    /// Never talks to the channel; `remote_message_id` is whatever the
    /// caller got back from posting the notice. The collection is left
    /// untouched if anything fails.
    pub fn add_video(
        &mut self,
        url: &str,
        remote_message_id: Option<i64>,
    ) -> RelayResult<VideoRecord> {
        let source = self.unique_source(url)?;
        let meta = metadata::synthesize(url, &source)?;

        let record = VideoRecord {
            id: source.id,
            url: url.to_string(),
            title: meta.title,
            thumbnail_url: meta.thumbnail_url,
            added_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            remote_message_id,
        };

        let mut videos = Vec::with_capacity(self.videos.len() + 1);
        videos.push(record.clone());
        videos.extend(self.videos.iter().cloned());

        self.persist(&videos)?;
        self.videos = videos;

        log::info!("added video {} ({})", record.id, record.url);
        Ok(record)
    }

    /// Remove a video, retracting its channel message first when it has one.
    /// If the retraction fails the record stays.
    pub fn delete_video(&mut self, id: &str) -> RelayResult<()> {
        let record = self
            .get(id)
            .ok_or_else(|| RelayError::NotFound(id.to_string()))?;

        if let Some(message_id) = record.remote_message_id {
            let config = self.channel_config()?;
            if !config.is_complete() {
                return Err(RelayError::ConfigMissing);
            }
            self.gateway.retract_notice(message_id, &config)?;
        }
        let retracted = record.remote_message_id;

        let videos: Vec<VideoRecord> = self
            .videos
            .iter()
            .filter(|v| v.id != id)
            .cloned()
            .collect();

        self.persist(&videos).inspect_err(|err| {
            if let Some(message_id) = retracted {
                log::error!(
                    "message {message_id} was retracted but video {id} could not be removed: {err}"
                );
            }
        })?;
        self.videos = videos;

        log::info!("deleted video {id}");
        Ok(())
    }
}
