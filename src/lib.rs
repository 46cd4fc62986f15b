pub mod classify;
pub mod config;
pub mod error;
pub mod library;
pub mod metadata;
pub mod storage;
pub mod telegram;
#[cfg(test)]
mod tests;

pub use classify::{classify, embed_url, Platform, VideoSource};
pub use config::{ChannelConfig, Config};
pub use error::{RelayError, RelayResult};
pub use library::{Library, VideoRecord};
pub use storage::{BackendLocal, KeyValueStore, MemoryStore};
pub use telegram::{share_url, NoticeGateway, TelegramGateway};
