use std::sync::{Arc, Mutex};

use crate::config::ChannelConfig;
use crate::error::{RelayError, RelayResult};
use crate::library::{Library, VideoRecord, LIBRARY_KEY};
use crate::storage::{BackendLocal, KeyValueStore, MemoryStore};
use crate::telegram::NoticeGateway;

/// Records every call, optionally failing all of them.
#[derive(Default)]
struct FakeGateway {
    retracted: Mutex<Vec<i64>>,
    fail: bool,
}

impl FakeGateway {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn retracted(&self) -> Vec<i64> {
        self.retracted.lock().unwrap().clone()
    }
}

impl NoticeGateway for FakeGateway {
    fn post_notice(&self, _url: &str, _config: &ChannelConfig) -> RelayResult<i64> {
        if self.fail {
            return Err(RelayError::RemoteApi("post rejected".to_string()));
        }
        Ok(1)
    }

    fn retract_notice(&self, message_id: i64, _config: &ChannelConfig) -> RelayResult<()> {
        self.retracted.lock().unwrap().push(message_id);
        if self.fail {
            return Err(RelayError::RemoteApi(
                "Bad Request: message can't be deleted".to_string(),
            ));
        }
        Ok(())
    }
}

/// Store whose writes can be switched off.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    read_only: Mutex<bool>,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> std::io::Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        if *self.read_only.lock().unwrap() {
            return Err(std::io::Error::other("quota exceeded"));
        }
        self.inner.set(key, value)
    }
}

fn create_library(gateway: Arc<FakeGateway>) -> (Library, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    ChannelConfig::new("123:abc", "@videos")
        .save(store.as_ref())
        .unwrap();
    let library = Library::load(store.clone(), gateway).unwrap();
    (library, store)
}

fn ids(library: &Library) -> Vec<String> {
    library.list().iter().map(|v| v.id.clone()).collect()
}

#[test]
pub fn test_add_video_builds_record() {
    let (mut library, _store) = create_library(Arc::new(FakeGateway::default()));

    let record = library
        .add_video("https://youtu.be/dQw4w9WgXcQ", Some(55))
        .unwrap();

    assert_eq!(record.id, "dQw4w9WgXcQ");
    assert_eq!(record.url, "https://youtu.be/dQw4w9WgXcQ");
    assert_eq!(record.title, "YouTube Video dQw4w9WgXcQ");
    assert!(record.thumbnail_url.contains("dQw4w9WgXcQ"));
    assert_eq!(record.remote_message_id, Some(55));
    assert!(chrono::DateTime::parse_from_rfc3339(&record.added_at).is_ok());
}

#[test]
pub fn test_add_video_prepends() {
    let (mut library, _store) = create_library(Arc::new(FakeGateway::default()));

    library.add_video("https://youtu.be/aaaaaaaaaaa", None).unwrap();
    library.add_video("https://vimeo.com/123456", Some(2)).unwrap();
    let last = library
        .add_video("https://example.com/clip.mp4", None)
        .unwrap();

    assert_eq!(library.list()[0], last);
    assert_eq!(
        ids(&library)[1..],
        ["123456".to_string(), "aaaaaaaaaaa".to_string()]
    );
    assert_eq!(library.len(), 3);
}

#[test]
pub fn test_add_duplicate_platform_id() {
    let (mut library, _store) = create_library(Arc::new(FakeGateway::default()));

    library.add_video("https://youtu.be/dQw4w9WgXcQ", None).unwrap();
    let err = library
        .add_video("https://www.youtube.com/watch?v=dQw4w9WgXcQ", None)
        .unwrap_err();

    assert!(matches!(err, RelayError::AlreadyExists(id) if id == "dQw4w9WgXcQ"));
    assert_eq!(library.len(), 1);
}

#[test]
pub fn test_add_unknown_urls_get_distinct_ids() {
    let (mut library, _store) = create_library(Arc::new(FakeGateway::default()));

    for _ in 0..20 {
        library
            .add_video("https://example.com/clip.mp4", None)
            .unwrap();
    }

    let mut unique = ids(&library);
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 20);
}

#[test]
pub fn test_add_invalid_url_leaves_library_unchanged() {
    let (mut library, store) = create_library(Arc::new(FakeGateway::default()));
    library.add_video("https://youtu.be/dQw4w9WgXcQ", None).unwrap();
    let snapshot = store.get(LIBRARY_KEY).unwrap();

    let err = library.add_video("definitely not a url", None).unwrap_err();

    assert!(matches!(err, RelayError::InvalidArgument(_)));
    assert_eq!(library.len(), 1);
    assert_eq!(store.get(LIBRARY_KEY).unwrap(), snapshot);
}

#[test]
pub fn test_add_persist_failure_is_not_partial() {
    let store = Arc::new(FlakyStore::default());
    let mut library = Library::load(store.clone(), Arc::new(FakeGateway::default())).unwrap();
    library.add_video("https://youtu.be/dQw4w9WgXcQ", None).unwrap();

    *store.read_only.lock().unwrap() = true;
    let err = library.add_video("https://vimeo.com/1", None).unwrap_err();

    assert!(matches!(err, RelayError::Persistence(_)));
    assert_eq!(ids(&library), ["dQw4w9WgXcQ"]);
}

#[test]
pub fn test_delete_unknown_id() {
    let gateway = Arc::new(FakeGateway::default());
    let (mut library, _store) = create_library(gateway.clone());
    library.add_video("https://youtu.be/dQw4w9WgXcQ", Some(9)).unwrap();

    let err = library.delete_video("missing").unwrap_err();

    assert!(matches!(err, RelayError::NotFound(id) if id == "missing"));
    assert_eq!(library.len(), 1);
    assert!(gateway.retracted().is_empty());
}

#[test]
pub fn test_delete_retracts_remote_message() {
    let gateway = Arc::new(FakeGateway::default());
    let (mut library, store) = create_library(gateway.clone());
    library.add_video("https://youtu.be/dQw4w9WgXcQ", Some(9)).unwrap();
    library.add_video("https://vimeo.com/42", Some(10)).unwrap();

    library.delete_video("dQw4w9WgXcQ").unwrap();

    assert_eq!(gateway.retracted(), [9]);
    assert_eq!(ids(&library), ["42"]);

    let saved: Vec<VideoRecord> =
        serde_json::from_str(&store.get(LIBRARY_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(saved, library.list());
}

#[test]
pub fn test_delete_without_remote_message_skips_gateway() {
    let gateway = Arc::new(FakeGateway::failing());
    let (mut library, _store) = create_library(gateway.clone());
    library.add_video("https://youtu.be/dQw4w9WgXcQ", None).unwrap();

    library.delete_video("dQw4w9WgXcQ").unwrap();

    assert!(library.is_empty());
    assert!(gateway.retracted().is_empty());
}

#[test]
pub fn test_delete_keeps_record_when_retract_fails() {
    let gateway = Arc::new(FakeGateway::failing());
    let (mut library, store) = create_library(gateway.clone());
    library.add_video("https://youtu.be/dQw4w9WgXcQ", Some(9)).unwrap();
    let snapshot = store.get(LIBRARY_KEY).unwrap();

    let err = library.delete_video("dQw4w9WgXcQ").unwrap_err();

    assert!(matches!(err, RelayError::RemoteApi(_)));
    assert_eq!(gateway.retracted(), [9]);
    assert!(library.contains("dQw4w9WgXcQ"));
    assert_eq!(store.get(LIBRARY_KEY).unwrap(), snapshot);
}

#[test]
pub fn test_delete_requires_channel_config() {
    let gateway = Arc::new(FakeGateway::default());
    let store = Arc::new(MemoryStore::new());
    let mut library = Library::load(store, gateway.clone()).unwrap();
    library.add_video("https://youtu.be/dQw4w9WgXcQ", Some(9)).unwrap();

    let err = library.delete_video("dQw4w9WgXcQ").unwrap_err();

    assert!(matches!(err, RelayError::ConfigMissing));
    assert!(gateway.retracted().is_empty());
    assert_eq!(library.len(), 1);
}

#[test]
pub fn test_reload_round_trip() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let gateway = Arc::new(FakeGateway::default());

    let before = {
        let store = Arc::new(BackendLocal::new(tmp.path()).unwrap());
        let mut library = Library::load(store, gateway.clone()).unwrap();
        library.add_video("https://youtu.be/dQw4w9WgXcQ", Some(3)).unwrap();
        library.add_video("https://vimeo.com/76979871", None).unwrap();
        library
            .add_video("https://example.com/watch/1", Some(4))
            .unwrap();
        library.list().to_vec()
    };

    let store = Arc::new(BackendLocal::new(tmp.path()).unwrap());
    let library = Library::load(store, gateway).unwrap();

    assert_eq!(library.list(), before.as_slice());
}

#[test]
pub fn test_persisted_format() {
    let (mut library, store) = create_library(Arc::new(FakeGateway::default()));
    library.add_video("https://youtu.be/dQw4w9WgXcQ", None).unwrap();
    library.add_video("https://vimeo.com/42", Some(8)).unwrap();

    let raw = store.get(LIBRARY_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let items = value.as_array().unwrap();

    assert_eq!(items[0]["id"], "42");
    assert_eq!(items[0]["remoteMessageId"], 8);
    assert!(items[0]["thumbnailUrl"].is_string());
    assert!(items[0]["addedAt"].is_string());
    assert!(items[1].get("remoteMessageId").is_none());
}

#[test]
pub fn test_load_corrupt_library() {
    let store = Arc::new(MemoryStore::new());
    store.set(LIBRARY_KEY, "{not json").unwrap();

    let err = Library::load(store, Arc::new(FakeGateway::default()))
        .err()
        .unwrap();

    assert!(matches!(err, RelayError::Persistence(_)));
}

/// Gateway whose retraction succeeds but leaves the store unwritable.
struct LockingGateway {
    store: Arc<FlakyStore>,
}

impl NoticeGateway for LockingGateway {
    fn post_notice(&self, _url: &str, _config: &ChannelConfig) -> RelayResult<i64> {
        Ok(1)
    }

    fn retract_notice(&self, _message_id: i64, _config: &ChannelConfig) -> RelayResult<()> {
        *self.store.read_only.lock().unwrap() = true;
        Ok(())
    }
}

#[test]
pub fn test_delete_persist_failure_after_retract() {
    let store = Arc::new(FlakyStore::default());
    ChannelConfig::new("123:abc", "@videos")
        .save(store.as_ref())
        .unwrap();
    let gateway = Arc::new(LockingGateway {
        store: store.clone(),
    });
    let mut library = Library::load(store.clone(), gateway).unwrap();
    library.add_video("https://youtu.be/dQw4w9WgXcQ", Some(9)).unwrap();

    let err = library.delete_video("dQw4w9WgXcQ").unwrap_err();

    assert!(matches!(err, RelayError::Persistence(_)));
    let record = library.get("dQw4w9WgXcQ").unwrap();
    assert_eq!(record.remote_message_id, Some(9));
}
