use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

static YOUTUBE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
    )
    .expect("Failed to compile YouTube regex")
});

static VIMEO_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"vimeo\.com/(?:video/)?(\d+)").expect("Failed to compile Vimeo regex")
});

const FALLBACK_ID_LEN: usize = 9;
const FALLBACK_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    Vimeo,
    Unknown,
}

impl Platform {
    pub fn is_known(&self) -> bool {
        !matches!(self, Platform::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSource {
    pub id: String,
    pub platform: Platform,
}

fn capture(re: &Regex, url: &str) -> Option<String> {
    re.captures(url)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_owned()))
}

/// Identify the hosting platform of `url` and extract its video id.
///
/// YouTube is tried before Vimeo and the first match wins. Anything else is
/// `Platform::Unknown` with a freshly generated random id, so two calls on
/// the same unknown URL will usually disagree.
pub fn classify(url: &str) -> VideoSource {
    if let Some(id) = capture(&YOUTUBE_REGEX, url) {
        return VideoSource {
            id,
            platform: Platform::YouTube,
        };
    }

    if let Some(id) = capture(&VIMEO_REGEX, url) {
        return VideoSource {
            id,
            platform: Platform::Vimeo,
        };
    }

    VideoSource {
        id: random_id(),
        platform: Platform::Unknown,
    }
}

/// Lowercase base-36 token used when a URL carries no recognizable id.
pub fn random_id() -> String {
    let mut rng = rand::rng();
    (0..FALLBACK_ID_LEN)
        .map(|_| FALLBACK_ID_ALPHABET[rng.random_range(0..FALLBACK_ID_ALPHABET.len())] as char)
        .collect()
}

/// Player URL suitable for inline playback; unknown links are returned as is.
pub fn embed_url(url: &str) -> String {
    if let Some(id) = capture(&YOUTUBE_REGEX, url) {
        return format!("https://www.youtube.com/embed/{id}?autoplay=1");
    }
    if let Some(id) = capture(&VIMEO_REGEX, url) {
        return format!("https://player.vimeo.com/video/{id}?autoplay=1");
    }
    url.to_string()
}
