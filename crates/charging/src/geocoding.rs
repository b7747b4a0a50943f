//! Reverse geocoding seam, plus an optional coordinate-keyed cache.

use std::{
    collections::HashMap,
    error, fmt, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use utility::geo;

#[derive(Debug, Clone)]
pub enum GeocodeError {
    Request(Arc<reqwest::Error>),
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
    },
    Malformed(Arc<serde_json::Error>),
    /// The service answered, but there is no settlement at this position.
    NoPlace,
    Timeout,
}

impl error::Error for GeocodeError {}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "HTTP request error: {}", e),
            Self::InvalidResponse { status_code, url } => {
                write!(f, "Invalid Response ({}) {}", status_code, url)
            }
            Self::Malformed(e) => write!(f, "JSON parse error: {}", e),
            Self::NoPlace => write!(f, "no place found at this position"),
            Self::Timeout => write!(f, "lookup timed out"),
        }
    }
}

impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(Arc::new(e))
        }
    }
}

impl From<serde_json::Error> for GeocodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(Arc::new(e))
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves a coordinate to a city name.
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError>;

    /// Persists any state the geocoder keeps between runs.
    async fn flush(&self) {}
}

#[async_trait]
impl<G> Geocoder for Arc<G>
where
    G: Geocoder + ?Sized,
{
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        (**self).reverse(latitude, longitude).await
    }

    async fn flush(&self) {
        (**self).flush().await
    }
}

#[async_trait]
impl<G> Geocoder for Box<G>
where
    G: Geocoder + ?Sized,
{
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        (**self).reverse(latitude, longitude).await
    }

    async fn flush(&self) {
        (**self).flush().await
    }
}

/// Resolves nothing. Every station falls back to the unknown city.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGeocoder;

#[async_trait]
impl Geocoder for NullGeocoder {
    async fn reverse(&self, _: f64, _: f64) -> Result<String, GeocodeError> {
        Err(GeocodeError::NoPlace)
    }
}

#[derive(Debug)]
pub enum CacheError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl error::Error for CacheError {}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "geocode cache io error: {}", e),
            Self::Json(e) => write!(f, "geocode cache is not valid json: {}", e),
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Wraps a geocoder and remembers successful lookups per ~100 m cell.
pub struct CachedGeocoder<G> {
    inner: G,
    entries: Mutex<HashMap<String, String>>,
    unsaved: Mutex<usize>,
    path: Option<PathBuf>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub const KEY_DECIMALS: usize = 3;
    pub const SAVE_EVERY: usize = 50;

    pub fn new(inner: G) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
            unsaved: Mutex::new(0),
            path: None,
        }
    }

    /// Backs the cache with a JSON file. A missing file starts an empty cache.
    pub async fn with_file<P: AsRef<Path>>(inner: G, path: P) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<HashMap<String, String>>(&bytes)?,
            Err(why) if why.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(why) => return Err(why.into()),
        };
        log::info!(
            "loaded {} cached geocode entries from {}",
            entries.len(),
            path.display()
        );
        Ok(Self {
            inner,
            entries: Mutex::new(entries),
            unsaved: Mutex::new(0),
            path: Some(path),
        })
    }

    pub fn key(latitude: f64, longitude: f64) -> String {
        geo::coordinate_key(latitude, longitude, Self::KEY_DECIMALS)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Writes the cache file, if there is one.
    pub async fn save(&self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(&*self.entries.lock().await)?;
        tokio::fs::write(path, json).await?;
        *self.unsaved.lock().await = 0;
        Ok(())
    }

    async fn save_logged(&self) {
        if let Err(why) = self.save().await {
            log::warn!("failed to save geocode cache: {why}");
        }
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        let key = Self::key(latitude, longitude);
        if let Some(city) = self.entries.lock().await.get(&key) {
            return Ok(city.clone());
        }

        let city = self.inner.reverse(latitude, longitude).await?;
        self.entries.lock().await.insert(key, city.clone());

        let should_save = {
            let mut unsaved = self.unsaved.lock().await;
            *unsaved += 1;
            *unsaved >= Self::SAVE_EVERY
        };
        if should_save {
            self.save_logged().await;
        }
        Ok(city)
    }

    async fn flush(&self) {
        self.save_logged().await;
        self.inner.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingGeocoder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn reverse(&self, latitude: f64, _: f64) -> Result<String, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if latitude < 0.0 {
                Err(GeocodeError::NoPlace)
            } else {
                Ok("Shanghai".to_owned())
            }
        }
    }

    #[tokio::test]
    async fn nearby_coordinates_share_a_cache_entry() {
        let inner = Arc::new(CountingGeocoder::default());
        let cached = CachedGeocoder::new(inner.clone());

        assert_eq!(cached.reverse(31.23041, 121.47371).await.unwrap(), "Shanghai");
        assert_eq!(cached.reverse(31.23039, 121.47369).await.unwrap(), "Shanghai");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.len().await, 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let inner = Arc::new(CountingGeocoder::default());
        let cached = CachedGeocoder::new(inner.clone());

        assert!(cached.reverse(-1.0, 1.0).await.is_err());
        assert!(cached.reverse(-1.0, 1.0).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert!(cached.is_empty().await);
    }

    #[tokio::test]
    async fn cache_file_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geocode_cache.json");

        let first = CachedGeocoder::with_file(CountingGeocoder::default(), &path)
            .await
            .unwrap();
        first.reverse(39.9042, 116.4074).await.unwrap();
        first.flush().await;

        let inner = Arc::new(CountingGeocoder::default());
        let second = CachedGeocoder::with_file(inner.clone(), &path).await.unwrap();
        assert_eq!(second.reverse(39.9042, 116.4074).await.unwrap(), "Shanghai");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cache_file_is_written_every_few_lookups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geocode_cache.json");
        let cached = CachedGeocoder::with_file(CountingGeocoder::default(), &path)
            .await
            .unwrap();
        let save_every = CachedGeocoder::<CountingGeocoder>::SAVE_EVERY;

        for n in 0..save_every - 1 {
            cached.reverse(n as f64 * 0.01, 121.0).await.unwrap();
        }
        assert!(!path.exists());

        cached.reverse(89.0, 121.0).await.unwrap();
        let bytes = tokio::fs::read(&path).await.unwrap();
        let saved: HashMap<String, String> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(saved.len(), save_every);
    }

    #[tokio::test]
    async fn corrupt_cache_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geocode_cache.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let result = CachedGeocoder::with_file(CountingGeocoder::default(), &path).await;
        assert!(matches!(result, Err(CacheError::Json(_))));
    }
}
