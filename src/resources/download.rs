use std::path::PathBuf;

#[cfg(not(target_arch = "wasm32"))]
use anyhow::Context as _;

/// Download utility used by the [`crate::resources::AssetLoader`].
#[allow(async_fn_in_trait)]
pub trait Downloader {
    /// Fetches the whole resource into memory.
    async fn fetch_as_buffer(&self, url: &str) -> anyhow::Result<Vec<u8>>;

    /// Makes the resource available as a local path the engine can stream from.
    async fn fetch_as_local_path(&self, url: &str) -> anyhow::Result<PathBuf>;
}

/// Serves assets from a directory on disk.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Clone, Debug)]
pub struct LocalAssets {
    root: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl LocalAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        self.root.join(url.trim_start_matches('/'))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Downloader for LocalAssets {
    async fn fetch_as_buffer(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.resolve(url);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("could not read {}", path.display()))
    }

    async fn fetch_as_local_path(&self, url: &str) -> anyhow::Result<PathBuf> {
        let path = self.resolve(url);
        let exists = tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("could not stat {}", path.display()))?;
        if !exists {
            anyhow::bail!("{} does not exist", path.display());
        }
        Ok(path)
    }
}

/// Fetches assets over HTTP. Relative URLs are resolved against the page origin.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Debug, Default)]
pub struct HttpAssets;

#[cfg(target_arch = "wasm32")]
fn format_url(url: &str) -> anyhow::Result<reqwest::Url> {
    if let Ok(absolute) = reqwest::Url::parse(url) {
        return Ok(absolute);
    }
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window available"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("could not read page origin: {:?}", e))?;
    let base = reqwest::Url::parse(&format!("{}/", origin))?;
    Ok(base.join(url.trim_start_matches('/'))?)
}

#[cfg(target_arch = "wasm32")]
impl Downloader for HttpAssets {
    async fn fetch_as_buffer(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let url = format_url(url)?;
        let data = reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec();
        Ok(data)
    }

    // Browsers stream media straight from the URL, there is no local copy.
    async fn fetch_as_local_path(&self, url: &str) -> anyhow::Result<PathBuf> {
        Ok(PathBuf::from(format_url(url)?.as_str()))
    }
}
