use std::{cell::RefCell, fmt, path::PathBuf, rc::Rc};

use futures::{
    FutureExt,
    future::{LocalBoxFuture, Shared},
};
use instant::{Duration, Instant};

use crate::{context::AssetManifest, error::ArError};

/**
 * This module contains all logic for staging the session's assets from external sources.
 */
pub mod animation;
pub mod download;

pub use download::Downloader;

/// The raw assets of a session. Immutable once produced.
pub struct AssetBundle {
    pub model: Vec<u8>,
    pub env_map: Vec<u8>,
    pub plane_video: PathBuf,
    pub snow_video: PathBuf,
}

impl fmt::Debug for AssetBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetBundle")
            .field("model", &format_args!("{} bytes", self.model.len()))
            .field("env_map", &format_args!("{} bytes", self.env_map.len()))
            .field("plane_video", &self.plane_video)
            .field("snow_video", &self.snow_video)
            .finish()
    }
}

/// A completed download: the shared bundle and the wall-clock time from the
/// first load request until every fetch had finished.
#[derive(Clone, Debug)]
pub struct Downloaded {
    pub bundle: Rc<AssetBundle>,
    pub elapsed: Duration,
}

/// Handle to the single in-flight (or finished) download. Clones observe the same result.
pub type SharedLoad = Shared<LocalBoxFuture<'static, Result<Downloaded, ArError>>>;

/// Fetches the asset bundle once and hands the same result to every caller.
///
/// Futures are lazy: the first call to [`AssetLoader::load_assets`] creates
/// the download, but nothing is fetched until the returned handle (or a
/// clone of it) is polled. Spawn it to warm the cache ahead of time.
pub struct AssetLoader<D> {
    downloader: Rc<D>,
    manifest: AssetManifest,
    pending: RefCell<Option<SharedLoad>>,
}

impl<D: Downloader + 'static> AssetLoader<D> {
    pub fn new(downloader: D, manifest: AssetManifest) -> Self {
        Self {
            downloader: Rc::new(downloader),
            manifest,
            pending: RefCell::new(None),
        }
    }

    /// Returns the memoized download, starting one if there is none yet or the
    /// previous one failed.
    pub fn load_assets(&self) -> SharedLoad {
        if let Some(pending) = self.pending.borrow().as_ref() {
            let failed = matches!(pending.peek(), Some(Err(_)));
            if !failed {
                return pending.clone();
            }
        }

        let started = Instant::now();
        let downloader = Rc::clone(&self.downloader);
        let manifest = &self.manifest;
        let model_url = manifest.url(&manifest.model);
        let env_map_url = manifest.url(&manifest.env_map);
        let plane_url = manifest.url(&manifest.plane_video);
        let snow_url = manifest.url(&manifest.snow_video);
        log::debug!("downloading assets {model_url}, {env_map_url}, {plane_url}, {snow_url}");

        let load = async move {
            let (model, env_map, plane_video, snow_video) = futures::try_join!(
                downloader.fetch_as_buffer(&model_url),
                downloader.fetch_as_buffer(&env_map_url),
                downloader.fetch_as_local_path(&plane_url),
                downloader.fetch_as_local_path(&snow_url),
            )
            .map_err(ArError::fetch)?;
            let elapsed = started.elapsed();
            log::debug!("assets downloaded in {elapsed:?}");
            Ok(Downloaded {
                bundle: Rc::new(AssetBundle {
                    model,
                    env_map,
                    plane_video,
                    snow_video,
                }),
                elapsed,
            })
        }
        .boxed_local()
        .shared();

        *self.pending.borrow_mut() = Some(load.clone());
        load
    }

    /// Awaits the memoized download. A failure is evicted so that an explicit
    /// retry by the caller fetches again.
    pub async fn load(&self) -> Result<Downloaded, ArError> {
        let load = self.load_assets();
        let result = load.clone().await;
        if result.is_err() {
            let mut pending = self.pending.borrow_mut();
            if pending.as_ref().is_some_and(|p| p.ptr_eq(&load)) {
                *pending = None;
            }
        }
        result
    }

    /// The bundle if a download has completed successfully. Never partial.
    pub fn cached(&self) -> Option<Downloaded> {
        self.pending
            .borrow()
            .as_ref()
            .and_then(|pending| pending.peek())
            .and_then(|result| result.as_ref().ok())
            .cloned()
    }

    /// Drops the memoized download.
    pub fn clear(&self) {
        self.pending.borrow_mut().take();
    }
}
