//! Background image decoding.
//!
//! Dropped or requested image files are decoded on worker threads; results
//! arrive over a channel and are registered when the owner drains it, so a
//! decode that finishes after other edits simply adds an independent entry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use composer::{FilterMode, WrapMode};
use crossbeam_channel::{unbounded, Receiver, Sender};
use image::RgbaImage;

/// One image file to turn into a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRequest {
    pub path: PathBuf,
    /// `None` picks the next default name when the image arrives.
    pub name: Option<String>,
    pub wrap: WrapMode,
    pub filter: FilterMode,
}

impl TextureRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: None,
            wrap: WrapMode::default(),
            filter: FilterMode::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

pub struct DecodedTexture {
    pub request: TextureRequest,
    pub image: Result<RgbaImage>,
}

/// Decodes `path` into 8-bit RGBA, keeping the file's top row first.
pub fn decode_image(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode image at {}", path.display()))?;
    Ok(image.to_rgba8())
}

type Wake = Arc<dyn Fn() + Send + Sync>;

pub struct ImageLoader {
    sender: Sender<DecodedTexture>,
    receiver: Receiver<DecodedTexture>,
    wake: Option<Wake>,
    pending: usize,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            wake: None,
            pending: 0,
        }
    }

    /// Loader that calls `wake` from the worker after each decode finishes.
    pub fn with_wake(wake: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            wake: Some(Arc::new(wake)),
            ..Self::new()
        }
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn request(&mut self, request: TextureRequest) -> Result<()> {
        let sender = self.sender.clone();
        let wake = self.wake.clone();
        tracing::debug!(path = %request.path.display(), "decoding image");
        thread::Builder::new()
            .name("fragpad-decode".into())
            .spawn(move || {
                let image = decode_image(&request.path);
                if sender.send(DecodedTexture { request, image }).is_ok() {
                    if let Some(wake) = wake {
                        wake();
                    }
                }
            })
            .map_err(|err| anyhow!("failed to spawn decode thread: {err}"))?;
        self.pending += 1;
        Ok(())
    }

    /// Finished decodes, without blocking.
    pub fn drain(&mut self) -> Vec<DecodedTexture> {
        let decoded: Vec<_> = self.receiver.try_iter().collect();
        self.pending = self.pending.saturating_sub(decoded.len());
        decoded
    }

    /// Blocks until every outstanding request has finished.
    pub fn wait(&mut self) -> Vec<DecodedTexture> {
        let mut decoded = Vec::with_capacity(self.pending);
        while self.pending > 0 {
            match self.receiver.recv() {
                Ok(result) => {
                    decoded.push(result);
                    self.pending -= 1;
                }
                Err(_) => break,
            }
        }
        decoded
    }
}
