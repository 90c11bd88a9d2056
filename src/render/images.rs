//! Diagram and math images produced by an external rendering service.
//!
//! The core never rasterizes anything itself. It hands a [`RenderRequest`]
//! to an [`ImageService`], gets back a [`PendingImage`] and polls it until
//! the service answers. Finished images land in an [`ImageCache`] keyed by
//! [`ContentKey`], a hash of the source and its display mode, so identical
//! content is only ever rendered once per session.

use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use sha2::{Digest, Sha256};

/// What kind of content an image stands for; part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    InlineMath,
    DisplayMath,
    Diagram,
}

impl ImageKind {
    const fn mode_byte(self) -> u8 {
        match self {
            Self::InlineMath => 0,
            Self::DisplayMath => 1,
            Self::Diagram => 2,
        }
    }
}

/// Hex SHA-256 of the mode byte followed by the source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey(String);

impl ContentKey {
    pub fn new(kind: ImageKind, source: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([kind.mode_byte()]);
        hasher.update(source.as_bytes());
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            hex.push_str(&format!("{byte:02x}"));
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Work order for the rendering service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub key: ContentKey,
    pub kind: ImageKind,
    /// Mermaid or LaTeX source
    pub source: String,
}

impl RenderRequest {
    pub fn new(kind: ImageKind, source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            key: ContentKey::new(kind, &source),
            kind,
            source,
        }
    }
}

/// Encoded image returned by the service. The bytes are opaque here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageRenderError {
    #[error("image render failed: {0}")]
    Failed(String),
    #[error("image service dropped the request")]
    Disconnected,
}

pub type RenderResult = Result<RenderedImage, ImageRenderError>;

/// One-shot handle to an image the service is still producing.
#[derive(Debug)]
pub struct PendingImage {
    rx: Receiver<RenderResult>,
}

impl PendingImage {
    /// A pending image and the sender the service completes it through.
    pub fn channel() -> (Sender<RenderResult>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }

    /// A pending image that is already complete.
    pub fn ready(result: RenderResult) -> Self {
        let (tx, pending) = Self::channel();
        let _ = tx.send(result);
        pending
    }

    /// The result if the service has answered; `None` while still waiting.
    ///
    /// A service that drops its sender without answering yields
    /// [`ImageRenderError::Disconnected`].
    pub fn try_take(&self) -> Option<RenderResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ImageRenderError::Disconnected)),
        }
    }
}

/// External collaborator that turns diagram/math source into images.
pub trait ImageService {
    /// Start rendering. Must not block; the answer arrives via the handle.
    fn request(&mut self, request: RenderRequest) -> PendingImage;
}

/// Runs a render function on a background thread per request.
pub struct ThreadedService<F> {
    render: F,
}

impl<F> ThreadedService<F>
where
    F: Fn(&RenderRequest) -> RenderResult + Clone + Send + 'static,
{
    pub const fn new(render: F) -> Self {
        Self { render }
    }
}

impl<F> fmt::Debug for ThreadedService<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedService").finish_non_exhaustive()
    }
}

impl<F> ImageService for ThreadedService<F>
where
    F: Fn(&RenderRequest) -> RenderResult + Clone + Send + 'static,
{
    fn request(&mut self, request: RenderRequest) -> PendingImage {
        let (tx, pending) = PendingImage::channel();
        let render = self.render.clone();
        std::thread::spawn(move || {
            let _ = tx.send(render(&request));
        });
        pending
    }
}

/// Finished images by content key. Grows for the life of the session.
#[derive(Debug, Default)]
pub struct ImageCache {
    images: HashMap<ContentKey, RenderedImage>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ContentKey) -> Option<&RenderedImage> {
        self.images.get(key)
    }

    pub fn contains(&self, key: &ContentKey) -> bool {
        self.images.contains_key(key)
    }

    pub fn insert(&mut self, key: ContentKey, image: RenderedImage) {
        self.images.insert(key, image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
