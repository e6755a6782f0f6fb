//! Image loaders.
//!
//! Decoding happens off the scene thread; finished loads are polled each
//! tick and applied on the scene thread.

use facade_core::background::LoadTicket;
use facade_core::image::{DecodedImage, ImageRef, LoadError, LoadResult};
use facade_core::items::ItemId;
use facade_render::load_image;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError, channel};
use std::thread;
use std::time::{Duration, Instant};

/// What a load is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKey {
    Background(LoadTicket),
    Diagram(ItemId),
}

/// A finished load.
#[derive(Debug)]
pub struct LoadCompletion {
    pub key: LoadKey,
    pub image: ImageRef,
    pub result: LoadResult<DecodedImage>,
}

/// Source of decoded images.
pub trait ImageLoader {
    /// Start loading `image`. The result comes back from [`poll_completed`](Self::poll_completed).
    fn request(&mut self, key: LoadKey, image: &ImageRef);

    /// Take every load that has finished since the last poll.
    fn poll_completed(&mut self) -> Vec<LoadCompletion>;

    /// Loads requested but not yet returned by `poll_completed`.
    fn in_flight(&self) -> usize;
}

/// Decodes synchronously inside `request`. Results still arrive through
/// `poll_completed`, so callers see the same ordering as with a threaded loader.
#[derive(Debug, Default)]
pub struct InlineLoader {
    completed: Vec<LoadCompletion>,
}

impl InlineLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageLoader for InlineLoader {
    fn request(&mut self, key: LoadKey, image: &ImageRef) {
        self.completed.push(LoadCompletion {
            key,
            image: image.clone(),
            result: load_image(image),
        });
    }

    fn poll_completed(&mut self) -> Vec<LoadCompletion> {
        std::mem::take(&mut self.completed)
    }

    fn in_flight(&self) -> usize {
        self.completed.len()
    }
}

/// Decodes each request on a background thread.
#[derive(Debug)]
pub struct ThreadedLoader {
    sender: Sender<LoadCompletion>,
    receiver: Receiver<LoadCompletion>,
    in_flight: usize,
}

impl Default for ThreadedLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadedLoader {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            in_flight: 0,
        }
    }

    /// Block until every in-flight load has finished, or the timeout passes.
    pub fn wait_all(&mut self, timeout: Duration) -> Vec<LoadCompletion> {
        let deadline = Instant::now() + timeout;
        let mut completed = Vec::new();
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(completion) => {
                    self.in_flight -= 1;
                    completed.push(completion);
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("{} image load(s) still pending after {:?}", self.in_flight, timeout);
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        completed
    }
}

impl ImageLoader for ThreadedLoader {
    fn request(&mut self, key: LoadKey, image: &ImageRef) {
        let sender = self.sender.clone();
        let thread_image = image.clone();
        self.in_flight += 1;
        log::debug!("Loading {} for {:?}", image.name(), key);

        let spawned = thread::Builder::new()
            .name("image-loader".to_string())
            .spawn(move || {
                let result = load_image(&thread_image);
                let _ = sender.send(LoadCompletion {
                    key,
                    image: thread_image,
                    result,
                });
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn image loader thread: {}", e);
            let _ = self.sender.send(LoadCompletion {
                key,
                image: image.clone(),
                result: Err(LoadError::Io(e.to_string())),
            });
        }
    }

    fn poll_completed(&mut self) -> Vec<LoadCompletion> {
        let mut completed = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(completion) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    completed.push(completion);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        completed
    }

    fn in_flight(&self) -> usize {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(name: &str) -> ImageRef {
        ImageRef::from_decoded(name, DecodedImage::solid(2, 1, [1, 2, 3, 255]))
    }

    #[test]
    fn test_inline_loader_defers_to_poll() {
        let mut loader = InlineLoader::new();
        let id = ItemId::now_v7();
        loader.request(LoadKey::Diagram(id), &decoded("a"));
        assert_eq!(loader.in_flight(), 1);

        let completed = loader.poll_completed();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].key, LoadKey::Diagram(id));
        assert_eq!(completed[0].result.as_ref().unwrap().width, 2);
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn test_threaded_loader_reports_errors() {
        let mut loader = ThreadedLoader::new();
        let ok = ItemId::now_v7();
        let missing = ItemId::now_v7();
        loader.request(LoadKey::Diagram(ok), &decoded("a"));
        loader.request(LoadKey::Diagram(missing), &ImageRef::from_path("/no/such/diagram.png"));

        let completed = loader.wait_all(Duration::from_secs(10));
        assert_eq!(completed.len(), 2);
        assert_eq!(loader.in_flight(), 0);
        for completion in completed {
            match completion.key {
                LoadKey::Diagram(id) if id == ok => assert!(completion.result.is_ok()),
                LoadKey::Diagram(id) if id == missing => {
                    assert!(matches!(completion.result, Err(LoadError::Io(_))))
                }
                other => panic!("unexpected key {other:?}"),
            }
        }
    }
}
