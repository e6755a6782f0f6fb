//! Shared handle to the render target.

use crate::raster::Framebuffer;
use std::cell::RefCell;
use std::rc::Rc;

/// Render target shared between the renderer and the capture pipeline.
///
/// The renderer draws into it; capture reads it back. A detached handle
/// has no framebuffer, as when the viewport has been torn down.
#[derive(Debug, Clone, Default)]
pub struct SurfaceHandle {
    inner: Rc<RefCell<Option<Framebuffer>>>,
}

impl SurfaceHandle {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Some(Framebuffer::new(width, height)))),
        }
    }

    /// A handle with no framebuffer behind it.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.borrow().is_some()
    }

    /// Drop the framebuffer. Every clone of this handle sees the change.
    pub fn detach(&self) {
        self.inner.borrow_mut().take();
    }

    /// Attach a fresh framebuffer, or resize the current one.
    pub fn attach(&self, width: usize, height: usize) {
        let mut inner = self.inner.borrow_mut();
        match inner.as_mut() {
            Some(fb) => fb.resize(width, height),
            None => *inner = Some(Framebuffer::new(width, height)),
        }
    }

    /// Size of the framebuffer, if attached.
    pub fn size(&self) -> Option<(usize, usize)> {
        self.inner.borrow().as_ref().map(|fb| (fb.width, fb.height))
    }

    /// Run `f` on the framebuffer, if attached.
    pub fn with_framebuffer<R>(&self, f: impl FnOnce(&mut Framebuffer) -> R) -> Option<R> {
        self.inner.borrow_mut().as_mut().map(f)
    }

    /// Copy of the current pixels as `(width, height, rgba)`.
    pub fn read_pixels(&self) -> Option<(u32, u32, Vec<u8>)> {
        self.inner
            .borrow()
            .as_ref()
            .map(|fb| (fb.width as u32, fb.height as u32, fb.pixels.clone()))
    }
}
