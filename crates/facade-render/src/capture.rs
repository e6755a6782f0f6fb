//! Frame capture: hide the gizmo, wait for a clean frame, encode PNG.

use crate::surface::SurfaceHandle;
use base64::{Engine, engine::general_purpose::STANDARD};
use futures::channel::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Capture errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("No render surface available")]
    NoSurface,
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("Export cancelled")]
    Cancelled,
}

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// An encoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl CapturedFrame {
    /// `data:image/png;base64,...`
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Encode RGBA pixel data to PNG bytes.
pub fn encode_png(rgba_data: &[u8], width: u32, height: u32) -> CaptureResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Best);

        let mut writer = encoder
            .write_header()
            .map_err(|e| CaptureError::Encode(format!("header: {e}")))?;
        writer
            .write_image_data(rgba_data)
            .map_err(|e| CaptureError::Encode(format!("data: {e}")))?;
    }
    Ok(png_data)
}

/// Resolves once the pipeline has captured a frame for this request.
#[derive(Debug)]
pub struct ExportFuture {
    rx: oneshot::Receiver<CaptureResult<CapturedFrame>>,
}

impl Future for ExportFuture {
    type Output = CaptureResult<CapturedFrame>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(CaptureError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Two-phase frame capture.
///
/// A request raises the export flag so the next frame is drawn without a
/// gizmo. Once such a frame has been rendered and the delay has passed,
/// the surface is read once and every pending request resolves with that
/// same frame.
#[derive(Debug)]
pub struct CapturePipeline {
    surface: SurfaceHandle,
    delay: Duration,
    pending: Vec<oneshot::Sender<CaptureResult<CapturedFrame>>>,
    requested_at: Option<Instant>,
    clean_frame: bool,
}

impl CapturePipeline {
    pub fn new(surface: SurfaceHandle, delay: Duration) -> Self {
        Self {
            surface,
            delay,
            pending: Vec::new(),
            requested_at: None,
            clean_frame: false,
        }
    }

    /// Whether an export is in progress. Gizmos must be hidden while true.
    pub fn is_exporting(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Queue a capture request.
    pub fn request(&mut self) -> ExportFuture {
        self.request_at(Instant::now())
    }

    pub fn request_at(&mut self, now: Instant) -> ExportFuture {
        let (tx, rx) = oneshot::channel();
        if self.pending.is_empty() {
            self.requested_at = Some(now);
            self.clean_frame = false;
        }
        self.pending.push(tx);
        log::debug!("Export requested ({} pending)", self.pending.len());
        ExportFuture { rx }
    }

    /// Report that a frame was rendered to the surface.
    pub fn on_frame_rendered(&mut self, gizmo_free: bool) {
        if self.is_exporting() {
            self.clean_frame = gizmo_free;
        }
    }

    /// Whether pending requests would resolve at `now`.
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.requested_at {
            Some(at) => self.clean_frame && now.saturating_duration_since(at) >= self.delay,
            None => false,
        }
    }

    /// Resolve pending requests if ready. Returns how many were resolved.
    pub fn poll(&mut self) -> usize {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> usize {
        if !self.is_exporting() {
            return 0;
        }
        if !self.surface.is_attached() {
            log::error!("Frame capture failed: {}", CaptureError::NoSurface);
            return self.resolve(Err(CaptureError::NoSurface));
        }
        if !self.is_ready(now) {
            return 0;
        }
        let result = self.capture_now();
        match &result {
            Ok(frame) => log::info!(
                "Captured {}x{} frame ({} bytes) for {} request(s)",
                frame.width,
                frame.height,
                frame.png.len(),
                self.pending.len()
            ),
            Err(e) => log::error!("Frame capture failed: {}", e),
        }
        self.resolve(result)
    }

    /// Read and encode the surface as it is right now.
    pub fn capture_now(&self) -> CaptureResult<CapturedFrame> {
        let (width, height, pixels) = self.surface.read_pixels().ok_or(CaptureError::NoSurface)?;
        let png = encode_png(&pixels, width, height)?;
        Ok(CapturedFrame { width, height, png })
    }

    /// Fail every pending request.
    pub fn cancel_all(&mut self) -> usize {
        self.resolve(Err(CaptureError::Cancelled))
    }

    fn resolve(&mut self, result: CaptureResult<CapturedFrame>) -> usize {
        let count = self.pending.len();
        for tx in self.pending.drain(..) {
            // The receiver may have been dropped; that is not an error.
            let _ = tx.send(result.clone());
        }
        self.requested_at = None;
        self.clean_frame = false;
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(delay_ms: u64) -> (SurfaceHandle, CapturePipeline) {
        let surface = SurfaceHandle::new(4, 2);
        surface.with_framebuffer(|fb| fb.clear([12, 34, 56, 255]));
        let pipeline = CapturePipeline::new(surface.clone(), Duration::from_millis(delay_ms));
        (surface, pipeline)
    }

    #[test]
    fn test_waits_for_clean_frame_and_delay() {
        let (_surface, mut pipeline) = pipeline(100);
        let start = Instant::now();
        let _export = pipeline.request_at(start);
        assert!(pipeline.is_exporting());

        // Delay elapsed but no gizmo-free frame yet.
        assert_eq!(pipeline.poll_at(start + Duration::from_millis(200)), 0);

        pipeline.on_frame_rendered(true);
        assert_eq!(pipeline.poll_at(start + Duration::from_millis(50)), 0);
        assert_eq!(pipeline.poll_at(start + Duration::from_millis(100)), 1);
        assert!(!pipeline.is_exporting());
    }

    #[test]
    fn test_gizmo_frame_does_not_count() {
        let (_surface, mut pipeline) = pipeline(0);
        let _export = pipeline.request();
        pipeline.on_frame_rendered(false);
        assert_eq!(pipeline.poll(), 0);
        pipeline.on_frame_rendered(true);
        assert_eq!(pipeline.poll(), 1);
    }

    #[test]
    fn test_concurrent_requests_share_frame() {
        let (_surface, mut pipeline) = pipeline(0);
        let a = pipeline.request();
        let b = pipeline.request();
        assert_eq!(pipeline.pending_count(), 2);

        pipeline.on_frame_rendered(true);
        assert_eq!(pipeline.poll(), 2);

        let a = pollster::block_on(a).unwrap();
        let b = pollster::block_on(b).unwrap();
        assert_eq!(a, b);
        assert_eq!((a.width, a.height), (4, 2));
        assert!(a.data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_no_surface() {
        let (surface, mut pipeline) = pipeline(0);
        let export = pipeline.request();
        surface.detach();
        // Fails without waiting for a clean frame.
        assert_eq!(pipeline.poll(), 1);
        assert_eq!(pollster::block_on(export), Err(CaptureError::NoSurface));
    }

    #[test]
    fn test_dropped_pipeline_cancels() {
        let (_surface, mut pipeline) = pipeline(0);
        let export = pipeline.request();
        drop(pipeline);
        assert_eq!(pollster::block_on(export), Err(CaptureError::Cancelled));
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&[0, 0, 0, 255], 1, 1).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert!(encode_png(&[0, 0, 0], 1, 1).is_err());
    }
}
