//! Facade Planner Render Library
//!
//! Renderer abstraction, a CPU rasteriser backend, image decoding and
//! frame capture.

pub mod capture;
pub mod decode;
pub mod raster;
mod renderer;
mod software;
pub mod surface;

pub use capture::{CaptureError, CapturePipeline, CaptureResult, CapturedFrame, ExportFuture, encode_png};
pub use decode::{decode_image, load_image};
pub use raster::Framebuffer;
pub use renderer::{DEFAULT_CLEAR_COLOR, RenderContext, RenderResult, Renderer, RendererError};
pub use software::SoftwareRenderer;
pub use surface::SurfaceHandle;
