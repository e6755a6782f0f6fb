//! Renderer trait abstraction.

use facade_core::camera::PerspectiveCamera;
use facade_core::gizmo::GizmoLine;
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Clear colour used when none is configured.
pub const DEFAULT_CLEAR_COLOR: Color = Color::from_rgba8(17, 24, 39, 255);

/// Context for a single render frame.
pub struct RenderContext<'a> {
    pub camera: &'a PerspectiveCamera,
    /// Gizmo overlay, drawn on top of everything. Empty while exporting.
    pub gizmo: &'a [GizmoLine],
    /// Clear colour behind the background plane.
    pub background_color: Color,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(camera: &'a PerspectiveCamera) -> Self {
        Self {
            camera,
            gizmo: &[],
            background_color: DEFAULT_CLEAR_COLOR,
        }
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_gizmo(mut self, lines: &'a [GizmoLine]) -> Self {
        self.gizmo = lines;
        self
    }

    /// Whether this frame is free of gizmo overlay.
    pub fn is_gizmo_free(&self) -> bool {
        self.gizmo.is_empty()
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Draw one frame into the render target.
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<()>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
