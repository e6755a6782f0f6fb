//! Scene orchestration.
//!
//! [`Scene`] owns the camera, the renderer and every piece of scene state,
//! and exposes the operations and callbacks the surrounding application
//! uses: background and diagram placement, selection, transform edits,
//! deletion and frame export.

use crate::file_ops;
use crate::loader::{ImageLoader, LoadCompletion, LoadKey, ThreadedLoader};
use facade_core::background::{BackgroundPlaneManager, BackgroundState, LoadOutcome};
use facade_core::camera::PerspectiveCamera;
use facade_core::config::SceneConfig;
use facade_core::diagram::DiagramPlanes;
use facade_core::gizmo::{self, GizmoDrag, GizmoLine};
use facade_core::image::{ImageRef, LoadError};
use facade_core::input::{InputBus, InputEvent, KeyEvent, KeyResponse, MouseButton, PointerEvent, Subscription};
use facade_core::items::{DiagramStore, ItemId};
use facade_core::resources::{GpuBackend, ResourceCounts};
use facade_core::selection::{KeyAction, SelectionController, SelectionEvent, SelectionState, TransformMode};
use facade_core::transform::{Transform, TransformEdit};
use facade_render::{
    CaptureError, CapturePipeline, DEFAULT_CLEAR_COLOR, RenderContext, Renderer, RendererError, SoftwareRenderer, SurfaceHandle,
};
use glam::Vec3;
use kurbo::{Size, Vec2};
use peniko::Color;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Scene errors.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("Render failed: {0}")]
    Render(#[from] RendererError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

type SelectionCallback = Box<dyn FnMut(&SelectionEvent)>;
type TransformCallback = Box<dyn FnMut(ItemId, Transform)>;
type DeletedCallback = Box<dyn FnMut(ItemId)>;
type LoadErrorCallback = Box<dyn FnMut(&ImageRef, &LoadError)>;

#[derive(Default)]
struct SceneCallbacks {
    selection: Option<SelectionCallback>,
    transform: Option<TransformCallback>,
    deleted: Option<DeletedCallback>,
    load_error: Option<LoadErrorCallback>,
}

impl SceneCallbacks {
    fn selection(&mut self, event: &SelectionEvent) {
        if let Some(callback) = self.selection.as_mut() {
            callback(event);
        }
    }

    fn transform(&mut self, id: ItemId, transform: Transform) {
        if let Some(callback) = self.transform.as_mut() {
            callback(id, transform);
        }
    }

    fn deleted(&mut self, id: ItemId) {
        if let Some(callback) = self.deleted.as_mut() {
            callback(id);
        }
    }

    fn load_error(&mut self, image: &ImageRef, error: &LoadError) {
        if let Some(callback) = self.load_error.as_mut() {
            callback(image, error);
        }
    }
}

/// An active gizmo drag on one item.
#[derive(Debug, Clone, Copy)]
struct ActiveDrag {
    id: ItemId,
    drag: GizmoDrag,
}

/// The composed scene: background photo, diagram planes, selection, capture.
pub struct Scene<L: ImageLoader = ThreadedLoader> {
    config: SceneConfig,
    camera: PerspectiveCamera,
    renderer: SoftwareRenderer,
    capture: CapturePipeline,
    loader: L,
    background: BackgroundPlaneManager,
    store: DiagramStore,
    planes: DiagramPlanes,
    selection: SelectionController,
    drag: Option<ActiveDrag>,
    clear_color: Color,
    current_spec_image: Option<ImageRef>,
    input: Option<Subscription>,
    callbacks: SceneCallbacks,
}

impl<L: ImageLoader> Scene<L> {
    /// Create a scene rendering into a `viewport`-sized surface.
    pub fn new(config: SceneConfig, viewport: Size, loader: L) -> Self {
        let mut camera = PerspectiveCamera::new().with_viewport(viewport.width, viewport.height);
        camera.fov_degrees = config.fov_degrees;
        camera.position = Vec3::new(0.0, 0.0, config.camera_z);
        camera.target_distance = config.camera_z;

        let renderer = SoftwareRenderer::new(viewport.width.round() as usize, viewport.height.round() as usize);
        let capture = CapturePipeline::new(renderer.surface(), config.capture_delay());

        Self {
            background: BackgroundPlaneManager::new(config.background_depth),
            planes: DiagramPlanes::new(config.diagram_max_size),
            config,
            camera,
            renderer,
            capture,
            loader,
            store: DiagramStore::new(),
            selection: SelectionController::new(),
            drag: None,
            clear_color: DEFAULT_CLEAR_COLOR,
            current_spec_image: None,
            input: None,
            callbacks: SceneCallbacks::default(),
        }
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    // --- Callbacks ---

    pub fn on_selection_change(&mut self, callback: impl FnMut(&SelectionEvent) + 'static) {
        self.callbacks.selection = Some(Box::new(callback));
    }

    /// Called whenever an item's transform changes: gizmo drags (with the
    /// transform read back from the mesh) and direct edits.
    pub fn on_transform_change(&mut self, callback: impl FnMut(ItemId, Transform) + 'static) {
        self.callbacks.transform = Some(Box::new(callback));
    }

    pub fn on_item_deleted(&mut self, callback: impl FnMut(ItemId) + 'static) {
        self.callbacks.deleted = Some(Box::new(callback));
    }

    pub fn on_load_error(&mut self, callback: impl FnMut(&ImageRef, &LoadError) + 'static) {
        self.callbacks.load_error = Some(Box::new(callback));
    }

    // --- Accessors ---

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn items(&self) -> &DiagramStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionState {
        self.selection.state()
    }

    pub fn mode(&self) -> TransformMode {
        self.selection.mode()
    }

    pub fn background_state(&self) -> BackgroundState {
        self.background.state()
    }

    /// Spec image of the most recently added diagram.
    pub fn current_spec_image(&self) -> Option<&ImageRef> {
        self.current_spec_image.as_ref()
    }

    pub fn is_exporting(&self) -> bool {
        self.capture.is_exporting()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Live transform of an item's mesh, once its texture has loaded.
    pub fn mesh_transform(&self, id: ItemId) -> Option<Transform> {
        self.planes.mesh_transform(id, &self.renderer)
    }

    /// The render target. Detaching it makes exports fail with `NoSurface`.
    pub fn surface(&self) -> SurfaceHandle {
        self.renderer.surface()
    }

    pub fn resource_counts(&self) -> ResourceCounts {
        self.renderer.resource_counts()
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    // --- Background ---

    /// Replace or clear the background photo.
    pub fn set_background_image(&mut self, image: Option<ImageRef>) {
        let ticket = self.background.set_image(image.clone(), &mut self.renderer);
        if let (Some(ticket), Some(image)) = (ticket, image) {
            self.loader.request(LoadKey::Background(ticket), &image);
        }
    }

    // --- Diagrams ---

    /// Place a new diagram and select it.
    ///
    /// The item starts with the previous item's transform. Its plane
    /// appears once the image has loaded.
    pub fn add_diagram(&mut self, image: ImageRef, spec_image: Option<ImageRef>) -> ItemId {
        let id = self.store.add(image.clone(), spec_image.clone());
        self.current_spec_image = spec_image;
        self.loader.request(LoadKey::Diagram(id), &image);
        log::info!("Added diagram {} ({})", id, image.name());
        self.select_item(id);
        id
    }

    /// Remove an item and release its texture and mesh.
    pub fn delete_item(&mut self, id: ItemId) -> bool {
        if self.store.remove(id).is_none() {
            return false;
        }
        self.planes.release(id, &mut self.renderer);
        if self.drag.is_some_and(|drag| drag.id == id) {
            self.drag = None;
        }
        if self.selection.forget(id) {
            self.store.mark_selected(None);
            self.callbacks.selection(&SelectionEvent::Cleared);
        }
        log::info!("Deleted diagram {}", id);
        self.callbacks.deleted(id);
        true
    }

    /// Replace an item's transform and report it through `on_transform_change`.
    /// Non-finite transforms are rejected.
    pub fn set_transform(&mut self, id: ItemId, transform: Transform) -> bool {
        if !transform.is_finite() {
            log::warn!("Rejecting non-finite transform for {}", id);
            return false;
        }
        if !self.store.set_transform(id, transform) {
            return false;
        }
        self.callbacks.transform(id, transform);
        true
    }

    /// Apply a field or slider edit. Returns the new transform.
    pub fn apply_edit(&mut self, id: ItemId, edit: TransformEdit) -> Option<Transform> {
        let current = self.store.get(id)?.transform;
        let next = edit.apply(&current);
        self.set_transform(id, next).then_some(next)
    }

    // --- Selection ---

    /// Select an item. Returns false if it does not exist.
    pub fn select_item(&mut self, id: ItemId) -> bool {
        let Some(item) = self.store.get(id) else {
            return false;
        };
        if let Some(event) = self.selection.select(id, item.transform) {
            self.store.mark_selected(Some(id));
            self.drag = None;
            self.callbacks.selection(&event);
        }
        true
    }

    pub fn clear_selection(&mut self) {
        if let Some(event) = self.selection.clear() {
            self.store.mark_selected(None);
            self.drag = None;
            self.callbacks.selection(&event);
        }
    }

    // --- Input ---

    /// Route input from a bus through this scene. Dropping the scene unsubscribes.
    pub fn attach_input(&mut self, bus: &InputBus) {
        self.input = Some(bus.subscribe());
    }

    pub fn detach_input(&mut self) {
        self.input = None;
    }

    fn gizmo_transform(&self) -> Option<(ItemId, Transform)> {
        let id = self.planes.gizmo_target(self.selection.selected(), self.capture.is_exporting())?;
        Some((id, self.store.get(id)?.transform))
    }

    /// Handle a pointer event. Returns true if the event was consumed.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> bool {
        match *event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } => {
                if let Some((id, transform)) = self.gizmo_transform() {
                    let mode = self.selection.mode();
                    if let Some(axis) = gizmo::hit_test(&transform, mode, &self.camera, position) {
                        log::debug!("Gizmo {} drag on {:?}", mode.name(), axis);
                        self.drag = Some(ActiveDrag {
                            id,
                            drag: GizmoDrag::new(axis, mode, position, transform),
                        });
                        return true;
                    }
                }
                match self.planes.pick(&self.store, &self.camera, position) {
                    Some(id) => {
                        self.select_item(id);
                        true
                    }
                    None => {
                        self.clear_selection();
                        false
                    }
                }
            }
            PointerEvent::Move { position } => {
                let Some(active) = self.drag else {
                    return false;
                };
                let next = active.drag.update(position, &self.camera);
                self.store.set_transform(active.id, next);
                if let Some(live) = self.planes.write_transform(active.id, next, &mut self.renderer) {
                    self.callbacks.transform(active.id, live);
                }
                true
            }
            PointerEvent::Up { .. } => self.drag.take().is_some(),
            PointerEvent::Down { .. } => false,
        }
    }

    /// Handle a key press while the viewport has focus.
    pub fn handle_key(&mut self, event: &KeyEvent) -> KeyResponse {
        let action = self.selection.handle_key(event);
        let response = KeyResponse {
            prevent_default: action.prevents_default(),
        };
        match action {
            KeyAction::Ignored => {}
            KeyAction::ModeChanged(_) => self.drag = None,
            KeyAction::Delete(id) => {
                self.callbacks.selection(&SelectionEvent::DeleteRequested { id });
                self.delete_item(id);
            }
        }
        response
    }

    fn dispatch(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pointer(pointer) => {
                self.handle_pointer(&pointer);
            }
            InputEvent::Key(key) => {
                self.handle_key(&key);
            }
            InputEvent::Pan(delta) => self.pan(delta),
        }
    }

    // --- Camera ---

    pub fn resize(&mut self, width: f64, height: f64) {
        self.camera.viewport = Size::new(width.max(1.0), height.max(1.0));
        self.background.refit(&self.camera, &mut self.renderer);
    }

    pub fn set_fov(&mut self, fov_degrees: f32) {
        if !fov_degrees.is_finite() || fov_degrees <= 0.0 || fov_degrees >= 180.0 {
            log::warn!("Ignoring invalid field of view {}", fov_degrees);
            return;
        }
        self.camera.fov_degrees = fov_degrees;
        self.background.refit(&self.camera, &mut self.renderer);
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.camera.pan(delta);
    }

    // --- Frame loop ---

    fn apply_completion(&mut self, completion: LoadCompletion) {
        let LoadCompletion { key, image, result } = completion;
        match key {
            LoadKey::Background(ticket) => {
                let outcome = self
                    .background
                    .complete_load(ticket, result, &self.camera, &mut self.renderer);
                if let LoadOutcome::Failed(e) = outcome {
                    self.callbacks.load_error(&image, &e);
                }
            }
            LoadKey::Diagram(id) => {
                if !self.store.contains(id) {
                    log::debug!("Dropping late load for deleted diagram {}", id);
                    return;
                }
                match result {
                    Ok(decoded) => {
                        if let Some(item) = self.store.get_mut(id) {
                            self.planes.install(item, &decoded, &mut self.renderer);
                        }
                    }
                    Err(e) => {
                        log::error!("Failed to load diagram {}: {}", image.name(), e);
                        self.callbacks.load_error(&image, &e);
                        self.delete_item(id);
                    }
                }
            }
        }
    }

    /// Advance one frame: drain input, apply finished loads, sync meshes,
    /// render, and resolve exports that are ready.
    pub fn tick(&mut self) -> SceneResult<()> {
        let events = self.input.as_ref().map(Subscription::drain).unwrap_or_default();
        for event in events {
            self.dispatch(event);
        }

        for completion in self.loader.poll_completed() {
            self.apply_completion(completion);
        }

        self.planes.sync(&self.store, &mut self.renderer);
        self.background.refit(&self.camera, &mut self.renderer);

        if self.renderer.surface().is_attached() {
            let lines = self.gizmo_lines();
            let ctx = RenderContext::new(&self.camera)
                .with_background(self.clear_color)
                .with_gizmo(&lines);
            self.renderer.render(&ctx)?;
            self.capture.on_frame_rendered(ctx.is_gizmo_free());
        }

        self.capture.poll();
        Ok(())
    }

    fn gizmo_lines(&self) -> Vec<GizmoLine> {
        match self.gizmo_transform() {
            Some((_, transform)) => gizmo::gizmo_lines(&transform, self.selection.mode(), &self.camera),
            None => Vec::new(),
        }
    }

    // --- Export ---

    /// Capture the next gizmo-free frame as a PNG data URL.
    ///
    /// The future resolves during a later [`tick`](Self::tick).
    pub fn export_frame(&mut self) -> impl Future<Output = SceneResult<String>> + 'static {
        let export = self.capture.request();
        async move { Ok::<_, SceneError>(export.await?.data_url()) }
    }

    /// Capture the next gizmo-free frame and write it to `dir`.
    pub fn export_frame_to_file(&mut self, dir: &Path) -> impl Future<Output = SceneResult<PathBuf>> + 'static {
        let export = self.capture.request();
        let dir = dir.to_path_buf();
        let filename = self.config.export_filename.clone();
        async move {
            let frame = export.await?;
            Ok::<_, SceneError>(file_ops::export_png(&dir, &filename, &frame.png)?)
        }
    }

    /// Release every resource. The scene is empty afterwards.
    pub fn teardown(&mut self) {
        let cancelled = self.capture.cancel_all();
        if cancelled > 0 {
            log::warn!("Cancelled {} pending export(s)", cancelled);
        }
        self.drag = None;
        self.input = None;
        self.background.teardown(&mut self.renderer);
        self.planes.release_all(&mut self.renderer);
        for id in self.store.ids() {
            self.store.remove(id);
        }
        self.selection.clear();
        let counts = self.renderer.resource_counts();
        if counts.total() > 0 {
            log::warn!("Resources still live after teardown: {:?}", counts);
        }
    }
}

impl Scene<ThreadedLoader> {
    /// Block until pending image loads finish and apply them.
    /// Returns how many were applied.
    pub fn wait_for_loads(&mut self, timeout: Duration) -> usize {
        let completed = self.loader.wait_all(timeout);
        let count = completed.len();
        for completion in completed {
            self.apply_completion(completion);
        }
        count
    }
}

impl<L: ImageLoader> Drop for Scene<L> {
    fn drop(&mut self) {
        self.teardown();
    }
}
