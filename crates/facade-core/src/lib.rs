//! Facade Planner Core Library
//!
//! Platform-agnostic scene data and logic: plane fitting, diagram items,
//! camera, selection and gizmo handling, and GPU resource ownership.

pub mod background;
pub mod camera;
pub mod config;
pub mod diagram;
pub mod geometry;
pub mod gizmo;
pub mod image;
pub mod input;
pub mod items;
pub mod resources;
pub mod selection;
pub mod transform;

pub use background::{BackgroundPlaneManager, BackgroundState, LoadOutcome, LoadTicket};
pub use camera::{PerspectiveCamera, Ray};
pub use config::SceneConfig;
pub use diagram::DiagramPlanes;
pub use geometry::{FrustumKey, PlaneSize, fit_to_frustum, fit_to_max_dimension};
pub use gizmo::{GizmoDrag, GizmoLine};
pub use image::{DecodedImage, ImageFormat, ImageRef, ImageSource, LoadError, LoadResult};
pub use input::{InputBus, InputEvent, KeyEvent, KeyResponse, MouseButton, PointerEvent, Subscription};
pub use items::{DiagramItem, DiagramStore, ItemId, TextureState};
pub use resources::{GpuBackend, MeshBundle, ResourceCounts, ResourceSlot};
pub use selection::{KeyAction, SelectionController, SelectionEvent, SelectionState, TransformMode};
pub use transform::{Axis, Transform, TransformEdit};
