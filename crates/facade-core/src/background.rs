//! Background photo plane, fitted to the camera frustum.

use crate::camera::PerspectiveCamera;
use crate::geometry::{BACKGROUND_DEPTH, FrustumKey, PlaneSize};
use crate::image::{DecodedImage, ImageRef, LoadError, LoadResult};
use crate::resources::{
    ColorSpace, GpuBackend, MaterialDesc, MeshBundle, MeshDesc, ResourceSlot, TextureDesc, TextureFilter,
};
use crate::transform::Transform;
use glam::Vec3;

/// Background draws before every diagram.
pub const BACKGROUND_RENDER_ORDER: i32 = -1;

/// Identifies one background load request. Only the latest ticket installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Observable state of the manager.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundState {
    Idle,
    Loading { ticket: LoadTicket, image: ImageRef },
    Installed { image: ImageRef, size: PlaneSize },
}

/// What happened to a completed load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Installed(PlaneSize),
    /// Superseded or cancelled; nothing was installed.
    Stale,
    Failed(LoadError),
}

#[derive(Debug, Clone)]
struct InstalledBackground {
    image: ImageRef,
    aspect: f32,
    key: FrustumKey,
    size: PlaneSize,
}

/// Owns the background mesh and sequences its asynchronous loads.
#[derive(Debug)]
pub struct BackgroundPlaneManager {
    depth: f32,
    next_ticket: u64,
    pending: Option<(LoadTicket, ImageRef)>,
    installed: Option<InstalledBackground>,
    slot: ResourceSlot,
}

impl Default for BackgroundPlaneManager {
    fn default() -> Self {
        Self::new(BACKGROUND_DEPTH)
    }
}

impl BackgroundPlaneManager {
    /// Create a manager that places the plane at `depth` on the Z axis.
    pub fn new(depth: f32) -> Self {
        Self {
            depth,
            next_ticket: 0,
            pending: None,
            installed: None,
            slot: ResourceSlot::new(),
        }
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn state(&self) -> BackgroundState {
        if let Some((ticket, image)) = &self.pending {
            return BackgroundState::Loading {
                ticket: *ticket,
                image: image.clone(),
            };
        }
        match &self.installed {
            Some(installed) => BackgroundState::Installed {
                image: installed.image.clone(),
                size: installed.size,
            },
            None => BackgroundState::Idle,
        }
    }

    /// Size of the installed plane.
    pub fn plane_size(&self) -> Option<PlaneSize> {
        self.installed.as_ref().map(|installed| installed.size)
    }

    pub fn bundle(&self) -> Option<&MeshBundle> {
        self.slot.get()
    }

    /// The image that is loading, or installed if nothing is loading.
    pub fn current_image(&self) -> Option<&ImageRef> {
        self.pending
            .as_ref()
            .map(|(_, image)| image)
            .or(self.installed.as_ref().map(|installed| &installed.image))
    }

    /// Request a new background.
    ///
    /// Returns the ticket the caller must pass back to [`complete_load`]
    /// once the image is decoded, or `None` if no load is needed. `None`
    /// as input cancels any load and removes the plane.
    ///
    /// [`complete_load`]: Self::complete_load
    pub fn set_image(&mut self, image: Option<ImageRef>, backend: &mut dyn GpuBackend) -> Option<LoadTicket> {
        let Some(image) = image else {
            if let Some((ticket, _)) = self.pending.take() {
                log::debug!("Background load {} cancelled", ticket.0);
            }
            self.installed = None;
            if self.slot.clear(backend) {
                log::debug!("Background plane removed");
            }
            return None;
        };

        if self.current_image() == Some(&image) {
            return None;
        }

        self.next_ticket += 1;
        let ticket = LoadTicket(self.next_ticket);
        if let Some((previous, _)) = self.pending.replace((ticket, image)) {
            log::debug!("Background load {} superseded by {}", previous.0, ticket.0);
        }
        Some(ticket)
    }

    /// Finish a load started by [`set_image`](Self::set_image).
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: LoadResult<DecodedImage>,
        camera: &PerspectiveCamera,
        backend: &mut dyn GpuBackend,
    ) -> LoadOutcome {
        let is_current = matches!(&self.pending, Some((current, _)) if *current == ticket);
        let image = match self.pending.take() {
            Some((_, image)) if is_current => image,
            other => {
                self.pending = other;
                log::debug!("Discarding stale background load {}", ticket.0);
                return LoadOutcome::Stale;
            }
        };

        let decoded = match result {
            Ok(decoded) => decoded,
            Err(e) => {
                log::error!("Failed to load background {}: {}", image.name(), e);
                return LoadOutcome::Failed(e);
            }
        };

        let key = camera.frustum_key(self.depth);
        let aspect = decoded.aspect();
        let size = key.fit(aspect);
        let bundle = MeshBundle::create_plane(
            backend,
            &decoded,
            TextureDesc {
                color_space: ColorSpace::Srgb,
                min_filter: TextureFilter::Linear,
                mag_filter: TextureFilter::Linear,
            },
            size,
            MaterialDesc {
                depth_write: false,
                tone_mapped: false,
                ..MaterialDesc::default()
            },
            MeshDesc {
                transform: Transform::from_position(Vec3::new(0.0, 0.0, self.depth)),
                render_order: BACKGROUND_RENDER_ORDER,
            },
        );
        self.slot.replace(backend, bundle);
        log::info!(
            "Background {} installed at {:.2}x{:.2}",
            image.name(),
            size.width,
            size.height
        );
        self.installed = Some(InstalledBackground { image, aspect, key, size });
        LoadOutcome::Installed(size)
    }

    /// Refit the installed plane after a camera or viewport change.
    ///
    /// Only the geometry is swapped. Returns true if the plane changed.
    pub fn refit(&mut self, camera: &PerspectiveCamera, backend: &mut dyn GpuBackend) -> bool {
        let Some(installed) = self.installed.as_mut() else {
            return false;
        };
        let key = camera.frustum_key(self.depth);
        if key == installed.key {
            return false;
        }
        let Some(bundle) = self.slot.get_mut() else {
            return false;
        };
        let size = key.fit(installed.aspect);
        bundle.resize(backend, size);
        installed.key = key;
        installed.size = size;
        log::debug!("Background refit to {:.2}x{:.2}", size.width, size.height);
        true
    }

    /// Release everything. The manager returns to `Idle`.
    pub fn teardown(&mut self, backend: &mut dyn GpuBackend) {
        self.set_image(None, backend);
    }
}
