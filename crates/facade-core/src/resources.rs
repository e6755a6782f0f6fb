//! Ownership model for render-side resources.
//!
//! Every texture, geometry, material and mesh is created through a
//! [`GpuBackend`] and must be handed back to it explicitly. A [`MeshBundle`]
//! groups the four resources of one plane; a [`ResourceSlot`] holds at most
//! one bundle and releases the old one whenever it is replaced.

use crate::geometry::PlaneSize;
use crate::image::DecodedImage;
use crate::transform::Transform;
use serde::{Deserialize, Serialize};

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);
    };
}

resource_id!(
    /// Handle to an uploaded texture.
    TextureId
);
resource_id!(
    /// Handle to plane geometry.
    GeometryId
);
resource_id!(
    /// Handle to a material.
    MaterialId
);
resource_id!(
    /// Handle to a mesh in the scene.
    MeshId
);

/// How texel values should be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    /// Display-referred, gamma-encoded colour (photos, screenshots).
    #[default]
    Srgb,
    /// Linear data; converted to sRGB on output.
    Linear,
}

/// Texture sampling filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

/// Texture creation parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureDesc {
    pub color_space: ColorSpace,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
}

/// Flat, unlit material parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialDesc {
    pub texture: Option<TextureId>,
    pub double_sided: bool,
    /// Blend texels by their alpha.
    pub transparent: bool,
    pub opacity: f32,
    pub depth_write: bool,
    pub tone_mapped: bool,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            texture: None,
            double_sided: false,
            transparent: false,
            opacity: 1.0,
            depth_write: true,
            tone_mapped: false,
        }
    }
}

/// Mesh creation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshDesc {
    pub transform: Transform,
    /// Lower orders draw first.
    pub render_order: i32,
}

/// Count of live resources, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub textures: usize,
    pub geometries: usize,
    pub materials: usize,
    pub meshes: usize,
}

impl ResourceCounts {
    pub fn total(&self) -> usize {
        self.textures + self.geometries + self.materials + self.meshes
    }
}

/// A rendering backend that owns resource storage.
///
/// Creation hands out ids; each id must be disposed exactly once.
pub trait GpuBackend {
    fn create_texture(&mut self, image: &DecodedImage, desc: TextureDesc) -> TextureId;
    fn dispose_texture(&mut self, id: TextureId);

    fn create_plane_geometry(&mut self, size: PlaneSize) -> GeometryId;
    fn dispose_geometry(&mut self, id: GeometryId);

    fn create_material(&mut self, desc: MaterialDesc) -> MaterialId;
    fn dispose_material(&mut self, id: MaterialId);

    /// Add a mesh to the scene.
    fn create_mesh(&mut self, geometry: GeometryId, material: MaterialId, desc: MeshDesc) -> MeshId;
    /// Remove a mesh from the scene. Its geometry and material are not touched.
    fn dispose_mesh(&mut self, id: MeshId);

    /// Swap a mesh's geometry, returning the previous one to the caller.
    fn set_mesh_geometry(&mut self, mesh: MeshId, geometry: GeometryId) -> Option<GeometryId>;
    fn set_mesh_transform(&mut self, mesh: MeshId, transform: Transform);
    /// Live transform of a mesh.
    fn mesh_transform(&self, mesh: MeshId) -> Option<Transform>;

    fn resource_counts(&self) -> ResourceCounts;
}

/// The resources that make up one textured plane.
#[derive(Debug, PartialEq, Eq)]
pub struct MeshBundle {
    pub mesh: MeshId,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub texture: Option<TextureId>,
}

impl MeshBundle {
    /// Create a textured plane in one go.
    pub fn create_plane(
        backend: &mut dyn GpuBackend,
        image: &DecodedImage,
        texture_desc: TextureDesc,
        size: PlaneSize,
        material: MaterialDesc,
        mesh: MeshDesc,
    ) -> Self {
        let texture = backend.create_texture(image, texture_desc);
        let geometry = backend.create_plane_geometry(size);
        let material = backend.create_material(MaterialDesc {
            texture: Some(texture),
            ..material
        });
        let mesh = backend.create_mesh(geometry, material, mesh);
        Self {
            mesh,
            geometry,
            material,
            texture: Some(texture),
        }
    }

    /// Replace the plane geometry, keeping texture and material.
    pub fn resize(&mut self, backend: &mut dyn GpuBackend, size: PlaneSize) {
        let geometry = backend.create_plane_geometry(size);
        if let Some(old) = backend.set_mesh_geometry(self.mesh, geometry) {
            backend.dispose_geometry(old);
        }
        self.geometry = geometry;
    }

    /// Remove the mesh and dispose geometry, material and texture.
    pub fn release(self, backend: &mut dyn GpuBackend) {
        backend.dispose_mesh(self.mesh);
        backend.dispose_geometry(self.geometry);
        backend.dispose_material(self.material);
        if let Some(texture) = self.texture {
            backend.dispose_texture(texture);
        }
    }
}

/// Holds at most one [`MeshBundle`]. Replacing disposes the previous bundle.
#[derive(Debug, Default)]
pub struct ResourceSlot {
    bundle: Option<MeshBundle>,
}

impl ResourceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&MeshBundle> {
        self.bundle.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut MeshBundle> {
        self.bundle.as_mut()
    }

    pub fn is_occupied(&self) -> bool {
        self.bundle.is_some()
    }

    /// Install `bundle`, releasing whatever was there.
    pub fn replace(&mut self, backend: &mut dyn GpuBackend, bundle: MeshBundle) {
        if let Some(old) = self.bundle.replace(bundle) {
            old.release(backend);
        }
    }

    /// Release the held bundle, if any. Returns true if something was released.
    pub fn clear(&mut self, backend: &mut dyn GpuBackend) -> bool {
        match self.bundle.take() {
            Some(old) => {
                old.release(backend);
                true
            }
            None => false,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CountingBackend;
    use super::*;

    fn bundle(backend: &mut CountingBackend) -> MeshBundle {
        MeshBundle::create_plane(
            backend,
            &DecodedImage::solid(4, 2, [255; 4]),
            TextureDesc::default(),
            PlaneSize::new(2.0, 1.0),
            MaterialDesc::default(),
            MeshDesc {
                transform: Transform::IDENTITY,
                render_order: 0,
            },
        )
    }

    #[test]
    fn test_create_plane_links_texture_to_material() {
        let mut backend = CountingBackend::default();
        let b = bundle(&mut backend);
        assert_eq!(backend.materials[&b.material].texture, b.texture);
        assert_eq!(backend.resource_counts().total(), 4);
    }

    #[test]
    fn test_slot_replace_disposes_previous() {
        let mut backend = CountingBackend::default();
        let mut slot = ResourceSlot::new();

        let first = bundle(&mut backend);
        let first_mesh = first.mesh;
        slot.replace(&mut backend, first);
        let second = bundle(&mut backend);
        slot.replace(&mut backend, second);

        assert_eq!(backend.resource_counts().total(), 4);
        assert!(!backend.meshes.contains_key(&first_mesh));

        assert!(slot.clear(&mut backend));
        assert!(!slot.clear(&mut backend));
        assert_eq!(backend.resource_counts(), ResourceCounts::default());
    }

    #[test]
    fn test_resize_swaps_geometry_only() {
        let mut backend = CountingBackend::default();
        let mut b = bundle(&mut backend);
        let texture = b.texture;
        let old_geometry = b.geometry;

        b.resize(&mut backend, PlaneSize::new(3.0, 1.5));

        assert_ne!(b.geometry, old_geometry);
        assert_eq!(b.texture, texture);
        assert_eq!(backend.geometries[&b.geometry], PlaneSize::new(3.0, 1.5));
        assert_eq!(backend.resource_counts().total(), 4);
        b.release(&mut backend);
        assert_eq!(backend.resource_counts().total(), 0);
    }
}
