//! Per-item diagram planes: creation, transform sync, picking, release.

use crate::camera::PerspectiveCamera;
use crate::geometry::{DIAGRAM_MAX_SIZE, PlaneSize, fit_to_max_dimension};
use crate::image::DecodedImage;
use crate::items::{DiagramItem, DiagramStore, ItemId, TextureState};
use crate::resources::{ColorSpace, GpuBackend, MaterialDesc, MeshBundle, MeshDesc, TextureDesc, TextureFilter};
use crate::transform::Transform;
use kurbo::Point;
use std::collections::HashMap;

/// Render order shared by all diagram planes. Depth testing sorts them out.
pub const DIAGRAM_RENDER_ORDER: i32 = 0;

#[derive(Debug)]
struct PlaneEntry {
    bundle: MeshBundle,
    size: PlaneSize,
    /// Transform last written to the mesh.
    applied: Transform,
}

/// Mesh bookkeeping for every diagram item whose texture has loaded.
#[derive(Debug)]
pub struct DiagramPlanes {
    max_size: f32,
    planes: HashMap<ItemId, PlaneEntry>,
}

impl Default for DiagramPlanes {
    fn default() -> Self {
        Self::new(DIAGRAM_MAX_SIZE)
    }
}

impl DiagramPlanes {
    pub fn new(max_size: f32) -> Self {
        Self {
            max_size,
            planes: HashMap::new(),
        }
    }

    /// Create the plane for a freshly decoded item texture.
    ///
    /// Marks the item ready. An existing plane for the same item is released.
    pub fn install(&mut self, item: &mut DiagramItem, image: &DecodedImage, backend: &mut dyn GpuBackend) -> PlaneSize {
        let size = fit_to_max_dimension(image.width as f32, image.height as f32, self.max_size);
        let bundle = MeshBundle::create_plane(
            backend,
            image,
            TextureDesc {
                color_space: ColorSpace::Srgb,
                min_filter: TextureFilter::Linear,
                mag_filter: TextureFilter::Linear,
            },
            size,
            MaterialDesc {
                double_sided: true,
                transparent: true,
                opacity: 1.0,
                tone_mapped: false,
                ..MaterialDesc::default()
            },
            MeshDesc {
                transform: item.transform,
                render_order: DIAGRAM_RENDER_ORDER,
            },
        );

        let entry = PlaneEntry {
            bundle,
            size,
            applied: item.transform,
        };
        if let Some(old) = self.planes.insert(item.id(), entry) {
            old.bundle.release(backend);
        }
        item.texture = TextureState::Ready { plane: size };
        log::debug!("Diagram {} plane {:.2}x{:.2}", item.id(), size.width, size.height);
        size
    }

    /// Push changed item transforms into their meshes. Returns how many changed.
    pub fn sync(&mut self, store: &DiagramStore, backend: &mut dyn GpuBackend) -> usize {
        let mut changed = 0;
        for item in store.iter() {
            let Some(entry) = self.planes.get_mut(&item.id()) else {
                continue;
            };
            if entry.applied != item.transform {
                backend.set_mesh_transform(entry.bundle.mesh, item.transform);
                entry.applied = item.transform;
                changed += 1;
            }
        }
        changed
    }

    /// Write a transform straight into an item's mesh and read it back.
    ///
    /// Used while dragging, so the reported value is what the mesh holds.
    pub fn write_transform(
        &mut self,
        id: ItemId,
        transform: Transform,
        backend: &mut dyn GpuBackend,
    ) -> Option<Transform> {
        let entry = self.planes.get_mut(&id)?;
        backend.set_mesh_transform(entry.bundle.mesh, transform);
        let live = backend.mesh_transform(entry.bundle.mesh)?;
        entry.applied = live;
        Some(live)
    }

    /// Live transform of an item's mesh.
    pub fn mesh_transform(&self, id: ItemId, backend: &dyn GpuBackend) -> Option<Transform> {
        let entry = self.planes.get(&id)?;
        backend.mesh_transform(entry.bundle.mesh)
    }

    /// Release an item's plane. Returns false if it had none.
    pub fn release(&mut self, id: ItemId, backend: &mut dyn GpuBackend) -> bool {
        match self.planes.remove(&id) {
            Some(entry) => {
                entry.bundle.release(backend);
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self, backend: &mut dyn GpuBackend) {
        let count = self.planes.len();
        for (_, entry) in self.planes.drain() {
            entry.bundle.release(backend);
        }
        if count > 0 {
            log::debug!("Released {} diagram planes", count);
        }
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.planes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn size(&self, id: ItemId) -> Option<PlaneSize> {
        self.planes.get(&id).map(|entry| entry.size)
    }

    pub fn bundle(&self, id: ItemId) -> Option<&MeshBundle> {
        self.planes.get(&id).map(|entry| &entry.bundle)
    }

    /// The item that should show a gizmo, if any.
    pub fn gizmo_target(&self, selected: Option<ItemId>, exporting: bool) -> Option<ItemId> {
        if exporting {
            return None;
        }
        selected.filter(|id| self.planes.contains_key(id))
    }

    /// Nearest plane under a screen point.
    pub fn pick(&self, store: &DiagramStore, camera: &PerspectiveCamera, screen: Point) -> Option<ItemId> {
        let ray = camera.screen_ray(screen);
        let mut best: Option<(f32, ItemId)> = None;

        for item in store.iter() {
            let Some(entry) = self.planes.get(&item.id()) else {
                continue;
            };
            let matrix = item.transform.matrix();
            if matrix.determinant().abs() <= f32::EPSILON {
                continue;
            }
            let inverse = matrix.inverse();
            let origin = inverse.transform_point3(ray.origin);
            let direction = inverse.transform_vector3(ray.direction);
            if direction.z.abs() <= f32::EPSILON {
                continue;
            }
            let t = -origin.z / direction.z;
            if t <= 0.0 {
                continue;
            }
            let local = origin + direction * t;
            if local.x.abs() > entry.size.width / 2.0 || local.y.abs() > entry.size.height / 2.0 {
                continue;
            }
            let distance = (matrix.transform_point3(local) - ray.origin).length();
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, item.id()));
            }
        }

        best.map(|(_, id)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageRef;
    use crate::resources::testing::CountingBackend;
    use glam::Vec3;

    fn store_with(count: usize) -> (DiagramStore, Vec<ItemId>) {
        let mut store = DiagramStore::new();
        let ids = (0..count)
            .map(|i| store.add(ImageRef::from_path(format!("{i}.png")), None))
            .collect();
        (store, ids)
    }

    fn install(planes: &mut DiagramPlanes, store: &mut DiagramStore, id: ItemId, backend: &mut CountingBackend) {
        let item = store.get_mut(id).unwrap();
        planes.install(item, &DecodedImage::solid(200, 100, [0, 0, 0, 255]), backend);
    }

    #[test]
    fn test_install_sizes_and_marks_ready() {
        let mut backend = CountingBackend::default();
        let (mut store, ids) = store_with(1);
        let mut planes = DiagramPlanes::default();

        install(&mut planes, &mut store, ids[0], &mut backend);

        assert_eq!(planes.size(ids[0]), Some(PlaneSize::new(2.0, 1.0)));
        assert!(store.get(ids[0]).unwrap().is_ready());
        let material = backend.materials[&planes.bundle(ids[0]).unwrap().material];
        assert!(material.double_sided);
        assert!(material.transparent);
        assert_eq!(material.opacity, 1.0);
    }

    #[test]
    fn test_sync_only_touches_changed_items() {
        let mut backend = CountingBackend::default();
        let (mut store, ids) = store_with(2);
        let mut planes = DiagramPlanes::default();
        for &id in &ids {
            install(&mut planes, &mut store, id, &mut backend);
        }

        assert_eq!(planes.sync(&store, &mut backend), 0);
        let moved = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        store.set_transform(ids[1], moved);
        assert_eq!(planes.sync(&store, &mut backend), 1);
        assert_eq!(planes.sync(&store, &mut backend), 0);

        let mesh = planes.bundle(ids[1]).unwrap().mesh;
        assert_eq!(backend.mesh_transform(mesh), Some(moved));
    }

    #[test]
    fn test_write_transform_reads_back() {
        let mut backend = CountingBackend::default();
        let (mut store, ids) = store_with(1);
        let mut planes = DiagramPlanes::default();
        install(&mut planes, &mut store, ids[0], &mut backend);

        let moved = Transform::from_position(Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(planes.write_transform(ids[0], moved, &mut backend), Some(moved));
        assert_eq!(planes.mesh_transform(ids[0], &backend), Some(moved));
        assert_eq!(planes.write_transform(ItemId::now_v7(), moved, &mut backend), None);
    }

    #[test]
    fn test_release_frees_resources() {
        let mut backend = CountingBackend::default();
        let (mut store, ids) = store_with(3);
        let mut planes = DiagramPlanes::default();
        for &id in &ids {
            install(&mut planes, &mut store, id, &mut backend);
        }

        assert!(planes.release(ids[1], &mut backend));
        assert!(!planes.release(ids[1], &mut backend));
        assert_eq!(backend.resource_counts().meshes, 2);

        planes.release_all(&mut backend);
        assert_eq!(backend.resource_counts().total(), 0);
        assert!(planes.is_empty());
    }

    #[test]
    fn test_gizmo_target() {
        let mut backend = CountingBackend::default();
        let (mut store, ids) = store_with(2);
        let mut planes = DiagramPlanes::default();
        install(&mut planes, &mut store, ids[0], &mut backend);

        assert_eq!(planes.gizmo_target(Some(ids[0]), false), Some(ids[0]));
        assert_eq!(planes.gizmo_target(Some(ids[0]), true), None);
        // Pending items have no plane to attach to.
        assert_eq!(planes.gizmo_target(Some(ids[1]), false), None);
        assert_eq!(planes.gizmo_target(None, false), None);
    }

    #[test]
    fn test_pick_nearest_plane() {
        let mut backend = CountingBackend::default();
        let (mut store, ids) = store_with(2);
        let mut planes = DiagramPlanes::default();
        for &id in &ids {
            install(&mut planes, &mut store, id, &mut backend);
        }
        store.set_transform(ids[1], Transform::from_position(Vec3::new(0.0, 0.0, 1.0)));

        let camera = PerspectiveCamera::new();
        let center = Point::new(camera.viewport.width / 2.0, camera.viewport.height / 2.0);
        assert_eq!(planes.pick(&store, &camera, center), Some(ids[1]));
        assert_eq!(planes.pick(&store, &camera, Point::new(2.0, 2.0)), None);
    }

    #[test]
    fn test_pick_rotated_plane() {
        let mut backend = CountingBackend::default();
        let (mut store, ids) = store_with(1);
        let mut planes = DiagramPlanes::default();
        install(&mut planes, &mut store, ids[0], &mut backend);

        let camera = PerspectiveCamera::new();
        let near_edge = camera.world_to_screen(Vec3::new(0.9, 0.0, 0.0)).unwrap();
        assert_eq!(planes.pick(&store, &camera, near_edge), Some(ids[0]));

        // Turned 60 degrees about Y, the plane no longer reaches that far.
        store.set_transform(
            ids[0],
            Transform::IDENTITY.with_rotation(Vec3::new(0.0, std::f32::consts::FRAC_PI_3, 0.0)),
        );
        assert_eq!(planes.pick(&store, &camera, near_edge), None);

        let center = Point::new(camera.viewport.width / 2.0, camera.viewport.height / 2.0);
        assert_eq!(planes.pick(&store, &camera, center), Some(ids[0]));
    }
}
