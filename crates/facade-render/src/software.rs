//! CPU renderer that owns scene resources and draws textured planes.

use crate::raster::{ClipVertex, RasterState, rasterize_triangle};
use crate::renderer::{RenderContext, RenderResult, Renderer, RendererError};
use crate::surface::SurfaceHandle;
use facade_core::geometry::PlaneSize;
use facade_core::image::DecodedImage;
use facade_core::resources::{
    ColorSpace, GeometryId, GpuBackend, MaterialDesc, MaterialId, MeshDesc, MeshId, ResourceCounts, TextureDesc,
    TextureFilter, TextureId,
};
use facade_core::transform::Transform;
use glam::{Mat4, Vec3};
use peniko::Color;
use std::collections::HashMap;

/// Uploaded texture.
#[derive(Debug)]
struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    desc: TextureDesc,
}

impl Texture {
    /// Clamp-to-edge texel fetch. Missing pixel data reads as transparent.
    fn texel(&self, x: i64, y: i64) -> [f32; 4] {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let i = (y * self.width as usize + x) * 4;
        match self.pixels.get(i..i + 4) {
            Some(px) => [px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32],
            None => [0.0; 4],
        }
    }

    /// Sample at normalised UV, returning display-ready (sRGB) RGBA in 0..255.
    fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let x = u * self.width as f32;
        let y = v * self.height as f32;
        let mut texel = match self.desc.mag_filter {
            TextureFilter::Nearest => self.texel(x.floor() as i64, y.floor() as i64),
            TextureFilter::Linear => {
                let x = x - 0.5;
                let y = y - 0.5;
                let x0 = x.floor();
                let y0 = y.floor();
                let fx = x - x0;
                let fy = y - y0;
                let (x0, y0) = (x0 as i64, y0 as i64);
                let t00 = self.texel(x0, y0);
                let t10 = self.texel(x0 + 1, y0);
                let t01 = self.texel(x0, y0 + 1);
                let t11 = self.texel(x0 + 1, y0 + 1);
                let mut out = [0.0; 4];
                for c in 0..4 {
                    let top = t00[c] + (t10[c] - t00[c]) * fx;
                    let bottom = t01[c] + (t11[c] - t01[c]) * fx;
                    out[c] = top + (bottom - top) * fy;
                }
                out
            }
        };
        if self.desc.color_space == ColorSpace::Linear {
            for c in texel.iter_mut().take(3) {
                *c = linear_to_srgb(*c / 255.0) * 255.0;
            }
        }
        texel
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn color_to_rgba8(color: Color) -> [u8; 4] {
    let c = color.to_rgba8();
    [c.r, c.g, c.b, c.a]
}

#[derive(Debug, Clone, Copy)]
struct MeshRecord {
    geometry: GeometryId,
    material: MaterialId,
    transform: Transform,
    render_order: i32,
}

/// Software renderer.
///
/// Owns every texture, geometry, material and mesh created through
/// [`GpuBackend`], and draws them into a [`SurfaceHandle`].
#[derive(Debug)]
pub struct SoftwareRenderer {
    next_id: u64,
    textures: HashMap<TextureId, Texture>,
    geometries: HashMap<GeometryId, PlaneSize>,
    materials: HashMap<MaterialId, MaterialDesc>,
    meshes: HashMap<MeshId, MeshRecord>,
    surface: SurfaceHandle,
}

impl SoftwareRenderer {
    /// Create a renderer drawing into a new surface.
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_surface(SurfaceHandle::new(width, height))
    }

    pub fn with_surface(surface: SurfaceHandle) -> Self {
        Self {
            next_id: 0,
            textures: HashMap::new(),
            geometries: HashMap::new(),
            materials: HashMap::new(),
            meshes: HashMap::new(),
            surface,
        }
    }

    /// The render target. Clones share the same framebuffer.
    pub fn surface(&self) -> SurfaceHandle {
        self.surface.clone()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn draw_mesh(
        &self,
        fb: &mut crate::raster::Framebuffer,
        view_projection: Mat4,
        record: &MeshRecord,
    ) -> RenderResult<()> {
        let size = self
            .geometries
            .get(&record.geometry)
            .ok_or_else(|| RendererError::RenderFailed(format!("missing geometry {:?}", record.geometry)))?;
        let material = self
            .materials
            .get(&record.material)
            .ok_or_else(|| RendererError::RenderFailed(format!("missing material {:?}", record.material)))?;
        let texture = material.texture.and_then(|id| self.textures.get(&id));

        let mvp = view_projection * record.transform.matrix();
        let hw = size.width / 2.0;
        let hh = size.height / 2.0;
        let corner = |x: f32, y: f32, uv: [f32; 2]| ClipVertex {
            position: mvp * Vec3::new(x, y, 0.0).extend(1.0),
            uv,
        };
        let bl = corner(-hw, -hh, [0.0, 1.0]);
        let br = corner(hw, -hh, [1.0, 1.0]);
        let tr = corner(hw, hh, [1.0, 0.0]);
        let tl = corner(-hw, hh, [0.0, 0.0]);

        let state = RasterState {
            cull_back_faces: !material.double_sided,
            depth_write: material.depth_write,
        };
        let opacity = material.opacity;
        let transparent = material.transparent;
        let shade = |u: f32, v: f32| {
            let texel = texture.map(|t| t.sample(u, v)).unwrap_or([255.0; 4]);
            let alpha = if transparent { texel[3] / 255.0 * opacity } else { opacity };
            ([texel[0], texel[1], texel[2]], alpha)
        };

        rasterize_triangle(fb, [bl, br, tr], state, &shade);
        rasterize_triangle(fb, [bl, tr, tl], state, &shade);
        Ok(())
    }
}

impl Renderer for SoftwareRenderer {
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        let viewport = ctx.camera.viewport;
        let view_projection = ctx.camera.view_projection();
        let clear = color_to_rgba8(self.background_color(ctx));

        let mut order: Vec<(&MeshId, &MeshRecord)> = self.meshes.iter().collect();
        order.sort_by_key(|(id, record)| (record.render_order, **id));

        self.surface
            .with_framebuffer(|fb| -> RenderResult<()> {
                fb.resize(viewport.width.round() as usize, viewport.height.round() as usize);
                fb.clear(clear);
                for (_, record) in &order {
                    self.draw_mesh(fb, view_projection, record)?;
                }
                for line in ctx.gizmo {
                    fb.draw_line(
                        line.start.x.round() as i32,
                        line.start.y.round() as i32,
                        line.end.x.round() as i32,
                        line.end.y.round() as i32,
                        color_to_rgba8(line.color),
                    );
                }
                Ok(())
            })
            .unwrap_or_else(|| Err(RendererError::Surface("no framebuffer attached".to_string())))
    }
}

impl GpuBackend for SoftwareRenderer {
    fn create_texture(&mut self, image: &DecodedImage, desc: TextureDesc) -> TextureId {
        let id = TextureId(self.next());
        self.textures.insert(
            id,
            Texture {
                width: image.width.max(1),
                height: image.height.max(1),
                pixels: image.pixels.clone(),
                desc,
            },
        );
        id
    }

    fn dispose_texture(&mut self, id: TextureId) {
        if self.textures.remove(&id).is_none() {
            log::warn!("Dispose of unknown texture {:?}", id);
        }
    }

    fn create_plane_geometry(&mut self, size: PlaneSize) -> GeometryId {
        let id = GeometryId(self.next());
        self.geometries.insert(id, size);
        id
    }

    fn dispose_geometry(&mut self, id: GeometryId) {
        if self.geometries.remove(&id).is_none() {
            log::warn!("Dispose of unknown geometry {:?}", id);
        }
    }

    fn create_material(&mut self, desc: MaterialDesc) -> MaterialId {
        let id = MaterialId(self.next());
        self.materials.insert(id, desc);
        id
    }

    fn dispose_material(&mut self, id: MaterialId) {
        if self.materials.remove(&id).is_none() {
            log::warn!("Dispose of unknown material {:?}", id);
        }
    }

    fn create_mesh(&mut self, geometry: GeometryId, material: MaterialId, desc: MeshDesc) -> MeshId {
        let id = MeshId(self.next());
        self.meshes.insert(
            id,
            MeshRecord {
                geometry,
                material,
                transform: desc.transform,
                render_order: desc.render_order,
            },
        );
        id
    }

    fn dispose_mesh(&mut self, id: MeshId) {
        if self.meshes.remove(&id).is_none() {
            log::warn!("Dispose of unknown mesh {:?}", id);
        }
    }

    fn set_mesh_geometry(&mut self, mesh: MeshId, geometry: GeometryId) -> Option<GeometryId> {
        let record = self.meshes.get_mut(&mesh)?;
        Some(std::mem::replace(&mut record.geometry, geometry))
    }

    fn set_mesh_transform(&mut self, mesh: MeshId, transform: Transform) {
        if let Some(record) = self.meshes.get_mut(&mesh) {
            record.transform = transform;
        }
    }

    fn mesh_transform(&self, mesh: MeshId) -> Option<Transform> {
        self.meshes.get(&mesh).map(|record| record.transform)
    }

    fn resource_counts(&self) -> ResourceCounts {
        ResourceCounts {
            textures: self.textures.len(),
            geometries: self.geometries.len(),
            materials: self.materials.len(),
            meshes: self.meshes.len(),
        }
    }
}
