//! CPU rasterisation: framebuffer, triangle fill and line drawing.

use glam::Vec4;

/// Vertices closer than this (in clip-space w) are clipped.
const NEAR_W: f32 = 1e-3;

/// RGBA8 colour buffer with a depth buffer.
#[derive(Clone, PartialEq)]
pub struct Framebuffer {
    pub width: usize,
    pub height: usize,
    /// RGBA8, row-major, top row first.
    pub pixels: Vec<u8>,
    /// Normalised device depth, 1.0 is the far plane.
    pub zbuffer: Vec<f32>,
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![0; width * height * 4],
            zbuffer: vec![f32::INFINITY; width * height],
        }
    }

    /// Fill with a colour and reset depth.
    pub fn clear(&mut self, rgba: [u8; 4]) {
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
        self.zbuffer.fill(f32::INFINITY);
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if width.max(1) != self.width || height.max(1) != self.height {
            *self = Self::new(width, height);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }

    /// Source-over blend of a colour with the given alpha.
    pub fn blend_pixel(&mut self, x: usize, y: usize, rgb: [f32; 3], alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        let i = (y * self.width + x) * 4;
        for c in 0..3 {
            let dst = self.pixels[i + c] as f32;
            let src = rgb[c].clamp(0.0, 255.0);
            self.pixels[i + c] = (src * alpha + dst * (1.0 - alpha)).round() as u8;
        }
        let dst_a = self.pixels[i + 3] as f32 / 255.0;
        self.pixels[i + 3] = ((alpha + dst_a * (1.0 - alpha)) * 255.0).round() as u8;
    }

    /// Bresenham line, no depth test. The segment is clipped to the
    /// framebuffer first, so far off-screen endpoints cost nothing.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, rgba: [u8; 4]) {
        let max = [(self.width - 1) as f64, (self.height - 1) as f64];
        let Some([x0, y0, x1, y1]) = clip_segment([x0 as f64, y0 as f64], [x1 as f64, y1 as f64], max) else {
            return;
        };
        let (x0, y0, x1, y1) = (
            x0.round() as i32,
            y0.round() as i32,
            x1.round() as i32,
            y1.round() as i32,
        );

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = x0;
        let mut y = y0;
        let rgb = [rgba[0] as f32, rgba[1] as f32, rgba[2] as f32];
        let alpha = rgba[3] as f32 / 255.0;

        loop {
            if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
                self.blend_pixel(x as usize, y as usize, rgb, alpha);
            }

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

/// Liang-Barsky clip of `a`-`b` against `[0, max[0]] x [0, max[1]]`.
fn clip_segment(a: [f64; 2], b: [f64; 2], max: [f64; 2]) -> Option<[f64; 4]> {
    let d = [b[0] - a[0], b[1] - a[1]];
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    let edges = [
        (-d[0], a[0]),
        (d[0], max[0] - a[0]),
        (-d[1], a[1]),
        (d[1], max[1] - a[1]),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some([a[0] + t0 * d[0], a[1] + t0 * d[1], a[0] + t1 * d[0], a[1] + t1 * d[1]])
}

/// A vertex in clip space with texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipVertex {
    pub position: Vec4,
    pub uv: [f32; 2],
}

impl ClipVertex {
    fn lerp(&self, other: &ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            position: self.position.lerp(other.position, t),
            uv: [
                self.uv[0] + (other.uv[0] - self.uv[0]) * t,
                self.uv[1] + (other.uv[1] - self.uv[1]) * t,
            ],
        }
    }
}

/// Clip a triangle against the near plane. Returns a convex polygon (0, 3 or 4 vertices).
pub fn clip_near(triangle: [ClipVertex; 3]) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let a = triangle[i];
        let b = triangle[(i + 1) % 3];
        let a_in = a.position.w >= NEAR_W;
        let b_in = b.position.w >= NEAR_W;
        if a_in {
            out.push(a);
        }
        if a_in != b_in {
            let t = (NEAR_W - a.position.w) / (b.position.w - a.position.w);
            out.push(a.lerp(&b, t));
        }
    }
    out
}

/// A vertex after the perspective divide.
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    /// NDC depth in [-1, 1].
    z: f32,
    inv_w: f32,
    u_over_w: f32,
    v_over_w: f32,
}

fn to_screen(vertex: &ClipVertex, width: usize, height: usize) -> ScreenVertex {
    let inv_w = 1.0 / vertex.position.w;
    let ndc = vertex.position.truncate() * inv_w;
    ScreenVertex {
        x: (ndc.x + 1.0) * 0.5 * width as f32,
        y: (1.0 - ndc.y) * 0.5 * height as f32,
        z: ndc.z,
        inv_w,
        u_over_w: vertex.uv[0] * inv_w,
        v_over_w: vertex.uv[1] * inv_w,
    }
}

/// Per-draw raster state.
#[derive(Debug, Clone, Copy)]
pub struct RasterState {
    pub cull_back_faces: bool,
    pub depth_write: bool,
}

/// Rasterise a clip-space triangle.
///
/// `shade` maps perspective-correct UVs to an RGB colour and alpha; a
/// returned alpha of zero leaves the pixel and its depth untouched.
pub fn rasterize_triangle<F>(fb: &mut Framebuffer, triangle: [ClipVertex; 3], state: RasterState, shade: &F)
where
    F: Fn(f32, f32) -> ([f32; 3], f32),
{
    let polygon = clip_near(triangle);
    if polygon.len() < 3 {
        return;
    }
    let screen: Vec<ScreenVertex> = polygon.iter().map(|v| to_screen(v, fb.width, fb.height)).collect();
    for i in 1..screen.len() - 1 {
        fill(fb, [screen[0], screen[i], screen[i + 1]], state, shade);
    }
}

fn fill<F>(fb: &mut Framebuffer, vertices: [ScreenVertex; 3], state: RasterState, shade: &F)
where
    F: Fn(f32, f32) -> ([f32; 3], f32),
{
    let [v1, v2, v3] = vertices;

    let min_x = v1.x.min(v2.x).min(v3.x).max(0.0) as usize;
    let max_x = (v1.x.max(v2.x).max(v3.x) + 1.0).min(fb.width as f32).max(0.0) as usize;
    let min_y = v1.y.min(v2.y).min(v3.y).max(0.0) as usize;
    let max_y = (v1.y.max(v2.y).max(v3.y) + 1.0).min(fb.height as f32).max(0.0) as usize;
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    // Twice the signed area. Screen y points down, so front faces are negative.
    let area = (v2.y - v3.y) * (v1.x - v3.x) + (v3.x - v2.x) * (v1.y - v3.y);
    if area.abs() < 1e-5 {
        return;
    }
    if state.cull_back_faces && area > 0.0 {
        return;
    }
    let inv_area = 1.0 / area;

    let a0 = v2.y - v3.y;
    let b0 = v3.x - v2.x;
    let a1 = v3.y - v1.y;
    let b1 = v1.x - v3.x;

    // Sample at pixel centres.
    let start_x = min_x as f32 + 0.5;
    let start_y = min_y as f32 + 0.5;
    let mut w0_row = a0 * (start_x - v3.x) + b0 * (start_y - v3.y);
    let mut w1_row = a1 * (start_x - v3.x) + b1 * (start_y - v3.y);

    for y in min_y..max_y {
        let mut w0 = w0_row;
        let mut w1 = w1_row;

        for x in min_x..max_x {
            let bc_x = w0 * inv_area;
            let bc_y = w1 * inv_area;
            let bc_z = 1.0 - bc_x - bc_y;
            w0 += a0;
            w1 += a1;

            const ERR: f32 = -0.0001;
            if bc_x < ERR || bc_y < ERR || bc_z < ERR {
                continue;
            }

            let z = bc_x * v1.z + bc_y * v2.z + bc_z * v3.z;
            if !(-1.0..=1.0).contains(&z) {
                continue;
            }
            let idx = y * fb.width + x;
            if z >= fb.zbuffer[idx] {
                continue;
            }

            let inv_w = bc_x * v1.inv_w + bc_y * v2.inv_w + bc_z * v3.inv_w;
            let u = (bc_x * v1.u_over_w + bc_y * v2.u_over_w + bc_z * v3.u_over_w) / inv_w;
            let v = (bc_x * v1.v_over_w + bc_y * v2.v_over_w + bc_z * v3.v_over_w) / inv_w;

            let (rgb, alpha) = shade(u, v);
            if alpha <= 0.0 {
                continue;
            }
            fb.blend_pixel(x, y, rgb, alpha);
            if state.depth_write {
                fb.zbuffer[idx] = z;
            }
        }

        w0_row += b0;
        w1_row += b1;
    }
}
