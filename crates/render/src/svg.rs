//! Headless backend that keeps uploaded soups and paints each frame as a
//! flat-shaded isometric SVG.

use std::collections::HashMap;
use std::fmt::Write as _;

use castle_kernel::PolygonSoup;
use castle_shape::{Material, MeshHandle, RenderBackend};
use nalgebra::{Point3, Vector3};
use tracing::trace;

const ANGLE_X: f64 = 0.6;
const ANGLE_Z: f64 = 0.8;

/// World (Y up) into the view frame. `x` is screen right, `z` screen up,
/// `y` points away from the viewer.
fn to_view(v: Vector3<f64>) -> Vector3<f64> {
    let (x, y, z) = (v.x, -v.z, v.y);
    let rx = x * ANGLE_Z.cos() - y * ANGLE_Z.sin();
    let ry = x * ANGLE_Z.sin() + y * ANGLE_Z.cos();
    Vector3::new(
        rx,
        ry * ANGLE_X.cos() - z * ANGLE_X.sin(),
        ry * ANGLE_X.sin() + z * ANGLE_X.cos(),
    )
}

#[derive(Debug, Clone)]
struct FrameTriangle {
    corners: [Vector3<f64>; 3],
    color: [u8; 3],
}

impl FrameTriangle {
    fn depth(&self) -> f64 {
        (self.corners[0].y + self.corners[1].y + self.corners[2].y) / 3.0
    }
}

#[derive(Debug, Default)]
pub struct SvgBackend {
    meshes: HashMap<MeshHandle, PolygonSoup>,
    next: u64,
    material: Material,
    frame: Vec<FrameTriangle>,
    culled: usize,
}

impl SvgBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        self.frame.clear();
        self.culled = 0;
    }

    /// Meshes currently uploaded.
    pub fn resident(&self) -> usize {
        self.meshes.len()
    }

    pub fn frame_triangles(&self) -> usize {
        self.frame.len()
    }

    pub fn culled_triangles(&self) -> usize {
        self.culled
    }

    fn shade(&self, normal: &Vector3<f64>) -> [u8; 3] {
        let light = Vector3::new(0.3, 0.8, 0.5).normalize();
        let lambert = normal.dot(&light).max(0.0);
        let facing = to_view(*normal).y.abs().min(1.0);
        let rim = self.material.fresnel as f64 * (1.0 - facing).powi(5);
        let brightness = 0.3 + 0.7 * lambert;
        self.material.base_color.map(|c| {
            let lit = c as f64 * brightness;
            ((lit + (1.0 - lit) * rim).clamp(0.0, 1.0) * 255.0) as u8
        })
    }

    /// Paint the current frame far-to-near.
    pub fn to_svg(&self, width: f64, height: f64, title: &str) -> String {
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" style=\"background:#1a1a2e\">\n\
             <text x=\"{}\" y=\"20\" font-family=\"monospace\" font-size=\"13\" fill=\"#8892b0\" text-anchor=\"middle\">{title}</text>\n",
            width / 2.0
        );
        if self.frame.is_empty() {
            svg.push_str("</svg>\n");
            return svg;
        }

        let (mut min_x, mut max_x) = (f64::MAX, f64::MIN);
        let (mut min_y, mut max_y) = (f64::MAX, f64::MIN);
        for corner in self.frame.iter().flat_map(|t| t.corners.iter()) {
            min_x = min_x.min(corner.x);
            max_x = max_x.max(corner.x);
            min_y = min_y.min(-corner.z);
            max_y = max_y.max(-corner.z);
        }

        let padding = 40.0;
        let avail_w = width - 2.0 * padding;
        let avail_h = height - 2.0 * padding - 25.0;
        let data_w = (max_x - min_x).max(0.001);
        let data_h = (max_y - min_y).max(0.001);
        let scale = (avail_w / data_w).min(avail_h / data_h);
        let offset_x = padding + (avail_w - data_w * scale) / 2.0;
        let offset_y = padding + 25.0 + (avail_h - data_h * scale) / 2.0;
        let tx = |v: &Vector3<f64>| {
            (
                (v.x - min_x) * scale + offset_x,
                (-v.z - min_y) * scale + offset_y,
            )
        };

        let mut order: Vec<&FrameTriangle> = self.frame.iter().collect();
        order.sort_by(|a, b| b.depth().total_cmp(&a.depth()));

        let stroke_width = if order.len() > 2000 { 0.1 } else { 0.3 };
        for tri in order {
            let [(x0, y0), (x1, y1), (x2, y2)] = tri.corners.each_ref().map(|c| tx(c));
            let [r, g, b] = tri.color;
            let _ = writeln!(
                svg,
                "  <polygon points=\"{x0:.1},{y0:.1} {x1:.1},{y1:.1} {x2:.1},{y2:.1}\" \
                 fill=\"rgb({r},{g},{b})\" stroke=\"rgb({r},{g},{b})\" stroke-width=\"{stroke_width}\"/>"
            );
        }

        let _ = writeln!(
            svg,
            "  <text x=\"{}\" y=\"{}\" font-family=\"monospace\" font-size=\"10\" fill=\"#5a6080\" \
             text-anchor=\"middle\">{} triangles, {} meshes</text>",
            width / 2.0,
            height - 8.0,
            self.frame.len(),
            self.meshes.len()
        );
        svg.push_str("</svg>\n");
        svg
    }
}

impl RenderBackend for SvgBackend {
    fn upload(&mut self, soup: &PolygonSoup, reuse: Option<MeshHandle>) -> MeshHandle {
        let handle = match reuse {
            Some(handle) if self.meshes.contains_key(&handle) => handle,
            _ => {
                self.next += 1;
                MeshHandle(self.next)
            }
        };
        trace!(?handle, triangles = soup.triangles.len(), "upload");
        self.meshes.insert(handle, soup.clone());
        handle
    }

    fn release(&mut self, handle: MeshHandle) {
        self.meshes.remove(&handle);
    }

    fn set_material(&mut self, material: &Material) {
        self.material = *material;
    }

    fn draw(&mut self, handle: MeshHandle) {
        let Some(soup) = self.meshes.get(&handle) else {
            return;
        };
        let mut painted = Vec::with_capacity(soup.triangles.len());
        let mut culled = 0;
        for &tri in &soup.triangles {
            let [a, b, c]: [Point3<f64>; 3] = tri.map(|i| soup.positions[i as usize]);
            let Some(normal) = (b - a).cross(&(c - a)).try_normalize(1e-12) else {
                continue;
            };
            if to_view(normal).y > 0.0 {
                culled += 1;
                continue;
            }
            painted.push(FrameTriangle {
                corners: [a, b, c].map(|p| to_view(p.coords)),
                color: self.shade(&normal),
            });
        }
        self.culled += culled;
        self.frame.extend(painted);
    }
}
