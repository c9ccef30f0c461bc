use castle_kernel::PolygonSoup;

/// Opaque handle to geometry uploaded to a render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u64);

/// Material uniforms set before each draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub base_color: [f32; 3],
    pub fresnel: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [0.61, 0.56, 0.52],
            fresnel: 0.5,
        }
    }
}

/// GPU-side seam of the shape tree.
pub trait RenderBackend {
    /// Upload a soup, re-using the buffers behind `reuse` when given.
    fn upload(&mut self, soup: &PolygonSoup, reuse: Option<MeshHandle>) -> MeshHandle;

    fn release(&mut self, handle: MeshHandle);

    fn set_material(&mut self, material: &Material);

    fn draw(&mut self, handle: MeshHandle);
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    Upload {
        handle: MeshHandle,
        reused: bool,
        triangles: usize,
    },
    Release(MeshHandle),
    Material(Material),
    Draw(MeshHandle),
}

/// Backend that records every call; for tests and headless statistics.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub events: Vec<RenderEvent>,
    next: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draws(&self) -> Vec<MeshHandle> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RenderEvent::Draw(h) => Some(*h),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, RenderEvent::Upload { .. }))
            .count()
    }

    pub fn releases(&self) -> Vec<MeshHandle> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RenderEvent::Release(h) => Some(*h),
                _ => None,
            })
            .collect()
    }
}

impl RenderBackend for RecordingBackend {
    fn upload(&mut self, soup: &PolygonSoup, reuse: Option<MeshHandle>) -> MeshHandle {
        let handle = reuse.unwrap_or_else(|| {
            self.next += 1;
            MeshHandle(self.next)
        });
        self.events.push(RenderEvent::Upload {
            handle,
            reused: reuse.is_some(),
            triangles: soup.triangle_count(),
        });
        handle
    }

    fn release(&mut self, handle: MeshHandle) {
        self.events.push(RenderEvent::Release(handle));
    }

    fn set_material(&mut self, material: &Material) {
        self.events.push(RenderEvent::Material(*material));
    }

    fn draw(&mut self, handle: MeshHandle) {
        self.events.push(RenderEvent::Draw(handle));
    }
}
