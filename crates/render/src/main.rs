//! Build a castle from a JSON layout (or the built-in one), paint it to SVG,
//! then replay height edits and paint each intermediate state.
//!
//! Usage: `castle_render [layout.json]`

mod layout;
mod svg;

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use castle_architecture::Castle;
use castle_shape::Material;
use tracing::{info, warn};

use crate::layout::Layout;
use crate::svg::SvgBackend;

const WIDTH: f64 = 1200.0;
const HEIGHT: f64 = 800.0;

fn paint(
    castle: &mut Castle,
    backend: &mut SvgBackend,
    material: &Material,
    path: PathBuf,
    title: &str,
) -> Result<(), Box<dyn Error>> {
    backend.begin_frame();
    castle.render(backend, material);
    fs::write(&path, backend.to_svg(WIDTH, HEIGHT, title))?;
    info!(
        path = %path.display(),
        triangles = backend.frame_triangles(),
        culled = backend.culled_triangles(),
        meshes = backend.resident(),
        nodes = castle.node_count(),
        "frame written"
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "castle_render=info,castle_architecture=info".into()),
        )
        .init();

    let layout = match std::env::args_os().nth(1) {
        Some(path) => Layout::load(path.as_ref())?,
        None => {
            info!("no layout given, using the built-in one");
            Layout::default()
        }
    };
    fs::create_dir_all(&layout.output_dir)?;

    let mut built = layout.build()?;
    let mut backend = SvgBackend::new();
    let material = Material::default();

    paint(
        &mut built.castle,
        &mut backend,
        &material,
        layout.output_dir.join("castle.svg"),
        "Castle",
    )?;

    for (i, edit) in layout.edits.iter().enumerate() {
        let Some(id) = built.resolve(edit.part) else {
            warn!(part = ?edit.part, "edit refers to a missing part, skipped");
            continue;
        };
        built.castle.set_height(id, edit.height)?;
        paint(
            &mut built.castle,
            &mut backend,
            &material,
            layout.output_dir.join(format!("castle_edit_{i}.svg")),
            &format!("{:?} height {}", edit.part, edit.height),
        )?;
    }

    built.castle.release(&mut backend);
    if backend.resident() != 0 {
        warn!(leaked = backend.resident(), "meshes still resident after release");
    }
    Ok(())
}
