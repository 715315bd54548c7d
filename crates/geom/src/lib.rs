//! Load geom model containers and hand their contents to a host scene.
//!
//! This crate sits on top of [`geom_decode`]: it reads files, converts
//! decoded meshes into host-ready arrays (remapped, normalized, skinned),
//! and drives a [`MeshSink`] implemented by the host.
//!
//! ```no_run
//! let container = geom::load("chr001.geom")?;
//! let mut meshes: Vec<geom::MeshData> = Vec::new();
//! geom::import(&container, &mut meshes, &geom::ImportOptions::default())?;
//! # Ok::<(), geom::Error>(())
//! ```

mod error;

pub mod import;
pub mod normals;
pub mod options;
pub mod sink;
pub mod skinning;
pub mod tangents;

use std::path::Path;

pub use error::{Error, Result};
pub use geom_decode as decode;
pub use geom_decode::{Container, decode_container};
pub use import::{build_mesh_data, import};
pub use options::ImportOptions;
pub use sink::{MeshData, MeshSink, UvLayer};
pub use skinning::{WeightGroup, skin_weights};

/// Read a whole file and decode it as a container.
pub fn load(path: impl AsRef<Path>) -> Result<Container> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;
    tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());

    let container = decode_container(&bytes)?;
    tracing::info!(
        "Loaded {}: {} bones, {} materials, {} meshes",
        path.display(),
        container.skeleton().len(),
        container.materials().len(),
        container.meshes().len()
    );
    Ok(container)
}

/// [`load`] then [`import`] into `sink`.
pub fn load_into(
    path: impl AsRef<Path>,
    sink: &mut impl MeshSink,
    options: &ImportOptions,
) -> Result<Container> {
    let container = load(path)?;
    import(&container, sink, options)?;
    Ok(container)
}
