//! Drawing surfaces, primitive strategies, batched execution and the CPU raster backend.

pub(crate) mod batch;
pub(crate) mod composite;
pub(crate) mod exec;
pub(crate) mod path;
pub(crate) mod primitives;
pub(crate) mod raster;
pub(crate) mod recording;
pub(crate) mod surface;
pub(crate) mod text;
