//! Canvas models, multi-layer composites, snapshots and the routing manager.

pub(crate) mod composite;
pub(crate) mod manager;
pub(crate) mod model;
pub(crate) mod snapshot;
