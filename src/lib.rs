//! Engine-agnostic deformable signed-distance-field geometry: chunked
//! margined sample storage, a modification log with replay/replication, and
//! the async world/chunk scheduler that drives mesh regeneration from it.
//!
//! Mirrors `voxel_plugin`'s split between an engine-independent core and a
//! host-supplied presentation layer (see [`host`]): nothing in this crate
//! renders, steps physics, or owns a socket. A 2D and a 3D family of the
//! same types live side by side (`Shape2`/`Shape3`, `World2`/`World3`, ...)
//! rather than behind a const-generic dimension parameter, the same way the
//! source keeps `OctreeNode`/volume sampling concrete instead of generic.

pub mod aabb;
pub mod chunk;
pub mod config;
pub mod constants;
pub mod error;
pub mod host;
pub mod metrics;
pub mod modification;
pub mod quantize;
pub mod replication;
pub mod sample_array;
pub mod shapes;
pub mod task;
pub mod wire;
pub mod world;

pub use config::{QualitySettings, ResourceId, ResourceOptions, TextureReference};
pub use error::{BackgroundTaskError, ProtocolError};
pub use modification::{Modification, ModificationLog, Operator};
pub use shapes::{Shape2, Shape3};
pub use world::{World2, World3, WorldRole};

#[cfg(test)]
mod integration_test;
