//! Per-chunk state: sample array ownership, background mesh rebuilds, and
//! the bounded main-thread follow-up queue (SPEC §4.3).

pub mod chunk2;
pub mod chunk3;
pub mod key;
pub mod mesh_task;

pub use chunk2::{Chunk2, MeshPollOutcome as MeshPollOutcome2, RawMeshData2};
pub use chunk3::{Chunk3, MeshPollOutcome as MeshPollOutcome3, RawMeshData3};
pub use key::{ChunkKey2, ChunkKey3};
