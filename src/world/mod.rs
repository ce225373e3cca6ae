//! Owner of all chunks across all layers/volumes: modification acceptance,
//! per-chunk fan-out, mesh-update dispatch, and replication driving
//! (SPEC §4.4).

pub mod role;
pub mod world2;
pub mod world3;

pub use role::WorldRole;
pub use world2::World2;
pub use world3::World3;
