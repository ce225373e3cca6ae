//! Modification-log replication (SPEC §4.5/§6): wire frame encode/decode,
//! per-observer cursors, and authority/observer drivers for both dimension
//! families.

mod cursor;
mod frame;
mod replication2;
mod replication3;
mod transport;

pub use cursor::ObserverCursor;
pub use frame::{decode_frame, encode_frame, ModificationFrame};
pub use replication2::{receive_frame as receive_frame2, ReplicationServer2};
pub use replication3::{receive_frame as receive_frame3, ReplicationServer3};
pub use transport::{ObserverId, ReplicationTransport, TransportError};
