//! Margined, chunked scalar-field storage with constructive set operations
//! (SPEC §4.2).

pub mod array2;
pub mod array3;

pub use array2::{GridWriter2, SampleArray2};
pub use array3::{GridWriter3, SampleArray3};
