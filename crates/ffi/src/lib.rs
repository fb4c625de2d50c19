//! C ABI for embedding the decoders in a host runtime.
//!
//! Every function returns an `i32`: zero or a positive count on success, a
//! negative [`Error`] code on failure. Panics are caught at the boundary.
//! Codes `-10..=-19` mean a handle could not be opened; `-20` and below mean
//! a call on an open handle failed and the handle is still usable.
//!
//! Hosts with a global execution lock pass an [`McHostLock`] so native work
//! runs with that lock released. Frame callbacks always run with it held.

mod api;
mod error;
mod ffi;
mod host;

pub use api::*;
pub use error::*;
pub use host::McHostLock;
