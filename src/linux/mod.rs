//! Linux TAP transport.

pub mod dev;
pub mod libc;
pub mod tap;
