//! Request, response and document types.
//!
//! These are plain data carriers; encoding and decoding live in
//! [`crate::codec`].

mod acl;
mod bucket_config;
mod common;
mod requests;
mod responses;

pub use acl::*;
pub use bucket_config::*;
pub use common::*;
pub use requests::*;
pub use responses::*;
