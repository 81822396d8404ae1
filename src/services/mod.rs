//! Service implementations.
//!
//! - Objects: put, get, head, delete, batch delete, copy, list, ACL
//! - Buckets: create, delete, list, location, ACL, versioning, lifecycle, CORS
//! - Presign: presigned GET and PUT URLs
//!
//! Multipart uploads live in [`crate::multipart`].

mod buckets;
mod objects;
mod presign;

pub use buckets::BucketsService;
pub use objects::{metadata_from_headers, ObjectsService, MAX_DELETE_BATCH};
pub use presign::PresignService;
