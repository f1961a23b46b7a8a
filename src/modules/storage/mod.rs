//! Storage module for uploaded study documents
//!
//! Provides a MinIO/S3-compatible client for private uploads, deletion and
//! presigned download URLs.

mod minio_client;

pub use minio_client::{MinIOClient, ObjectStore};

#[cfg(test)]
pub use minio_client::testing;
