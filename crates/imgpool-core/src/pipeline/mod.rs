//! Image processing pipeline components.
//!
//! - **binder**: Runs acquire, transform, commit or abort for each task
//! - **transform**: The transform plug-in contract
//! - **invert**: Color inversion transform
//! - **codec**: Decode and re-encode images
//! - **discovery**: Find image files in directories

pub mod binder;
pub mod codec;
pub mod discovery;
pub mod invert;
pub mod transform;

// Re-exports for convenient access
pub use binder::{log_error_sink, ErrorSink, ImagePipeline, ImagePool};
pub use discovery::{open_image, DiscoveredFile, FileDiscovery};
pub use invert::InvertTransform;
pub use transform::{Passthrough, Transform};
