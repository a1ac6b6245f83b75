//! Filesystem side of the tree: the access port and the child resolver.

pub mod port;
pub mod resolver;
