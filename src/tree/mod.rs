//! Tree state: expansion store, smart expand, mutations, projection and the
//! engine that ties them to background work.

pub mod engine;
pub mod expansion;
pub mod layout;
pub mod mutation;
pub mod projection;
pub mod smart_expand;
