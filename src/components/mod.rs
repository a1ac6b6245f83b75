pub mod dialog;
pub mod tree;
