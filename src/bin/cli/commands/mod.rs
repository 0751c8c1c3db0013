pub mod delete;
pub mod list;
pub mod seed;
pub mod tree;
