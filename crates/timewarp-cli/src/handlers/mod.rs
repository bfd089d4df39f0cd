pub mod branch;
pub mod list;
pub mod reconstruct;
pub mod replay;
pub mod show;
pub mod timeline;
pub mod validate;
