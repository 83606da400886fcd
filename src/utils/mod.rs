//! Shared helpers for paths, processes and HTML text.

pub mod exec;
pub mod html;
pub mod mime;
pub mod path;
pub mod size;
