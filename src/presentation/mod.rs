//! HTML view models, templates and page assembly for the public site.

pub mod pages;
pub mod views;
