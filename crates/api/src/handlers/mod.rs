pub mod link_preview;
pub mod media;
pub mod pages;
