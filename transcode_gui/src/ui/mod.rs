pub mod quality;
pub mod toolbar;
pub mod windows;
