// Engine module - simulation core plus the rendering helpers around it

pub mod camera;
pub mod components;
pub mod config;
pub mod debug_overlay;
pub mod helm;
pub mod input;
pub mod mesh;
pub mod obstacle;
pub mod probe;
pub mod scene;
pub mod steering;
pub mod systems;

// Re-export commonly used items
pub use components::*;
