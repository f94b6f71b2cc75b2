pub mod camera;
pub mod event;
pub mod level;
pub mod loader;
pub mod save;
pub mod scene;
pub mod step;
pub mod world;
