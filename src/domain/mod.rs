pub mod anim;
pub mod entity;
pub mod geom;
pub mod hint;
pub mod space;
pub mod tile;
pub mod water;
