pub mod diffusion;
pub mod image_controller;
