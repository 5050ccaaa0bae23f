pub mod app;
pub mod outer_app;
pub mod shapes_demo;
