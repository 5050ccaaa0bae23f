use prism_winit_app::app::WinitApp;
use prism_winit_app::shapes_demo::ShapesDemo;

fn main() -> anyhow::Result<()> {
    let outer_app = Box::new(ShapesDemo);
    WinitApp::run(outer_app)
}
