use prism_app::{Engine, WindowConfig};

/// 运行在 [`crate::app::WinitApp`] 中的具体应用
pub trait OuterApp {
    fn window_config(&self) -> WindowConfig {
        WindowConfig::default()
    }

    /// 在引擎初始化之前调用：注册资源、生成实体、添加每帧 system
    fn init(&mut self, engine: &mut Engine) -> anyhow::Result<()>;

    /// 每次重绘之前调用
    fn update(&mut self, _world: &mut hecs::World, _delta_seconds: f32) {}
}
