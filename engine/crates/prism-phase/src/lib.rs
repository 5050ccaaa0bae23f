//! 阶段图
//!
//! 引擎的各个子系统（Instance、Device、Swapchain、Render、Assets ...）只声明自己处于哪两个阶段之间，
//! 由 [`PhaseGraph`] 统一维护初始化顺序以及与之严格镜像的销毁顺序。

pub mod error;
pub mod phase_graph;

pub use error::PhaseError;
pub use phase_graph::PhaseGraph;

/// 引擎内置的生命周期阶段名称
pub mod phases {
    pub const START: &str = "Start";
    pub const INSTANCE: &str = "Instance";
    pub const DEVICE: &str = "Device";
    pub const SWAPCHAIN: &str = "Swapchain";
    pub const RENDER: &str = "Render";
    pub const ASSETS: &str = "Assets";
    pub const END: &str = "End";

    /// 每帧执行的阶段
    pub const PRE_DRAW: &str = "PreDraw";
    pub const DRAW: &str = "Draw";
    pub const POST_DRAW: &str = "PostDraw";
}
