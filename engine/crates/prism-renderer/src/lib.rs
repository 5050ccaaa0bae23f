//! Prism 的渲染层
//!
//! - [`frame`]：每帧的 acquire → wait → record → submit → present 流程
//! - [`shape`]：各类 shape renderer，每一类独立管理自己的 pipeline 与定长顶点 buffer
//! - [`components`]：renderer 能够识别的 ECS 组件

pub mod components;
pub mod error;
pub mod frame;
pub mod projection;
pub mod recorder;
pub mod settings;
pub mod shader_library;
pub mod shape;

pub use error::{CollectError, RenderError};
pub use settings::RendererSettings;
