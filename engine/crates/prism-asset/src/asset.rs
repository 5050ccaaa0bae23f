use crate::catalog::CatalogEntry;
use crate::error::AssetError;

/// 可以被 [`crate::AssetBundle`] 管理的资源
///
/// `Ctx` 是 load / unload 所需的上下文，真实环境下是 [`crate::GpuUploadContext`]。
///
/// - `load` 和 `unload` 在一次运行中各调用一次
/// - `unload` 按 `load` 分配 handle 的相反顺序释放，之后资源不再持有任何 handle
/// - 对未加载的资源调用 `unload` 什么也不做
pub trait Asset<Ctx> {
    fn name(&self) -> &str;

    fn load(&mut self, ctx: &Ctx) -> Result<(), AssetError>;

    fn unload(&mut self, ctx: &Ctx) -> Result<(), AssetError>;

    fn is_loaded(&self) -> bool;

    /// 加载完成之后发布给 renderer 的绑定信息
    fn catalog_entry(&self) -> Option<CatalogEntry> {
        None
    }
}
