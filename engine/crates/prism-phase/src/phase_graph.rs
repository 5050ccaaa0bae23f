use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::error::PhaseError;

/// 初始化阶段中执行的 system，失败会中止整个启动流程
pub type InitSystem<C> = Box<dyn FnMut(&mut C) -> anyhow::Result<()>>;

/// 销毁阶段中执行的 system，不允许失败
pub type TeardownSystem<C> = Box<dyn FnMut(&mut C)>;

/// 有序的阶段图
///
/// 同时维护两条顺序：
/// - `init_order`：初始化顺序
/// - `teardown_order`：销毁顺序，始终是 `init_order` 的严格逆序
///
/// 每次插入阶段时，会在销毁序列的对称位置插入对应的销毁阶段，而不是在运行时再去反转，
/// 因此两条序列之间的镜像关系在每一次修改之后都成立。
///
/// `C` 是 system 运行时拿到的上下文，图本身不关心其内容。
pub struct PhaseGraph<C> {
    init_order: Vec<String>,
    teardown_order: Vec<String>,

    init_systems: HashMap<String, Vec<InitSystem<C>>>,
    teardown_systems: HashMap<String, Vec<TeardownSystem<C>>>,

    /// 已经成功执行过初始化的阶段，销毁时只处理这些阶段
    initialized: HashSet<String>,
}

impl<C> Default for PhaseGraph<C> {
    fn default() -> Self {
        Self::new()
    }
}

// new & init
impl<C> PhaseGraph<C> {
    pub fn new() -> Self {
        Self {
            init_order: Vec::new(),
            teardown_order: Vec::new(),
            init_systems: HashMap::new(),
            teardown_systems: HashMap::new(),
            initialized: HashSet::new(),
        }
    }

    /// 使用一组阶段名称按顺序构建
    pub fn with_phases<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, PhaseError> {
        let mut graph = Self::new();
        for name in names {
            graph.add_phase(name)?;
        }
        Ok(graph)
    }
}

// 阶段编排
impl<C> PhaseGraph<C> {
    /// 将阶段追加到初始化序列末尾，对应的销毁阶段放在销毁序列开头
    pub fn add_phase(&mut self, name: impl Into<String>) -> Result<(), PhaseError> {
        let name = name.into();
        self.ensure_new(&name)?;

        self.init_order.push(name.clone());
        self.teardown_order.insert(0, name);
        Ok(())
    }

    /// 将阶段插入到 `predecessor` 与 `successor` 之间，紧挨着 `successor` 之前
    ///
    /// 要求两者都已注册，并且 `predecessor` 排在 `successor` 之前，否则返回 [`PhaseError::PhaseNotFound`]。
    ///
    /// 销毁序列中，新阶段紧跟在 `successor` 的销毁阶段之后。
    pub fn add_phase_between(
        &mut self,
        name: impl Into<String>,
        predecessor: &str,
        successor: &str,
    ) -> Result<(), PhaseError> {
        let name = name.into();
        self.ensure_new(&name)?;

        let not_found = || PhaseError::PhaseNotFound {
            phase: name.clone(),
            predecessor: predecessor.to_string(),
            successor: successor.to_string(),
        };

        let pred_idx = self.position(predecessor).ok_or_else(not_found)?;
        let succ_idx = self.position(successor).ok_or_else(not_found)?;
        if pred_idx >= succ_idx {
            return Err(not_found());
        }

        let succ_teardown_idx =
            self.teardown_order.iter().position(|p| p == successor).ok_or_else(not_found)?;

        self.init_order.insert(succ_idx, name.clone());
        self.teardown_order.insert(succ_teardown_idx + 1, name);

        debug_assert!(self.is_mirrored());
        Ok(())
    }

    /// 为某个阶段注册初始化 system，同一阶段内按注册顺序执行
    pub fn add_system(
        &mut self,
        phase: &str,
        system: impl FnMut(&mut C) -> anyhow::Result<()> + 'static,
    ) -> Result<&mut Self, PhaseError> {
        self.ensure_known(phase)?;
        self.init_systems.entry(phase.to_string()).or_default().push(Box::new(system));
        Ok(self)
    }

    /// 为某个阶段注册销毁 system，同一阶段内按注册的逆序执行
    pub fn add_teardown_system(
        &mut self,
        phase: &str,
        system: impl FnMut(&mut C) + 'static,
    ) -> Result<&mut Self, PhaseError> {
        self.ensure_known(phase)?;
        self.teardown_systems.entry(phase.to_string()).or_default().push(Box::new(system));
        Ok(self)
    }
}

// getters
impl<C> PhaseGraph<C> {
    #[inline]
    pub fn init_order(&self) -> &[String] {
        &self.init_order
    }

    #[inline]
    pub fn teardown_order(&self) -> &[String] {
        &self.teardown_order
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    #[inline]
    pub fn is_initialized(&self, name: &str) -> bool {
        self.initialized.contains(name)
    }

    /// 销毁序列是否为初始化序列的严格逆序
    pub fn is_mirrored(&self) -> bool {
        self.init_order.iter().rev().eq(self.teardown_order.iter())
    }
}

// run
impl<C> PhaseGraph<C> {
    /// 执行某个阶段的初始化 system
    ///
    /// 第 i 个销毁 system 对应第 i 个初始化 system。某个 system 失败时，
    /// 同阶段内已经成功的 system 会按逆序执行各自的销毁 system，阶段本身不会被标记为已初始化
    pub fn run(&mut self, name: &str, ctx: &mut C) -> Result<(), PhaseError> {
        self.ensure_known(name)?;

        let mut failure = None;
        if let Some(systems) = self.init_systems.get_mut(name) {
            for (idx, system) in systems.iter_mut().enumerate() {
                if let Err(source) = system(ctx) {
                    failure = Some((idx, source));
                    break;
                }
            }
        }

        if let Some((succeeded, source)) = failure {
            self.rollback_partial(name, succeeded, ctx);
            return Err(PhaseError::System {
                phase: name.to_string(),
                source,
            });
        }
        self.initialized.insert(name.to_string());
        Ok(())
    }

    /// 执行某个阶段的销毁 system
    pub fn run_teardown(&mut self, name: &str, ctx: &mut C) -> Result<(), PhaseError> {
        self.ensure_known(name)?;

        if let Some(systems) = self.teardown_systems.get_mut(name) {
            for system in systems.iter_mut().rev() {
                system(ctx);
            }
        }
        self.initialized.remove(name);
        Ok(())
    }

    /// 按初始化顺序执行所有阶段
    ///
    /// 任意阶段失败时，已经完成的阶段会按镜像顺序销毁，然后返回错误
    pub fn run_all(&mut self, ctx: &mut C) -> Result<(), PhaseError> {
        let order = self.init_order.clone();
        for phase in &order {
            log::info!("phase init: {}", phase);
            if let Err(e) = self.run(phase, ctx) {
                log::error!("{}", e);
                self.run_teardown_all(ctx);
                return Err(e);
            }
        }
        Ok(())
    }

    /// 按销毁顺序执行所有已初始化的阶段
    pub fn run_teardown_all(&mut self, ctx: &mut C) {
        let order = self.teardown_order.iter().filter(|p| self.initialized.contains(*p)).cloned().collect_vec();
        for phase in &order {
            log::info!("phase teardown: {}", phase);
            // phase 一定存在于 teardown_order 中
            let _ = self.run_teardown(phase, ctx);
        }
    }
}

// tools
impl<C> PhaseGraph<C> {
    fn position(&self, name: &str) -> Option<usize> {
        self.init_order.iter().position(|p| p == name)
    }

    fn ensure_new(&self, name: &str) -> Result<(), PhaseError> {
        if self.contains(name) {
            return Err(PhaseError::DuplicatePhase(name.to_string()));
        }
        Ok(())
    }

    fn ensure_known(&self, name: &str) -> Result<(), PhaseError> {
        if !self.contains(name) {
            return Err(PhaseError::UnknownPhase(name.to_string()));
        }
        Ok(())
    }

    /// 逆序执行前 `succeeded` 个初始化 system 对应的销毁 system
    fn rollback_partial(&mut self, name: &str, succeeded: usize, ctx: &mut C) {
        let Some(systems) = self.teardown_systems.get_mut(name) else {
            return;
        };
        if succeeded > 0 {
            log::warn!("phase {}: rolling back {} initialized system(s)", name, succeeded);
        }
        for system in systems.iter_mut().take(succeeded).rev() {
            system(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_end() -> PhaseGraph<Vec<String>> {
        PhaseGraph::with_phases(["Start", "End"]).unwrap()
    }

    #[test]
    fn test_insert_between_keeps_mirror() {
        // A、B 插在 Start 与 End 之间，C 插在 A 与 B 之间
        let mut graph = start_end();
        graph.add_phase_between("A", "Start", "End").unwrap();
        graph.add_phase_between("B", "Start", "End").unwrap();
        graph.add_phase_between("C", "A", "B").unwrap();

        assert_eq!(graph.init_order(), ["Start", "A", "C", "B", "End"]);
        assert_eq!(graph.teardown_order(), ["End", "B", "C", "A", "Start"]);
        assert!(graph.is_mirrored());
    }

    #[test]
    fn test_mirror_holds_for_many_insertions() {
        let mut graph = start_end();
        let mut anchors = vec!["Start".to_string(), "End".to_string()];
        for i in 0..16 {
            // 每次都插到当前序列中不同的一对阶段之间
            let pred = anchors[i % (anchors.len() - 1)].clone();
            let succ = anchors.last().unwrap().clone();
            let name = format!("P{i}");
            graph.add_phase_between(name.clone(), &pred, &succ).unwrap();
            anchors = graph.init_order().to_vec();
            assert!(graph.is_mirrored(), "mirror broken after inserting {name}");
        }
        assert_eq!(graph.init_order().len(), 18);
    }

    #[test]
    fn test_insert_between_unordered_phases_fails() {
        let mut graph = start_end();
        graph.add_phase_between("A", "Start", "End").unwrap();

        // 前驱排在后继之后
        let err = graph.add_phase_between("X", "End", "A").unwrap_err();
        assert!(matches!(err, PhaseError::PhaseNotFound { .. }));

        // 前驱不存在
        let err = graph.add_phase_between("Y", "Missing", "End").unwrap_err();
        assert!(matches!(err, PhaseError::PhaseNotFound { .. }));

        // 同一个阶段作为前驱和后继
        let err = graph.add_phase_between("Z", "A", "A").unwrap_err();
        assert!(matches!(err, PhaseError::PhaseNotFound { .. }));

        // 失败的插入不会修改图
        assert_eq!(graph.init_order(), ["Start", "A", "End"]);
    }

    #[test]
    fn test_duplicate_phase_rejected() {
        let mut graph = start_end();
        assert!(matches!(graph.add_phase("Start"), Err(PhaseError::DuplicatePhase(_))));
        assert!(matches!(graph.add_phase_between("End", "Start", "End"), Err(PhaseError::DuplicatePhase(_))));
    }

    #[test]
    fn test_run_unknown_phase() {
        let mut graph = start_end();
        let mut log = Vec::new();
        let err = graph.run("Nope", &mut log).unwrap_err();
        assert!(matches!(err, PhaseError::UnknownPhase(ref p) if p == "Nope"));
        assert!(matches!(graph.add_system("Nope", |_| Ok(())), Err(PhaseError::UnknownPhase(_))));
    }

    #[test]
    fn test_run_all_and_teardown_order() {
        let mut graph = start_end();
        graph.add_phase_between("Device", "Start", "End").unwrap();
        graph.add_phase_between("Instance", "Start", "Device").unwrap();

        for phase in ["Start", "Instance", "Device", "End"] {
            graph
                .add_system(phase, move |log: &mut Vec<String>| {
                    log.push(format!("init {phase}"));
                    Ok(())
                })
                .unwrap();
            graph
                .add_teardown_system(phase, move |log: &mut Vec<String>| log.push(format!("teardown {phase}")))
                .unwrap();
        }

        let mut log = Vec::new();
        graph.run_all(&mut log).unwrap();
        graph.run_teardown_all(&mut log);

        assert_eq!(
            log,
            [
                "init Start",
                "init Instance",
                "init Device",
                "init End",
                "teardown End",
                "teardown Device",
                "teardown Instance",
                "teardown Start",
            ]
        );
    }

    #[test]
    fn test_failed_phase_tears_down_completed_phases() {
        let mut graph = PhaseGraph::with_phases(["Instance", "Device", "Swapchain"]).unwrap();
        graph
            .add_system("Instance", |log: &mut Vec<String>| {
                log.push("init Instance".into());
                Ok(())
            })
            .unwrap();
        graph.add_system("Device", |_| Err(anyhow::anyhow!("no suitable gpu"))).unwrap();
        for phase in ["Instance", "Device", "Swapchain"] {
            graph.add_teardown_system(phase, move |log: &mut Vec<String>| log.push(format!("teardown {phase}"))).unwrap();
        }

        let mut log = Vec::new();
        let err = graph.run_all(&mut log).unwrap_err();

        assert_eq!(err.phase(), "Device");
        assert!(err.to_string().contains("no suitable gpu"));
        // 只有 Instance 完成了初始化
        assert_eq!(log, ["init Instance", "teardown Instance"]);
    }

    #[test]
    fn test_systems_within_phase_are_mirrored() {
        let mut graph = PhaseGraph::with_phases(["Render"]).unwrap();
        for name in ["triangle", "sprite"] {
            graph
                .add_system("Render", move |log: &mut Vec<String>| {
                    log.push(format!("init {name}"));
                    Ok(())
                })
                .unwrap();
            graph.add_teardown_system("Render", move |log: &mut Vec<String>| log.push(format!("deinit {name}"))).unwrap();
        }

        let mut log = Vec::new();
        graph.run("Render", &mut log).unwrap();
        graph.run_teardown("Render", &mut log).unwrap();
        assert_eq!(log, ["init triangle", "init sprite", "deinit sprite", "deinit triangle"]);
    }

    #[test]
    fn test_failed_system_rolls_back_earlier_systems_in_phase() {
        let mut graph = PhaseGraph::with_phases(["Device", "Render"]).unwrap();
        graph
            .add_system("Device", |log: &mut Vec<String>| {
                log.push("init Device".into());
                Ok(())
            })
            .unwrap()
            .add_teardown_system("Device", |log: &mut Vec<String>| log.push("teardown Device".into()))
            .unwrap();
        graph
            .add_system("Render", |log: &mut Vec<String>| {
                log.push("init pipelines".into());
                Ok(())
            })
            .unwrap()
            .add_teardown_system("Render", |log: &mut Vec<String>| log.push("deinit pipelines".into()))
            .unwrap();
        graph
            .add_system("Render", |_| Err(anyhow::anyhow!("shader module missing")))
            .unwrap()
            .add_teardown_system("Render", |log: &mut Vec<String>| log.push("deinit targets".into()))
            .unwrap();

        let mut log = Vec::new();
        let err = graph.run_all(&mut log).unwrap_err();

        assert_eq!(err.phase(), "Render");
        assert!(!graph.is_initialized("Render"));
        // 失败的 system 自己的销毁 system 不执行
        assert_eq!(log, ["init Device", "init pipelines", "deinit pipelines", "teardown Device"]);
    }
}
