//! 计划依赖图校验
//!
//! 邻接表 + DFS（visiting / visited 两组集合）检测环；同时拒绝重复步骤 id 与指向不存在步骤的依赖。

use std::collections::{HashMap, HashSet};

use crate::agents::Step;
use crate::core::AgentError;

/// 步骤依赖图：步骤 id -> 其依赖的步骤 id（保持声明顺序）
pub struct PlanGraph<'a> {
    order: Vec<&'a str>,
    edges: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> PlanGraph<'a> {
    /// 建图；重复 id 或未知依赖直接返回错误
    pub fn new(steps: &'a [Step]) -> Result<Self, AgentError> {
        let mut edges: HashMap<&str, Vec<&str>> = HashMap::with_capacity(steps.len());
        let mut order = Vec::with_capacity(steps.len());
        for step in steps {
            if edges.insert(step.id.as_str(), Vec::new()).is_some() {
                return Err(AgentError::DuplicateStep(step.id.clone()));
            }
            order.push(step.id.as_str());
        }
        for step in steps {
            for dep in &step.dependencies {
                if !edges.contains_key(dep.as_str()) {
                    return Err(AgentError::UnknownDependency {
                        step: step.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
            edges.insert(
                step.id.as_str(),
                step.dependencies.iter().map(String::as_str).collect(),
            );
        }
        Ok(Self { order, edges })
    }

    /// 检测环，返回环上最先被重新访问的步骤 id
    pub fn find_cycle(&self) -> Option<&'a str> {
        let mut visiting = HashSet::new();
        let mut visited = HashSet::new();
        self.order
            .iter()
            .find_map(|id| self.visit(*id, &mut visiting, &mut visited))
    }

    fn visit(&self, id: &'a str, visiting: &mut HashSet<&'a str>, visited: &mut HashSet<&'a str>) -> Option<&'a str> {
        if visiting.contains(id) {
            return Some(id);
        }
        if visited.contains(id) {
            return None;
        }
        visiting.insert(id);
        for dep in self.edges.get(id).into_iter().flatten() {
            if let Some(cycle_at) = self.visit(*dep, visiting, visited) {
                return Some(cycle_at);
            }
        }
        visiting.remove(id);
        visited.insert(id);
        None
    }
}

/// 执行前校验计划：无重复 id、依赖都存在、无环
pub fn validate_plan(steps: &[Step]) -> Result<(), AgentError> {
    let graph = PlanGraph::new(steps)?;
    match graph.find_cycle() {
        Some(id) => Err(AgentError::CyclicDependency(id.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::StepStatus;
    use crate::tools::ToolCall;

    fn step(id: &str, deps: &[&str]) -> Step {
        Step {
            id: id.to_string(),
            call: ToolCall::MarkClean {
                user_id: "u".to_string(),
                item_id: "i".to_string(),
            },
            expected_output: String::new(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            status: StepStatus::Pending,
            result: None,
            error: None,
        }
    }

    #[test]
    fn test_acyclic_plan_is_valid() {
        let steps = vec![
            step("a", &[]),
            step("b", &["a"]),
            step("c", &["a", "b"]),
            step("d", &[]),
        ];
        assert!(validate_plan(&steps).is_ok());
    }

    #[test]
    fn test_two_step_cycle_rejected() {
        let steps = vec![step("a", &["b"]), step("b", &["a"])];
        let err = validate_plan(&steps).unwrap_err();
        assert!(matches!(err, AgentError::CyclicDependency(ref id) if id == "a"));
        assert!(err.is_plan_invalid());
    }

    #[test]
    fn test_self_loop_and_long_cycle() {
        assert!(matches!(
            validate_plan(&[step("a", &["a"])]),
            Err(AgentError::CyclicDependency(_))
        ));
        let steps = vec![step("a", &["c"]), step("b", &["a"]), step("c", &["b"]), step("d", &[])];
        assert!(matches!(validate_plan(&steps), Err(AgentError::CyclicDependency(_))));
    }

    #[test]
    fn test_unknown_dependency_and_duplicate_id() {
        let err = validate_plan(&[step("a", &["ghost"])]).unwrap_err();
        assert!(matches!(
            err,
            AgentError::UnknownDependency { ref step, ref dependency } if step == "a" && dependency == "ghost"
        ));
        let err = validate_plan(&[step("a", &[]), step("a", &[])]).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateStep(ref id) if id == "a"));
    }

    #[test]
    fn test_empty_plan_is_valid() {
        assert!(validate_plan(&[]).is_ok());
    }
}
