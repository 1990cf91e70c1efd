use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{FlowlensError, Result, model::TaskType};

/// A workflow definition as stored by the orchestration server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowDef {
    pub name: String,
    pub version: u32,
    pub description: String,
    pub tasks: Vec<WorkflowTask>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SubWorkflowParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

/// A single task entry inside a definition. Composite types nest further
/// task lists in `fork_tasks`, `decision_cases`/`default_case` or `loop_over`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowTask {
    pub name: String,
    pub task_reference_name: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub description: String,
    pub optional: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fork_tasks: Vec<Vec<WorkflowTask>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub decision_cases: IndexMap<String, Vec<WorkflowTask>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub default_case: Vec<WorkflowTask>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub loop_over: Vec<WorkflowTask>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub join_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_workflow_param: Option<SubWorkflowParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_for_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_value_param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluator_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_fork_tasks_param: Option<String>,
}

/// Label used for the default branch of a decision.
pub const DEFAULT_CASE: &str = "default";

/// One branch of a decision: a named case or the default case.
///
/// A case may itself be named `default`; it is still a distinct branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BranchCase {
    Case(String),
    Default,
}

impl BranchCase {
    pub fn label(&self) -> &str {
        match self {
            BranchCase::Case(case) => case,
            BranchCase::Default => DEFAULT_CASE,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, BranchCase::Default)
    }
}

impl WorkflowDef {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<WorkflowDef>(s).map_err(|e| FlowlensError::Model(format!("invalid workflow definition: {}", e)))
    }
}

impl WorkflowTask {
    pub fn new(
        reference: &str,
        task_type: TaskType,
    ) -> Self {
        Self {
            name: reference.to_string(),
            task_reference_name: reference.to_string(),
            task_type,
            ..Default::default()
        }
    }

    /// Reference name that task records for this entry are filed under.
    pub fn record_reference(&self) -> &str {
        self.alias_for_ref.as_deref().unwrap_or(&self.task_reference_name)
    }

    /// Decision branches in document order, the default case last.
    pub fn decision_branches(&self) -> impl Iterator<Item = (BranchCase, &[WorkflowTask])> {
        self.decision_cases
            .iter()
            .map(|(case, tasks)| (BranchCase::Case(case.clone()), tasks.as_slice()))
            .chain(std::iter::once((BranchCase::Default, self.default_case.as_slice())))
    }

    /// Branch selected by an evaluated case; labels outside `decision_cases` pick the default.
    pub fn branch_for(
        &self,
        evaluated: Option<&str>,
    ) -> BranchCase {
        match evaluated {
            Some(case) if self.decision_cases.contains_key(case) => BranchCase::Case(case.to_string()),
            _ => BranchCase::Default,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{BranchCase, WorkflowDef};
    use crate::model::TaskType;

    #[test]
    fn test_definition_deserialize_keeps_case_order() {
        let def = WorkflowDef::from_json(
            r#"{
            "name": "shipping",
            "version": 2,
            "tasks": [
                {
                    "name": "route",
                    "taskReferenceName": "route",
                    "type": "SWITCH",
                    "decisionCases": {
                        "zeta": [{ "name": "z", "taskReferenceName": "z", "type": "SIMPLE" }],
                        "alpha": [{ "name": "a", "taskReferenceName": "a", "type": "SIMPLE" }]
                    },
                    "defaultCase": [{ "name": "d", "taskReferenceName": "d", "type": "SIMPLE" }]
                }
            ]
        }"#,
        )
        .unwrap();

        assert_eq!(def.version, 2);
        let route = &def.tasks[0];
        assert_eq!(route.task_type, TaskType::Switch);
        let cases: Vec<BranchCase> = route.decision_branches().map(|(case, _)| case).collect();
        assert_eq!(cases, vec![BranchCase::Case("zeta".to_string()), BranchCase::Case("alpha".to_string()), BranchCase::Default]);
        assert_eq!(cases[2].label(), "default");
    }

    #[test]
    fn test_case_named_default_is_not_the_default_branch() {
        let def = WorkflowDef::from_json(
            r#"{"tasks": [{
                "taskReferenceName": "route",
                "type": "SWITCH",
                "decisionCases": { "default": [{ "taskReferenceName": "x", "type": "SIMPLE" }] },
                "defaultCase": [{ "taskReferenceName": "y", "type": "SIMPLE" }]
            }]}"#,
        )
        .unwrap();
        let route = &def.tasks[0];

        assert_eq!(route.branch_for(Some("default")), BranchCase::Case("default".to_string()));
        assert_eq!(route.branch_for(Some("other")), BranchCase::Default);
        assert_eq!(route.branch_for(None), BranchCase::Default);
        let defaults = route.decision_branches().filter(|(case, _)| case.is_default()).count();
        assert_eq!(defaults, 1);
    }

    #[test]
    fn test_record_reference_uses_alias() {
        let def = WorkflowDef::from_json(r#"{"tasks": [{"taskReferenceName": "b", "aliasForRef": "a", "type": "SIMPLE"}]}"#).unwrap();
        assert_eq!(def.tasks[0].record_reference(), "a");
    }

    #[test]
    fn test_invalid_definition() {
        let err = WorkflowDef::from_json(r#"{"tasks": 3}"#).unwrap_err();
        assert!(err.to_string().contains("invalid workflow definition"));
    }
}
