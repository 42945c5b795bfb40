use std::ops::Range;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use sieve_workflow::prelude::{
    Binding, BindingIssue, BindingKind, Mention, StageId, ToolDescriptor, ValueId,
    WorkflowDefinition, WorkflowId, classify,
};
use sieve_workflow::tool::ToolCatalog;

use super::{print_json, read_json, read_workflow};
use crate::TRACING_TARGET_COMMAND;

/// Arguments of `sieve check`.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Workflow definition file.
    #[arg(long)]
    pub workflow: PathBuf,

    /// JSON array of tool metadata to check bindings against.
    #[arg(long)]
    pub tools: Option<PathBuf>,
}

/// Findings of a workflow audit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub workflow_id: WorkflowId,
    /// Order index violation of the stored tree, if any.
    pub ordering: Option<String>,
    pub binding_issues: Vec<BindingIssue>,
    pub board_issues: Vec<BoardIssue>,
    pub unresolved_mentions: Vec<MentionIssue>,
    pub tool_issues: Vec<ToolIssue>,
}

impl CheckReport {
    /// Returns the number of findings.
    pub fn problems(&self) -> usize {
        usize::from(self.ordering.is_some())
            + self.binding_issues.len()
            + self.board_issues.len()
            + self.unresolved_mentions.len()
            + self.tool_issues.len()
    }
}

/// Board reference to a stage that is missing or not earlier than the board.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardIssue {
    pub stage_id: StageId,
    pub reference: StageId,
}

/// Prompt mention that no longer resolves.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionIssue {
    pub stage_id: StageId,
    pub value_id: ValueId,
    pub param_id: String,
    pub text: String,
    pub span: Range<usize>,
}

/// Binding that does not fit the tool of its value.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolIssue {
    pub stage_id: StageId,
    pub value_id: ValueId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_id: Option<String>,
    pub problem: String,
}

pub async fn run(args: CheckArgs) -> anyhow::Result<()> {
    let workflow = read_workflow(&args.workflow).await?;
    let catalog = match &args.tools {
        Some(path) => {
            let tools: Vec<ToolDescriptor> = read_json(path, "tool metadata").await?;
            Some(tools.into_iter().collect::<ToolCatalog>())
        }
        None => None,
    };

    let report = audit(workflow, catalog.as_ref());
    print_json(&report)?;

    let problems = report.problems();
    if problems > 0 {
        anyhow::bail!("workflow check found {problems} problem(s)");
    }

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        workflow_id = %report.workflow_id,
        "workflow check passed"
    );
    Ok(())
}

/// Audits a workflow as loaded, before any repair.
pub fn audit(mut workflow: WorkflowDefinition, catalog: Option<&ToolCatalog>) -> CheckReport {
    let ordering = workflow.check_order().err().map(|error| error.to_string());
    let board_issues = workflow
        .stale_board_references()
        .into_iter()
        .map(|(stage_id, reference)| BoardIssue {
            stage_id,
            reference,
        })
        .collect();
    workflow.normalize();

    let mut report = CheckReport {
        workflow_id: workflow.id(),
        ordering,
        binding_issues: workflow.binding_issues(),
        board_issues,
        unresolved_mentions: unresolved_mentions(&workflow),
        tool_issues: Vec::new(),
    };
    if let Some(catalog) = catalog {
        report.tool_issues = tool_issues(&workflow, catalog);
    }
    report
}

fn unresolved_mentions(workflow: &WorkflowDefinition) -> Vec<MentionIssue> {
    let mut issues = Vec::new();
    for stage in workflow.stages() {
        for value in stage.values() {
            for (param_id, binding) in value.input_bindings() {
                let (Binding::Prompt { text } | Binding::Text { text }) = binding else {
                    continue;
                };
                let Ok(mentions) = workflow.scan_prompt(stage.id(), value.id(), text) else {
                    continue;
                };
                for mention in mentions {
                    if let Mention::Unresolved { span, text } = mention {
                        issues.push(MentionIssue {
                            stage_id: stage.id(),
                            value_id: value.id(),
                            param_id: param_id.clone(),
                            text,
                            span,
                        });
                    }
                }
            }
        }
    }
    issues
}

fn tool_issues(workflow: &WorkflowDefinition, catalog: &ToolCatalog) -> Vec<ToolIssue> {
    let mut issues = Vec::new();
    for stage in workflow.stages() {
        for value in stage.values() {
            let Some(tool_id) = value.tool_id() else {
                continue;
            };
            let mut issue = |param_id: Option<&str>, problem: String| {
                issues.push(ToolIssue {
                    stage_id: stage.id(),
                    value_id: value.id(),
                    param_id: param_id.map(str::to_owned),
                    problem,
                });
            };

            let Some(tool) = catalog.get(tool_id) else {
                issue(None, format!("tool {tool_id} is not in the catalog"));
                continue;
            };

            for (param_id, binding) in value.input_bindings() {
                let Some(param) = tool.parameter(param_id) else {
                    issue(Some(param_id), format!("{} has no such parameter", tool.name));
                    continue;
                };
                let expected = classify(param);
                if !accepts(expected, binding.kind()) {
                    issue(
                        Some(param_id),
                        format!("expects {expected}, bound to {}", binding.kind()),
                    );
                }
                if matches!(binding, Binding::Lookup(_)) && !tool.is_lookup() {
                    issue(
                        Some(param_id),
                        format!("lookup bound to a {} tool", tool.kind),
                    );
                }
            }
        }
    }
    issues
}

fn accepts(expected: BindingKind, bound: BindingKind) -> bool {
    use BindingKind::{FreeText, MultilinePrompt};
    expected == bound
        || matches!(
            (expected, bound),
            (FreeText, MultilinePrompt) | (MultilinePrompt, FreeText)
        )
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sieve_workflow::prelude::*;

    use super::*;

    fn tool() -> ToolDescriptor {
        ToolDescriptor::from_json(&json!({
            "id": ToolId::new().to_string(),
            "name": "Extractor",
            "inputParameters": [
                { "name": "Input Data", "type": "data" },
                { "name": "Instructions", "type": "prompt" }
            ]
        }))
        .unwrap()
    }

    fn workflow(tool: &ToolDescriptor) -> (WorkflowDefinition, StageId) {
        let mut workflow = WorkflowDefinition::new();
        let first = workflow.add_stage(StageKind::Table);
        let source = workflow.add_value(first).unwrap();
        let second = workflow.add_stage(StageKind::Table);
        let consumer = workflow.add_value(second).unwrap();
        workflow
            .update_value(
                second,
                consumer,
                ValuePatch {
                    tool_id: Some(Some(tool.id)),
                    ..ValuePatch::default()
                },
            )
            .unwrap();
        workflow
            .bind_input(
                second,
                consumer,
                tool,
                "Input Data",
                Binding::References(ReferenceList::new([ReferenceAddress::value(first, source)])),
            )
            .unwrap();
        workflow
            .bind_input(
                second,
                consumer,
                tool,
                "Instructions",
                Binding::Prompt {
                    text: "Compare with @Gone.Value".into(),
                },
            )
            .unwrap();
        (workflow, first)
    }

    #[test]
    fn test_reports_stale_bindings_and_mentions() {
        let tool = tool();
        let (mut workflow, first) = workflow(&tool);
        let catalog: ToolCatalog = [tool].into_iter().collect();

        let report = audit(workflow.clone(), Some(&catalog));
        assert!(report.ordering.is_none());
        assert!(report.binding_issues.is_empty());
        assert!(report.tool_issues.is_empty());
        assert_eq!(report.unresolved_mentions.len(), 1);
        assert_eq!(report.unresolved_mentions[0].text, "@Gone.Value");

        workflow.delete_stage(first).unwrap();
        let report = audit(workflow, Some(&catalog));
        assert_eq!(report.binding_issues.len(), 1);
        assert_eq!(report.problems(), 2);
    }

    #[test]
    fn test_reports_unknown_tool() {
        let tool = tool();
        let (workflow, _) = workflow(&tool);

        let report = audit(workflow, Some(&ToolCatalog::new()));
        assert_eq!(report.tool_issues.len(), 1);
        assert!(report.tool_issues[0].param_id.is_none());
    }

    #[test]
    fn test_reports_ordering_of_stored_tree() {
        let tool = tool();
        let (workflow, _) = workflow(&tool);
        let mut json = serde_json::to_value(&workflow).unwrap();
        json["stages"][1]["order_index"] = json!(7);
        let stored: WorkflowDefinition = serde_json::from_value(json).unwrap();

        let report = audit(stored, None);
        assert!(report.ordering.is_some());
    }

    #[test]
    fn test_text_and_prompt_are_interchangeable() {
        assert!(accepts(BindingKind::FreeText, BindingKind::MultilinePrompt));
        assert!(!accepts(BindingKind::BooleanFlag, BindingKind::FreeText));
    }

    #[test]
    fn test_reports_forward_board_reference() {
        let mut workflow = WorkflowDefinition::new();
        let board = workflow.add_stage(StageKind::Board);
        let table = workflow.add_stage(StageKind::Table);
        let mut json = serde_json::to_value(&workflow).unwrap();
        json["stages"][0]["board_config"]["reference_step_ids"] = json!([table.to_string()]);
        let stored: WorkflowDefinition = serde_json::from_value(json).unwrap();

        let report = audit(stored, None);
        assert_eq!(report.board_issues.len(), 1);
        assert_eq!(report.board_issues[0].stage_id, board);
        assert_eq!(report.board_issues[0].reference, table);
        assert_eq!(report.problems(), 1);
    }
}
