use crate::assistant::{RunStep, StepDetails, ToolKind};

/// True iff some step of the run called the document-search tool.
pub fn used_file_search(steps: &[RunStep]) -> bool {
    steps.iter().any(|step| match &step.step_details {
        StepDetails::ToolCalls { tool_calls } => tool_calls
            .iter()
            .any(|call| call.kind == ToolKind::FileSearch),
        _ => false,
    })
}
