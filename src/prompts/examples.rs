//! Example selection and rendering for multi-shot prompts.

use crate::datamodel::TaskRun;

/// Maximum examples for the multi-shot generators.
pub const MULTI_SHOT_EXAMPLE_COUNT: usize = 25;

/// Maximum examples for the few-shot generators.
pub const FEW_SHOT_EXAMPLE_COUNT: usize = 4;

/// Selects up to `limit` example runs from a task's history.
///
/// Repaired runs come first, in history order. The remaining slots go to
/// unrepaired runs whose output is rated high quality, highest rating first;
/// equal ratings keep history order.
pub fn collect_examples(runs: &[TaskRun], limit: usize) -> Vec<&TaskRun> {
    let mut selected: Vec<&TaskRun> = runs
        .iter()
        .filter(|run| run.repaired_output().is_some())
        .take(limit)
        .collect();

    let mut rated: Vec<(&TaskRun, f64)> = runs
        .iter()
        .filter(|run| run.repaired_output().is_none())
        .filter_map(|run| {
            let rating = run.output().rating.as_ref()?;
            let value = rating.value?;
            rating.is_high_quality().then_some((run, value))
        })
        .collect();
    // sort_by is stable
    rated.sort_by(|a, b| b.1.total_cmp(&a.1));

    let remaining = limit.saturating_sub(selected.len());
    selected.extend(rated.into_iter().take(remaining).map(|(run, _)| run));
    selected
}

/// Renders an example as an input/output pair, preferring the repaired output.
pub fn render_example(index: usize, run: &TaskRun) -> String {
    let output = run.repaired_output().unwrap_or_else(|| run.output());
    format!(
        "## Example {}\n\nInput: {}\nOutput: {}\n\n",
        index + 1,
        run.input(),
        output.output
    )
}

/// Renders an example showing the initial output, the repair instructions and
/// the repaired output. Falls back to [`render_example`] for unrepaired runs.
pub fn render_repair_example(index: usize, run: &TaskRun) -> String {
    let (Some(instructions), Some(repaired)) = (run.repair_instructions(), run.repaired_output())
    else {
        return render_example(index, run);
    };
    if instructions.is_empty() || repaired.output.is_empty() {
        return render_example(index, run);
    }

    format!(
        "## Example {}\n\nInput: {}\n\n\
         Initial Output Which Was Insufficient: {}\n\n\
         Instructions On How to Improve the Initial Output: {}\n\n\
         Repaired Output Which is Sufficient: {}\n\n",
        index + 1,
        run.input(),
        run.output().output,
        instructions,
        repaired.output
    )
}
