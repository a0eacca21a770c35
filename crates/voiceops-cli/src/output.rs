use serde::Serialize;
use voiceops_core::executor::{StepOutcome, StepResult};
use voiceops_core::plan::Plan;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  "));
    }
}

pub fn print_plan(plan: &Plan) {
    if !plan.reasoning.is_empty() {
        println!("Reasoning:   {}", plan.reasoning);
    }
    if !plan.explanation.is_empty() {
        println!("Plan:        {}", plan.explanation);
    }
    println!("Confidence:  {}", plan.confidence);
    if let Some(warning) = &plan.duplicate_warning {
        println!("Duplicate:   {warning}");
    }
    println!();

    let rows = plan
        .actions
        .iter()
        .map(|s| {
            vec![
                s.seq.to_string(),
                s.action.kind().to_string(),
                s.description.clone(),
            ]
        })
        .collect();
    print_table(&["STEP", "TYPE", "DESCRIPTION"], rows);
}

pub fn print_results(results: &[StepResult]) {
    let rows = results
        .iter()
        .map(|r| {
            let (status, detail) = match &r.outcome {
                StepOutcome::Success { result } => ("success", summarize(result)),
                StepOutcome::Failed { result } => {
                    ("failed", result["error"].as_str().unwrap_or_default().to_string())
                }
                StepOutcome::Error { error } => ("error", error.clone()),
            };
            vec![
                r.step.to_string(),
                r.kind.clone(),
                status.to_string(),
                detail,
            ]
        })
        .collect();
    print_table(&["STEP", "TYPE", "STATUS", "DETAIL"], rows);
}

/// One-line view of a handler payload.
fn summarize(result: &serde_json::Value) -> String {
    if let Some(id) = result["ticket_id"].as_str() {
        let action = result["action"].as_str().unwrap_or("done");
        return format!("{id} {action}");
    }
    result["status"].as_str().unwrap_or_default().to_string()
}
