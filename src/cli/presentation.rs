//! CLI presentation: session, plan and validation formatters.

use crate::input::{SessionPlan, TaskList};
use crate::record::SessionStatus;
use crate::session::SessionOutcome;
use comfy_table::Table;
use owo_colors::OwoColorize;

fn heading(title: &str, color: bool) -> String {
    if color {
        format!("{}", title.bold().underline())
    } else {
        title.to_string()
    }
}

/// Human-readable result of a session run.
pub fn format_session_summary(outcome: &SessionOutcome, color: bool) -> String {
    let record = &outcome.record;
    let mut out = heading(&format!("Session {}", record.session_name), color);

    let status = match record.status {
        SessionStatus::Completed if record.failed.is_empty() => {
            paint(record.status.as_str(), color, Tone::Good)
        }
        SessionStatus::Completed => paint(record.status.as_str(), color, Tone::Warn),
        _ => paint(record.status.as_str(), color, Tone::Bad),
    };
    out.push_str(&format!(
        "\n  Status: {}\n  Strategy: {}\n  Generated: {}/{}\n  Failed: {}\n  Record: {}",
        status,
        record.strategy.as_str(),
        record.generated.len(),
        record.total_items,
        record.failed.len(),
        outcome.record_path.display()
    ));

    if !record.generated.is_empty() {
        let mut table = Table::new();
        table.load_preset(comfy_table::presets::UTF8_FULL);
        table.set_header(vec!["Id", "Size", "Bytes", "Seconds", "File"]);
        for asset in &record.generated {
            table.add_row(vec![
                asset.id.clone(),
                asset.size.clone(),
                asset.file_size_bytes.to_string(),
                asset.generation_time_seconds.to_string(),
                asset.file_path.display().to_string(),
            ]);
        }
        out.push_str("\n\n");
        out.push_str(&table.to_string());
    }

    if !record.failed.is_empty() {
        let mut table = Table::new();
        table.load_preset(comfy_table::presets::UTF8_FULL);
        table.set_header(vec!["Id", "Kind", "Error"]);
        for failed in &record.failed {
            table.add_row(vec![
                failed.id.clone(),
                format!("{:?}", failed.kind),
                failed.error.clone(),
            ]);
        }
        out.push_str("\n\n");
        out.push_str(&heading("Failures", color));
        out.push('\n');
        out.push_str(&table.to_string());
    }

    out
}

pub fn format_validation_summary(plan: &SessionPlan) -> String {
    let mut out = format!(
        "Session '{}' is valid:\n  Type: {}\n  Groups: {}\n  Items: {}",
        plan.session_name,
        plan.sprite_type,
        plan.groups.len(),
        plan.total_items()
    );
    for group in &plan.groups {
        out.push_str(&format!(
            "\n  - {} ({} items) -> {}",
            group.name,
            group.requests.len(),
            group.output_location.display()
        ));
    }
    out
}

pub fn format_plan_text(list: &TaskList) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["#", "Id", "Group", "Output", "Prompt"]);
    for (index, task) in list.tasks.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            task.sprite_id.clone(),
            task.group_name.clone(),
            task.output_path.display().to_string(),
            task.prompt.clone(),
        ]);
    }
    format!(
        "Session '{}': {} tasks\n{}",
        list.session_name, list.total_sprites, table
    )
}

enum Tone {
    Good,
    Warn,
    Bad,
}

fn paint(text: &str, color: bool, tone: Tone) -> String {
    if !color {
        return text.to_string();
    }
    match tone {
        Tone::Good => text.green().to_string(),
        Tone::Warn => text.yellow().to_string(),
        Tone::Bad => text.red().to_string(),
    }
}
