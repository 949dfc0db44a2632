#[cfg(test)]
#[path = "ui_test.rs"]
mod tests;

use std::path;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use chrono::TimeZone;
use chrono::Utc;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use dialoguer::Select;
use yansi::Paint;

use crate::domain::models::ChatRole;
use crate::domain::models::DesignHistoryItem;
use crate::domain::models::DesignId;
use crate::domain::models::DesignSession;
use crate::domain::models::PRESETS;
use crate::domain::services::ActiveView;
use crate::domain::services::ChatService;
use crate::domain::services::GenerationOutcome;

fn format_timestamp(id: DesignId) -> String {
    return match Utc.timestamp_millis_opt(id as i64).single() {
        Some(time) => time
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => id.to_string(),
    };
}

fn shorten(text: &str, max: usize) -> String {
    let line = text.split('\n').next().unwrap_or_default();
    if line.chars().count() <= max {
        return line.to_string();
    }

    let head = line.chars().take(max - 3).collect::<String>();
    return format!("{head}...");
}

pub fn format_session(session: &DesignSession, active: bool) -> String {
    let marker = if active { "*" } else { "-" };
    let mut res = format!(
        "{marker} (ID: {}) {}, {} design(s)",
        session.id,
        format_timestamp(session.id),
        session.history.len()
    );

    if let Some(item) = session.history.last() {
        res = format!("{res}, latest: {}", shorten(&item.prompt, 60));
    }

    return res;
}

pub fn format_history_item(item: &DesignHistoryItem) -> String {
    return format!(
        "- (ID: {}) {}, {}",
        item.id,
        format_timestamp(item.id),
        shorten(&item.prompt, 70)
    );
}

pub fn print_sessions(sessions: &[Arc<DesignSession>], active_session_id: Option<DesignId>) {
    if sessions.is_empty() {
        println!("There are no design sessions yet. Upload a photo of your garden to start one!");
        return;
    }

    let lines = sessions
        .iter()
        .rev()
        .map(|session| return format_session(session, Some(session.id) == active_session_id))
        .collect::<Vec<String>>();

    println!("{}", lines.join("\n"));
}

pub fn print_session(session: &DesignSession) {
    println!("{}", Paint::new(format!("Session {}", session.id)).bold());
    println!("Started {}", format_timestamp(session.id));

    if session.history.is_empty() {
        println!("No designs yet.");
        return;
    }

    let lines = session
        .history
        .iter()
        .map(format_history_item)
        .collect::<Vec<String>>();
    println!("{}", lines.join("\n"));
}

pub fn print_presets() {
    let lines = PRESETS
        .iter()
        .map(|preset| {
            return format!(
                "- {} ({})\n  {}",
                Paint::new(preset.name).bold(),
                preset.key,
                preset.prompt
            );
        })
        .collect::<Vec<String>>();

    println!("{}", lines.join("\n\n"));
}

pub fn print_view(view: &ActiveView) {
    if let Some(error) = &view.error_message {
        eprintln!("{}", Paint::red(format!("Error: {error}")));
    }

    if view.plants.is_empty() {
        return;
    }

    println!("{}", Paint::new("Plants in this design:").bold());
    for plant in view.plants.iter() {
        println!("- {}", plant.name);
    }
}

/// Writes the new design to `output_dir` and reports how the round went.
pub async fn print_outcome(
    outcome: &GenerationOutcome,
    view: &ActiveView,
    output_dir: &path::Path,
) -> Result<()> {
    if let Some(item) = outcome.item() {
        let file_path = item
            .generated_image
            .write_to(output_dir, &item.id.to_string())
            .await?;
        println!(
            "{} {}",
            Paint::green(format!("Saved design {} to", item.id)),
            file_path.to_string_lossy()
        );
    }

    match outcome {
        GenerationOutcome::Superseded { .. } => {
            println!("{}", Paint::yellow("A newer request took over this one."));
        }
        GenerationOutcome::PartiallyCompleted { warning, .. } => {
            println!("{}", Paint::yellow(warning));
        }
        _ => print_view(view),
    }

    return Ok(());
}

pub fn select_session(
    sessions: &[Arc<DesignSession>],
    active_session_id: Option<DesignId>,
) -> Result<Option<DesignId>> {
    if sessions.is_empty() {
        println!("There are no design sessions yet. Upload a photo of your garden to start one!");
        return Ok(None);
    }

    let mut sessions = sessions.to_vec();
    sessions.reverse();

    let options = sessions
        .iter()
        .map(|session| return format_session(session, Some(session.id) == active_session_id))
        .collect::<Vec<String>>();

    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which session would you like to open?")
        .default(0)
        .items(&options)
        .interact_opt()?;

    return Ok(idx.map(|idx| return sessions[idx].id));
}

pub async fn run_chat(mut chat: ChatService) -> Result<()> {
    for message in chat.messages() {
        println!("{}: {}", Paint::green("Bloom"), message.text);
    }
    println!("{}", Paint::new("Type /quit to leave the chat.").dimmed());

    loop {
        let text: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;

        if text.trim() == "/quit" || text.trim() == "/exit" {
            return Ok(());
        }

        if let Some(reply) = chat.send(&text).await {
            let author = match reply.role {
                ChatRole::Model => Paint::green("Bloom").to_string(),
                ChatRole::User => Paint::new("You").to_string(),
            };
            println!("{author}: {}", reply.text);
        }
    }
}
