use crate::cli::{AgendaCommands, AgendaListArgs};
use anyhow::Result;
use std::path::Path;
use tourpost_core::{Agenda, LocalTime, Session};

pub fn run(cmd: AgendaCommands, agenda_path: &Path) -> Result<()> {
    match cmd {
        AgendaCommands::Validate => validate(agenda_path),
        AgendaCommands::List(args) => list(args, agenda_path),
    }
}

fn validate(agenda_path: &Path) -> Result<()> {
    match Agenda::load(agenda_path) {
        Ok(agenda) => {
            println!(
                "✅ {} is valid: {} sessions, {} topics.",
                agenda_path.display(),
                agenda.len(),
                agenda.known_topics().len()
            );
        }
        Err(e) => {
            println!("❌ {}: {}", agenda_path.display(), e);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn list(args: AgendaListArgs, agenda_path: &Path) -> Result<()> {
    let agenda = Agenda::load(agenda_path)?;
    let sessions: Vec<&Session> = match args.at.as_deref() {
        Some(at) => {
            let time = agenda.localize(&LocalTime::parse(at)?)?;
            agenda.sessions_at(time).collect()
        }
        None => agenda.sessions.iter().collect(),
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    println!();
    println!("{} · {}", agenda.event.name, agenda.event.city);
    println!("{}", "─".repeat(72));
    for s in &sessions {
        let ai = if s.is_ai_topic() { "AI" } else { "" };
        println!(
            "{:11}  {:2}  {:32}  {}",
            s.window_label(),
            ai,
            truncate(&s.title, 32),
            s.topics.join(", ")
        );
    }
    println!("{}", "─".repeat(72));
    println!("{} session(s)", sessions.len());
    Ok(())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let cut: String = s.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncates_long_titles() {
        assert_eq!(truncate("Keynote", 10), "Keynote");
        assert_eq!(truncate("Mosaic AI Deep Dive", 10), "Mosaic AI…");
    }
}
