use crate::cli::ResolveArgs;
use crate::config::TourpostConfig;
use anyhow::Result;
use tourpost_core::{decide_on, extract_mentions, Agenda, LocalTime, Query, Role};

pub fn run(args: ResolveArgs, agenda: &Agenda, config: &TourpostConfig) -> Result<()> {
    let local_time = match args.time.as_deref() {
        Some(t) => LocalTime::parse(t)?,
        None => config.event.now(),
    };
    let role: Role = args.role.parse()?;

    let mut mentions = args.topics;
    if let Some(post) = args.post.as_deref() {
        mentions.extend(extract_mentions(post, agenda));
    }

    let query = Query::new(local_time.clone())
        .with_mentions(mentions)
        .with_role(role);
    let decision = decide_on(&query, agenda)?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    println!("Time:     {} (agenda {})", local_time, decision.agenda_time.format("%H:%M"));
    if !query.mentioned_topics.is_empty() {
        println!("Mentions: {}", query.mentioned_topics.join(", "));
    }
    match &decision.session {
        Some(session) => println!(
            "Session:  {} [{}] {}",
            session.title,
            session.id,
            session.window_label()
        ),
        None => println!("Session:  none"),
    }
    println!("Reason:   {}", decision.resolution.reason);
    Ok(())
}
