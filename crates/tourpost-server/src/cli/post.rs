use crate::backends::Backends;
use crate::cli::PostArgs;
use crate::config::TourpostConfig;
use anyhow::Result;
use std::sync::Arc;
use tourpost_core::{AgendaStore, LocalTime, PostGenerator, PostRequest, SessionResolver};

pub async fn run(args: PostArgs, store: Arc<AgendaStore>, config: &TourpostConfig) -> Result<()> {
    let backends = Backends::from_config(config)?;
    let generator = PostGenerator::new(
        SessionResolver::new(store),
        backends.text,
        config.generation.clone(),
    );

    let request = PostRequest {
        user_post: args.post,
        role: args.role.parse()?,
        site: args.site,
        local_time: args.time.as_deref().map(LocalTime::parse).transpose()?,
    };
    let generated = generator.generate(&request, config.event.now()).await?;

    println!("{}", generated.post);
    println!();
    println!(
        "Session:   {}",
        generated.current_session_title.as_deref().unwrap_or("none")
    );
    println!("Reason:    {}", generated.resolution.reason);
    println!("Rationale: {}", generated.rationale);
    Ok(())
}
