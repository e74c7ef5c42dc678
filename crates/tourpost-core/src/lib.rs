pub mod error;
pub mod time;
pub mod types;
pub mod agenda;
pub mod mention;
pub mod resolver;
pub mod collaborators;
pub mod prompt;
pub mod output;
pub mod generation;

pub use error::{Result, TourpostError};
pub use time::{parse_zone, LocalTime};
pub use types::*;
pub use agenda::{Agenda, AgendaStore, EventInfo, MIN_SESSION_MINUTES};
pub use mention::extract_mentions;
pub use resolver::{decide_on, resolve, resolve_at, Decision, SessionResolver};
pub use collaborators::{
    render_hits, ChatCompletion, ChatMessage, ChatRequest, ChatRole, GeneratedImage,
    ImageGenerator, SearchHit, TextGenerator, WebSearch,
};
pub use output::{PostOutput, ImagePromptOutput};
pub use generation::{
    GeneratedPost, GenerationSettings, ImagePromptGenerator, ImagePromptResult, ImageService,
    LinkFinder, PostGenerator, PostRequest,
};
