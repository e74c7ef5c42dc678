use super::render_fields;
use crate::agenda::Agenda;
use crate::collaborators::ChatMessage;
use crate::resolver::Decision;
use crate::time::LocalTime;
use crate::types::{MatchReason, Role};

pub const RATIONALE_FIELD: &str = "Rationale";
pub const POST_FIELD: &str = "Post";

/// Everything the post prompt is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct PostPromptInput<'a> {
    pub agenda: &'a Agenda,
    pub local_time: &'a LocalTime,
    pub user_post: &'a str,
    pub role: Role,
    pub site: &'a str,
    pub decision: &'a Decision,
}

struct Demo {
    local_time: &'static str,
    user_post: &'static str,
    role: &'static str,
    site: &'static str,
    current_session: &'static str,
    rationale: &'static str,
    post: &'static str,
}

const DEMOS: &[Demo] = &[
    Demo {
        local_time: "09:30 AM EDT",
        user_post: "Excited for my presentation today!",
        role: "presenter",
        site: "LinkedIn",
        current_session: "None",
        rationale: "A presenter posting in the morning before any session they named. \
                    Keep it professional and optimistic, build anticipation for the talk \
                    later in the day, and use growth and speaking hashtags.",
        post: "Good morning, LinkedIn! Getting ready to take the stage later today and share \
               what our team has been building. Can't wait to connect with everyone here! \
               #PublicSpeaking #DataAndAI #ProfessionalGrowth",
    },
    Demo {
        local_time: "01:45 PM EDT",
        user_post: "Looking forward to my presentation!",
        role: "presenter",
        site: "LinkedIn",
        current_session: "None",
        rationale: "Just before an afternoon talk. Emphasize preparation and excitement, \
                    stay professional for LinkedIn, and add hashtags that help the post \
                    travel.",
        post: "Pre-presentation butterflies! Minutes away from sharing months of hard work \
               with an amazing audience. So proud of this team! \
               #PublicSpeaking #Innovation #ReadyToInspire",
    },
];

fn system_instructions(agenda: &Agenda) -> String {
    format!(
        "You are a social media assistant who writes one engaging social media post with \
         hashtags about the user's experience at {event} in {city}, a tech conference about \
         Data and AI run by {organizer}.\n\
         The current session has already been decided for you and is given as \
         'Current Session'. When it is not 'None', assume the user is in that session and \
         call it out by name. Do not pick a different session from the agenda.\n\
         Give every post a very positive spin to help it go viral. Match the tone of the \
         target social media site.\n\
         Reply with exactly these fields and nothing else:\n\
         {rationale}: <your reasoning about the content and hashtags>\n\
         {post}: <the post, on a single line>",
        event = agenda.event.name,
        city = agenda.event.city,
        organizer = agenda.event.organizer,
        rationale = RATIONALE_FIELD,
        post = POST_FIELD,
    )
}

fn describe_session(decision: &Decision) -> String {
    let Some(session) = &decision.session else {
        return "None".to_string();
    };
    let why = match decision.resolution.reason {
        MatchReason::ExplicitMention => "the user named this session or one of its topics",
        MatchReason::AiPriorityOverlap => {
            "it is running now, and AI sessions take priority when several overlap"
        }
        MatchReason::SingleOverlap => "it is running now",
        MatchReason::NoOverlap => "no session matched",
    };
    let topics = if session.topics.is_empty() {
        "none".to_string()
    } else {
        session.topics.join(", ")
    };
    format!(
        "{} ({}, topics: {}). Chosen because {}.",
        session.title,
        session.window_label(),
        topics,
        why
    )
}

/// Chat messages asking for a post about the user's current session.
pub fn post_messages(input: PostPromptInput<'_>) -> Vec<ChatMessage> {
    let agenda_json = input.agenda.to_prompt_json();
    let mut messages = vec![ChatMessage::system(system_instructions(input.agenda))];

    for demo in DEMOS {
        messages.push(ChatMessage::user(render_fields(&[
            ("Local Time", demo.local_time),
            ("User Post", demo.user_post),
            ("User Role", demo.role),
            ("Social Media Site", demo.site),
            ("Current Session", demo.current_session),
        ])));
        messages.push(ChatMessage::assistant(render_fields(&[
            (RATIONALE_FIELD, demo.rationale),
            (POST_FIELD, demo.post),
        ])));
    }

    let local_time = input.local_time.to_string();
    let role = input.role.to_string();
    let current = describe_session(input.decision);
    let mut request = render_fields(&[
        ("Local Time", &local_time),
        ("User Post", input.user_post),
        ("User Role", &role),
        ("Social Media Site", input.site),
        ("Current Session", &current),
    ]);
    request.push_str("\nAgenda: ");
    request.push_str(&agenda_json);
    messages.push(ChatMessage::user(request));

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::EventInfo;
    use crate::collaborators::ChatRole;
    use crate::resolver::decide_on;
    use crate::types::{Query, Session};
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn agenda() -> Agenda {
        Agenda::new(
            EventInfo::default(),
            vec![
                Session::new("k1", "AI Keynote", t(9, 0), t(9, 50), &["AI"]),
                Session::new("g1", "Data Governance", t(9, 30), t(10, 10), &["Governance"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn renders_decided_session_and_agenda() {
        let agenda = agenda();
        let local = LocalTime::parse("09:40 EDT").unwrap();
        let decision = decide_on(&Query::new(local.clone()), &agenda).unwrap();

        let messages = post_messages(PostPromptInput {
            agenda: &agenda,
            local_time: &local,
            user_post: "Great start to the day!",
            role: Role::Attendee,
            site: "LinkedIn",
            decision: &decision,
        });

        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[0].content.contains("Data + AI World Tour 2024"));
        assert!(messages[0].content.contains("Atlanta"));
        assert_eq!(messages.len(), 2 + DEMOS.len() * 2);

        let last = &messages.last().unwrap().content;
        assert!(last.contains("Local Time: 09:40 AM EDT"));
        assert!(last.contains("User Role: attendee"));
        assert!(last.contains("Current Session: AI Keynote (09:00–09:50, topics: AI)"));
        assert!(last.contains("AI sessions take priority"));
        assert!(last.contains(r#""id":"g1""#));
    }

    #[test]
    fn no_session_renders_none() {
        let agenda = agenda();
        let local = LocalTime::parse("15:00").unwrap();
        let decision = decide_on(&Query::new(local.clone()), &agenda).unwrap();
        let messages = post_messages(PostPromptInput {
            agenda: &agenda,
            local_time: &local,
            user_post: "Wrapping up",
            role: Role::Organizer,
            site: "X",
            decision: &decision,
        });
        assert!(messages.last().unwrap().content.contains("Current Session: None"));
    }
}
