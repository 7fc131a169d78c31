//! Chat messages sent to the model.

use crate::deck::SlideContent;
use crate::llm::ChatContext;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

const SLIDE_FORMAT: &str = r#"The response format should be a valid json format structured as this: [{"slide_number": <Float>, "title": "<String>", "content": "<String>", "narration": "<String>"}]
The content field is the main text of each slide and should be comprehensive enough to stand on its own. For content use a mix of bullet points and text when applicable.
If you are modifying an existing slide leave the slide number unchanged, but if you are adding slides use decimal digits for the slide number. For example to add slides after slide 2, use slide numbers 2.1, 2.2, ...
If the user asks to remove a slide, set its slide number to the negative of its current value; slides with a negative slide number are excluded from the presentation."#;

const FIELD_RULES: [&str; 4] = [
    "For each slide the content field is the main body of the slide while the narration field is an example transcript of presenting the content field. Never mention the slide number in the transcript.",
    "For each slide, the content field is the field to modify when the user asks for changes to the slide, not the narration field.",
    "For each slide, the narration field should only be populated if explicitly asked in the user prompt, otherwise it should be left empty.",
    "Response should be valid json. slide_number, title, and content are mandatory keys.",
];

/// Messages asking for a shortened version of `text`.
pub fn summarize_messages(text: &str, max_words: Option<usize>) -> Vec<Message> {
    let mut instruction = String::from(
        "User will ask you to shorten the Input Article. Make sure that the shortened version captures all the key points.\nResponse format: Keep the format of the Input Article.\nOutput only the shortened article.",
    );
    if let Some(limit) = max_words {
        instruction.push_str(&format!("\nUse at most {} words.", limit));
    }

    vec![
        Message::system(format!("Input Article: {}", text)),
        Message::system(instruction),
        Message::user("Shorten the Input Article."),
    ]
}

/// Messages for a slide creation or revision request.
pub fn chat_messages(prompt: &str, context: Option<&ChatContext<'_>>) -> Vec<Message> {
    let article = context.and_then(|c| c.article);
    let slides = context.map_or(&[][..], |c| c.slides);

    let mut messages = Vec::with_capacity(FIELD_RULES.len() + 3);
    if let Some(article) = article {
        messages.push(Message::system(format!("Input Article: {}", article)));
    }
    messages.push(Message::system(format!(
        "User will ask you to create or update text content for some slides{}. {}\nThe existing slides are as follows: {}",
        if article.is_some() { " based on the aforementioned Input Article" } else { "" },
        SLIDE_FORMAT,
        slides_json(slides),
    )));
    messages.extend(FIELD_RULES.iter().map(|rule| Message::system(*rule)));
    messages.push(Message::user(prompt));
    messages
}

/// Request for the single slide covering one source chunk.
pub fn slide_prompt(chunk: &str, slide_number: usize) -> String {
    format!(
        "Create slide number {} summarizing the following part of the Input Article. Respond with a list holding exactly one slide.\n\n{}",
        slide_number, chunk
    )
}

fn slides_json(slides: &[SlideContent]) -> String {
    // A slice of plain structs always serializes
    serde_json::to_string(slides).unwrap_or_else(|_| "[]".to_string())
}

/// Words across all messages, used to pick the model.
pub fn word_count(messages: &[Message]) -> usize {
    messages
        .iter()
        .map(|m| crate::source::word_count(&m.content))
        .sum()
}
