//! Builds the ordered message lists sent to the completion API.
//!
//! The system prompt always comes first, history stays chronological and the new
//! turn comes last. Formatting instructions are appended to message content and
//! never sent as separate messages.

use crate::conversation::ConversationLog;
use crate::model::{ChatMessage, Role, RoutineProduct, UserProfile};

/// Appended verbatim to the outgoing user turn of a chat request.
pub const FORMATTING_SUFFIX: &str = "\n\nPlease format your response with bullet points (•) and numbers (1., 2., 3.) for easy reading. Avoid using markdown symbols like # or *.";

const CHAT_PERSONA: &str = "You are a L'Oréal beauty and skincare expert assistant. I only provide advice about L'Oréal products, beauty routines, skincare, makeup, and haircare topics. If you ask me about anything unrelated to beauty, skincare, makeup, haircare, or L'Oréal products, I will politely decline and redirect our conversation back to beauty topics where I can best help you. I provide helpful advice about L'Oréal beauty products, routines, and skincare with the expertise and quality you expect from L'Oréal. Format responses using bullet points (•) and numbered lists (1., 2., 3.) instead of markdown symbols like # or *. Keep responses concise but informative and easy to read while maintaining L'Oréal's commitment to beauty excellence.";

const CHAT_MEMORY_INSTRUCTION: &str = "Remember previous conversations and refer to the user by name when appropriate. Build upon previous discussions about their beauty needs and preferences.";

const ROUTINE_PERSONA: &str = "You are a L'Oréal beauty and skincare expert. I only provide advice about L'Oréal products, beauty routines, skincare, makeup, and haircare topics. If asked about anything unrelated to beauty, skincare, makeup, haircare, or L'Oréal products, I will politely decline and redirect the conversation back to beauty topics where I can best help you. Create personalized L'Oréal beauty routines based on the products provided, drawing on L'Oréal's expertise and innovation in beauty. Format your response using bullet points (•) and numbered lists (1., 2., 3.) instead of markdown symbols like # or *. Use clear, simple formatting that's easy to read in a web browser.";

const ROUTINE_PERSONALIZE_INSTRUCTION: &str =
    "Personalize the routine based on the user's profile and previous conversations.";

const ROUTINE_INSTRUCTIONS: &str = "Please format your response with:
• Bullet points for lists and tips
• Numbers (1., 2., 3.) for step-by-step instructions
• Clear section breaks with simple text headings
• NO markdown symbols like # or *

Include:
• Morning routine (if applicable)
• Evening routine (if applicable)
• Application order and timing
• Important tips or precautions
• How often to use each product

Make it comprehensive but easy to follow with clear formatting.";

/// Chat turns above this count mark the user as returning in the context block.
const RETURNING_USER_THRESHOLD: u64 = 5;

/// Profile summary injected into system prompts. Absent fields contribute nothing.
pub fn context_block(profile: &UserProfile) -> String {
    let mut out = String::new();

    if let Some(ref name) = profile.name {
        out.push_str(&format!("User's name: {name}\n"));
    }
    if let Some(skin_type) = profile.skin_type {
        out.push_str(&format!("Skin type: {skin_type}\n"));
    }
    if !profile.concerns.is_empty() {
        let concerns: Vec<&str> = profile.concerns.iter().map(|c| c.keyword()).collect();
        out.push_str(&format!("Beauty concerns: {}\n", concerns.join(", ")));
    }
    if !profile.selected_products.is_empty() {
        let names: Vec<&str> = profile
            .selected_products
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        out.push_str(&format!(
            "Currently selected products: {}\n",
            names.join(", ")
        ));
    }
    if let Some(age) = profile.age {
        out.push_str(&format!("Age: {age}\n"));
    }
    if profile.total_messages > RETURNING_USER_THRESHOLD {
        out.push_str(&format!(
            "This is a returning user with {} previous messages. Reference previous conversations when relevant.\n",
            profile.total_messages
        ));
    }

    out
}

fn with_context(persona: &str, profile: &UserProfile, closing: &str) -> String {
    let block = context_block(profile);
    let context = if block.is_empty() {
        String::new()
    } else {
        format!("User Context:\n{block}")
    };
    format!("{persona}\n\n{context}\n\n{closing}")
}

pub fn chat_system_prompt(profile: &UserProfile) -> String {
    with_context(CHAT_PERSONA, profile, CHAT_MEMORY_INSTRUCTION)
}

pub fn routine_system_prompt(profile: &UserProfile) -> String {
    with_context(ROUTINE_PERSONA, profile, ROUTINE_PERSONALIZE_INSTRUCTION)
}

/// Outbound messages for a free-form chat turn.
///
/// `log` already holds `new_text` as its latest entry. Its last
/// [`CONTEXT_WINDOW`](crate::conversation::CONTEXT_WINDOW) entries are sent,
/// then `new_text` again with the formatting suffix.
pub fn assemble_chat(
    profile: &UserProfile,
    log: &ConversationLog,
    new_text: &str,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(chat_system_prompt(profile))];
    messages.extend(log.context_window());
    messages.push(ChatMessage::user(format!("{new_text}{FORMATTING_SUFFIX}")));
    messages
}

/// The synthesized user request for routine generation.
pub fn routine_request_text(profile: &UserProfile, products: &[RoutineProduct]) -> String {
    let greeting = match profile.name {
        Some(ref name) => format!("Hi, this is {name}. "),
        None => String::new(),
    };
    // Vec<RoutineProduct> always serializes; fall back to the compact form just in case.
    let payload = serde_json::to_string_pretty(products)
        .or_else(|_| serde_json::to_string(products))
        .unwrap_or_default();
    format!(
        "{greeting}Please create a personalized beauty routine using these products: {payload}.\n\n{ROUTINE_INSTRUCTIONS}"
    )
}

/// Outbound messages for routine generation: system prompt plus one user message.
pub fn assemble_routine(profile: &UserProfile, products: &[RoutineProduct]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(routine_system_prompt(profile)),
        ChatMessage::user(routine_request_text(profile, products)),
    ]
}

/// Relay-side normalization of a client-supplied chat history: make sure the
/// persona leads and the trailing user turn carries the formatting suffix once.
pub fn finalize_chat_history(mut history: Vec<ChatMessage>) -> Vec<ChatMessage> {
    if history.first().map(|m| m.role) != Some(Role::System) {
        history.insert(
            0,
            ChatMessage::system(chat_system_prompt(&UserProfile::default())),
        );
    }
    if let Some(last) = history.last_mut() {
        if last.role == Role::User && !last.content.ends_with(FORMATTING_SUFFIX) {
            last.content.push_str(FORMATTING_SUFFIX);
        }
    }
    history
}
