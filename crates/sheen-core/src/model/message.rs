use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RoutineProduct;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Why a message was logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageContext {
    NameIntroduction,
    WelcomeMessage,
    GeneralChat,
    RoutineGeneration,
}

impl std::fmt::Display for MessageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameIntroduction => write!(f, "name_introduction"),
            Self::WelcomeMessage => write!(f, "welcome_message"),
            Self::GeneralChat => write!(f, "general_chat"),
            Self::RoutineGeneration => write!(f, "routine_generation"),
        }
    }
}

/// A conversation log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub context: MessageContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<RoutineProduct>>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, context: MessageContext) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            context,
            message_id: None,
            products: None,
        }
    }

    pub fn user(content: impl Into<String>, context: MessageContext) -> Self {
        Self::new(Role::User, content, context)
    }

    pub fn assistant(content: impl Into<String>, context: MessageContext) -> Self {
        Self::new(Role::Assistant, content, context)
    }

    /// Tag the message with a fresh unique id.
    pub fn with_id(mut self) -> Self {
        self.message_id = Some(Uuid::now_v7());
        self
    }

    pub fn with_products(mut self, products: Vec<RoutineProduct>) -> Self {
        self.products = Some(products);
        self
    }

    /// Strip metadata for the wire.
    pub fn to_chat(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Role/content pair exchanged with the completion API and the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
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

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
