//! One user's advisor session: profile, transcript, selection and layout
//! preference, with every mutation written through to the store.
//!
//! Turns take `&mut self`, so a second turn cannot start while one is awaiting
//! its completion. The borrow is the only turn state there is.

use chrono::Utc;

use crate::assemble;
use crate::conversation::ConversationLog;
use crate::error::{Result, SheenError};
use crate::extract;
use crate::gateway::{CompletionGateway, RoutineRequest};
use crate::model::{Message, MessageContext, Product, UserProfile};
use crate::selection::{Selection, Toggle};
use crate::store::{Direction, KeyValueStore, ProfileStore};

/// Logged as the user side of a routine-generation turn.
pub const ROUTINE_REQUEST_TEXT: &str = "Generate personalized routine with selected products";

/// Shown instead of calling out when nothing is selected.
pub const EMPTY_SELECTION_NOTICE: &str =
    "Please select some products first to generate a personalized routine!";

pub struct Session<S: KeyValueStore> {
    store: ProfileStore<S>,
    profile: UserProfile,
    log: ConversationLog,
    selection: Selection,
    direction: Direction,
}

pub fn welcome_text(name: &str) -> String {
    format!(
        "Nice to meet you, {name}! I'm here to help you discover the perfect L'Oréal products and create personalized beauty routines. Feel free to ask me about skincare, makeup, haircare, or any beauty concerns you might have."
    )
}

impl<S: KeyValueStore> Session<S> {
    /// Rehydrate from `store`. Unreadable entries start empty.
    ///
    /// Opening never writes. A fresh profile is stamped in memory and the stamp
    /// lands with the first mutation.
    pub fn open(store: S) -> Self {
        let store = ProfileStore::new(store);
        let (mut profile, log) = store.load();
        let selection = store.load_selection();
        let direction = store.load_direction();

        profile.selected_products = selection.summaries();
        if profile.session_started.is_none() {
            profile.session_started = Some(Utc::now());
        }

        tracing::debug!(
            messages = log.len(),
            selected = selection.len(),
            returning = profile.is_returning(),
            "session opened"
        );

        Self {
            store,
            profile,
            log,
            selection,
            direction,
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn store(&self) -> &ProfileStore<S> {
        &self.store
    }

    fn save(&self) {
        self.store.save(&self.profile, &self.log);
    }

    /// Record the user's name and the welcome exchange. Returns the welcome text.
    pub fn set_name(&mut self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SheenError::InvalidInput("name cannot be empty".into()));
        }

        self.profile.name = Some(name.to_string());
        self.log.push(
            Message::user(format!("My name is {name}"), MessageContext::NameIntroduction)
                .with_id(),
        );
        let welcome = welcome_text(name);
        self.log
            .push(Message::assistant(welcome.clone(), MessageContext::WelcomeMessage).with_id());
        self.save();
        Ok(welcome)
    }

    pub fn toggle_product(&mut self, product: &Product) -> Toggle {
        let outcome = self.selection.toggle(product);
        self.selection_changed();
        outcome
    }

    /// Drop one product from the selection by id.
    pub fn remove_product(&mut self, id: u32) -> bool {
        let removed = self.selection.remove(id);
        if removed {
            self.selection_changed();
        }
        removed
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.selection_changed();
    }

    fn selection_changed(&mut self) {
        self.profile.selected_products = self.selection.summaries();
        self.store.save_selection(&self.selection);
        self.save();
    }

    /// One free-form chat turn. The reply is returned verbatim.
    ///
    /// The message is logged first, so the outbound window ends with it and
    /// the suffixed copy follows. The transcript is saved whether or not the
    /// gateway succeeds.
    pub async fn send_chat<G: CompletionGateway>(
        &mut self,
        gateway: &G,
        text: &str,
    ) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SheenError::InvalidInput("message cannot be empty".into()));
        }
        if self.profile.name.is_none() {
            return Err(SheenError::InvalidInput(
                "tell me your name before chatting".into(),
            ));
        }

        self.profile = extract::extract(&self.profile, text, &self.selection);
        self.log
            .push(Message::user(text, MessageContext::GeneralChat).with_id());
        self.profile.total_messages += 1;

        let outbound = assemble::assemble_chat(&self.profile, &self.log, text);
        let result = gateway.chat(&outbound).await;

        match result {
            Ok(reply) => {
                self.log.push(
                    Message::assistant(reply.clone(), MessageContext::GeneralChat).with_id(),
                );
                self.save();
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!("chat turn failed: {e}");
                self.save();
                Err(e)
            }
        }
    }

    /// Ask for a routine built from the current selection.
    pub async fn generate_routine<G: CompletionGateway>(&mut self, gateway: &G) -> Result<String> {
        if self.selection.is_empty() {
            return Err(SheenError::InvalidInput(EMPTY_SELECTION_NOTICE.into()));
        }

        let products = self.selection.routine_payload();
        self.profile.selected_products = self.selection.summaries();
        self.log.push(
            Message::user(ROUTINE_REQUEST_TEXT, MessageContext::RoutineGeneration)
                .with_id()
                .with_products(products.clone()),
        );

        let request = RoutineRequest {
            product_data: products.clone(),
            user_profile: Some(self.profile.clone()),
        };

        let result = gateway.generate_routine(&request).await;

        match result {
            Ok(routine) => {
                self.log.push(
                    Message::assistant(routine.clone(), MessageContext::RoutineGeneration)
                        .with_id()
                        .with_products(products),
                );
                self.save();
                Ok(routine)
            }
            Err(e) => {
                tracing::warn!("routine generation failed: {e}");
                self.save();
                Err(e)
            }
        }
    }

    /// Transcript entries to redisplay on restore.
    pub fn replay(&self) -> Vec<&Message> {
        self.log.replay()
    }

    /// Greeting for a returning user, naming what the profile remembers.
    pub fn welcome_back(&self) -> Option<String> {
        if !self.profile.is_returning() {
            return None;
        }
        let name = self.profile.name.as_deref().unwrap_or_default();
        let about = match self.profile.skin_type {
            Some(skin) => format!("{skin} skin"),
            None => "beauty needs".to_string(),
        };
        let concerns = if self.profile.concerns.is_empty() {
            String::new()
        } else {
            let first_two: Vec<&str> = self
                .profile
                .concerns
                .iter()
                .take(2)
                .map(|c| c.keyword())
                .collect();
            format!(" and concerns with {}", first_two.join(" and "))
        };
        Some(format!(
            "Welcome back, {name}! I remember our previous conversations about your {about}{concerns}. How can I help you today?"
        ))
    }

    /// Forget the profile and transcript, in memory and on disk. The selection
    /// stays, so the fresh profile still projects it.
    pub fn reset(&mut self) {
        self.store.clear();
        self.profile = UserProfile {
            selected_products: self.selection.summaries(),
            session_started: Some(Utc::now()),
            ..Default::default()
        };
        self.log.clear();
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn toggle_direction(&mut self) -> Direction {
        self.direction = self.direction.toggled();
        self.store.save_direction(self.direction);
        self.direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::FORMATTING_SUFFIX;
    use crate::model::{ChatMessage, Concern, Role, SkinType};
    use crate::store::{MemoryStore, KEY_CHAT_HISTORY, KEY_USER_PROFILE};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeGateway {
        chats: Mutex<Vec<Vec<ChatMessage>>>,
        routines: Mutex<Vec<RoutineRequest>>,
        fail_with: Option<String>,
    }

    impl FakeGateway {
        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Default::default()
            }
        }

        fn chat_calls(&self) -> usize {
            self.chats.lock().unwrap().len()
        }
    }

    impl CompletionGateway for FakeGateway {
        async fn chat(&self, history: &[ChatMessage]) -> Result<String> {
            self.chats.lock().unwrap().push(history.to_vec());
            match self.fail_with {
                Some(ref msg) => Err(SheenError::Upstream(msg.clone())),
                None => Ok(format!("reply #{}", self.chat_calls())),
            }
        }

        async fn generate_routine(&self, request: &RoutineRequest) -> Result<String> {
            self.routines.lock().unwrap().push(request.clone());
            match self.fail_with {
                Some(ref msg) => Err(SheenError::Upstream(msg.clone())),
                None => Ok("1. Cleanse\n2. Moisturize".to_string()),
            }
        }
    }

    fn product(id: u32, name: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
            brand: "L'Oréal Paris".to_string(),
            category: "skincare".to_string(),
            description: format!("{name} for daily use"),
            image: String::new(),
        }
    }

    fn named_session() -> Session<Arc<MemoryStore>> {
        let mut session = Session::open(Arc::new(MemoryStore::new()));
        session.set_name("Amira").unwrap();
        session
    }

    #[test]
    fn test_open_does_not_write() {
        let kv = Arc::new(MemoryStore::new());
        let session = Session::open(kv.clone());
        assert!(session.profile().session_started.is_some());
        assert!(kv.get(KEY_USER_PROFILE).unwrap().is_none());
        assert!(kv.get(KEY_CHAT_HISTORY).unwrap().is_none());
    }

    #[test]
    fn test_session_start_lands_with_first_mutation() {
        let kv = Arc::new(MemoryStore::new());
        let mut first = Session::open(kv.clone());
        let started = first.profile().session_started;
        first.set_name("Amira").unwrap();

        let second = Session::open(kv);
        assert_eq!(second.profile().session_started, started);
    }

    #[test]
    fn test_set_name_logs_introduction_and_welcome() {
        let session = named_session();
        let messages = session.log().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "My name is Amira");
        assert_eq!(messages[0].context, MessageContext::NameIntroduction);
        assert_eq!(messages[1].context, MessageContext::WelcomeMessage);
        assert!(messages[1].content.starts_with("Nice to meet you, Amira!"));
        assert_eq!(session.replay().len(), 1);
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut session = Session::open(MemoryStore::new());
        assert!(matches!(
            session.set_name("   "),
            Err(SheenError::InvalidInput(_))
        ));
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn test_chat_requires_name_and_text() {
        let gateway = FakeGateway::default();
        let mut session = Session::open(MemoryStore::new());
        let err = session.send_chat(&gateway, "hello").await.unwrap_err();
        assert!(matches!(err, SheenError::InvalidInput(_)));

        session.set_name("Amira").unwrap();
        let err = session.send_chat(&gateway, "  ").await.unwrap_err();
        assert!(matches!(err, SheenError::InvalidInput(_)));
        assert_eq!(gateway.chat_calls(), 0);
    }

    #[tokio::test]
    async fn test_chat_turn_extracts_assembles_and_persists() {
        let gateway = FakeGateway::default();
        let mut session = named_session();

        let reply = session
            .send_chat(&gateway, "My skin feels oily and dry, any tips for acne?")
            .await
            .unwrap();
        assert_eq!(reply, "reply #1");

        let profile = session.profile();
        assert_eq!(profile.skin_type, Some(SkinType::Oily));
        assert_eq!(profile.concerns, vec![Concern::Acne]);
        assert_eq!(profile.total_messages, 1);

        let sent = &gateway.chats.lock().unwrap()[0];
        assert_eq!(sent[0].role, Role::System);
        assert!(sent[0].content.contains("Skin type: oily"));
        // Intro, welcome and the logged turn, then the suffixed copy.
        assert_eq!(sent.len(), 1 + 3 + 1);
        assert_eq!(
            sent[3].content,
            "My skin feels oily and dry, any tips for acne?"
        );
        assert_eq!(
            sent[4].content,
            format!("My skin feels oily and dry, any tips for acne?{FORMATTING_SUFFIX}")
        );

        let (stored, log) = session.store().load();
        assert_eq!(stored.total_messages, 1);
        assert_eq!(log.len(), 4);
        assert_eq!(log.last().unwrap().content, "reply #1");
    }

    #[tokio::test]
    async fn test_history_window_is_bounded() {
        let gateway = FakeGateway::default();
        let mut session = named_session();
        for i in 0..10 {
            session.send_chat(&gateway, &format!("question {i}")).await.unwrap();
        }
        let chats = gateway.chats.lock().unwrap();
        let last = chats.last().unwrap();
        assert_eq!(last.len(), 1 + 8 + 1);
        assert_eq!(last[1].content, "question 6");
        assert_eq!(last[7].content, "reply #9");
        assert_eq!(last[8].content, "question 9");
        assert_eq!(session.profile().total_messages, 10);
    }

    #[tokio::test]
    async fn test_window_ends_with_current_turn() {
        let gateway = FakeGateway::default();
        let mut session = named_session();
        for i in 1..=6 {
            session.send_chat(&gateway, &format!("q{i}")).await.unwrap();
        }
        session.send_chat(&gateway, "CURRENT").await.unwrap();

        let chats = gateway.chats.lock().unwrap();
        let sent = chats.last().unwrap();
        let window: Vec<&str> = sent[1..sent.len() - 1]
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(
            window,
            ["reply #3", "q4", "reply #4", "q5", "reply #5", "q6", "reply #6", "CURRENT"]
        );
        assert_eq!(sent.last().unwrap().content, format!("CURRENT{FORMATTING_SUFFIX}"));
    }

    #[tokio::test]
    async fn test_failed_turn_returns_error_and_keeps_user_message() {
        let gateway = FakeGateway::failing("OpenAI API Error: quota");
        let mut session = named_session();
        let err = session.send_chat(&gateway, "hello").await.unwrap_err();
        assert_eq!(err.to_string(), "OpenAI API Error: quota");
        assert_eq!(gateway.chat_calls(), 1);
        assert_eq!(session.log().last().unwrap().role, Role::User);

        let (_, log) = session.store().load();
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn test_routine_requires_selection() {
        let gateway = FakeGateway::default();
        let mut session = named_session();
        let err = session.generate_routine(&gateway).await.unwrap_err();
        assert!(err.to_string().contains(EMPTY_SELECTION_NOTICE));
        assert!(gateway.routines.lock().unwrap().is_empty());
        assert_eq!(session.log().len(), 2);
    }

    #[tokio::test]
    async fn test_routine_turn() {
        let gateway = FakeGateway::default();
        let mut session = named_session();
        session.toggle_product(&product(1, "Revitalift Serum"));
        session.toggle_product(&product(2, "Hydra Genius"));

        let routine = session.generate_routine(&gateway).await.unwrap();
        assert!(routine.starts_with("1. Cleanse"));

        let requests = gateway.routines.lock().unwrap();
        assert_eq!(requests[0].product_data.len(), 2);
        assert_eq!(
            requests[0].user_profile.as_ref().unwrap().name.as_deref(),
            Some("Amira")
        );

        let messages = session.log().messages();
        let request = &messages[messages.len() - 2];
        assert_eq!(request.content, ROUTINE_REQUEST_TEXT);
        assert_eq!(request.products.as_ref().unwrap().len(), 2);
        let reply = messages.last().unwrap();
        assert_eq!(reply.context, MessageContext::RoutineGeneration);
        assert_eq!(reply.products.as_ref().unwrap()[1].name, "Hydra Genius");
        assert_eq!(session.profile().total_messages, 0);
    }

    #[test]
    fn test_selection_changes_persist_and_project() {
        let kv = Arc::new(MemoryStore::new());
        let mut session = Session::open(kv.clone());
        let serum = product(1, "Revitalift Serum");
        assert_eq!(session.toggle_product(&serum), Toggle::Added);
        session.toggle_product(&product(2, "Hydra Genius"));
        assert_eq!(session.profile().selected_products.len(), 2);

        let reopened = Session::open(kv.clone());
        assert_eq!(reopened.selection().len(), 2);
        assert_eq!(reopened.profile().selected_products[0].name, "Revitalift Serum");

        assert!(session.remove_product(1));
        assert!(!session.remove_product(1));
        session.clear_selection();
        assert!(session.profile().selected_products.is_empty());
        assert!(Session::open(kv).selection().is_empty());
    }

    #[tokio::test]
    async fn test_welcome_back() {
        let gateway = FakeGateway::default();
        let mut session = named_session();
        assert!(session.welcome_back().is_none());

        session.send_chat(&gateway, "hello").await.unwrap();
        assert_eq!(
            session.welcome_back().unwrap(),
            "Welcome back, Amira! I remember our previous conversations about your beauty needs. How can I help you today?"
        );

        session
            .send_chat(&gateway, "sensitive skin with wrinkles, pores and acne")
            .await
            .unwrap();
        assert_eq!(
            session.welcome_back().unwrap(),
            "Welcome back, Amira! I remember our previous conversations about your sensitive skin and concerns with acne and wrinkles. How can I help you today?"
        );
    }

    #[tokio::test]
    async fn test_reset_clears_profile_and_log() {
        let gateway = FakeGateway::default();
        let kv = Arc::new(MemoryStore::new());
        let mut session = Session::open(kv.clone());
        session.set_name("Amira").unwrap();
        session.toggle_product(&product(1, "Serum"));
        session.send_chat(&gateway, "hi").await.unwrap();

        session.reset();
        assert!(session.log().is_empty());
        assert!(session.profile().name.is_none());
        assert_eq!(session.profile().total_messages, 0);
        assert!(kv.get(KEY_CHAT_HISTORY).unwrap().is_none());
        assert!(kv.get(KEY_USER_PROFILE).unwrap().is_none());
        assert_eq!(session.selection().len(), 1);
        assert_eq!(session.profile().selected_products.len(), 1);
        assert_eq!(session.profile().selected_products[0].name, "Serum");

        // A reopened session agrees with the one that was reset.
        let reopened = Session::open(kv);
        assert_eq!(
            reopened.profile().selected_products,
            session.profile().selected_products
        );
    }

    #[test]
    fn test_direction_toggle_persists() {
        let kv = Arc::new(MemoryStore::new());
        let mut session = Session::open(kv.clone());
        assert_eq!(session.direction(), Direction::Ltr);
        assert_eq!(session.toggle_direction(), Direction::Rtl);
        assert_eq!(Session::open(kv).direction(), Direction::Rtl);
    }

    #[tokio::test]
    async fn test_quota_exceeded_does_not_fail_turn() {
        let gateway = FakeGateway::default();
        let mut session = Session::open(MemoryStore::with_quota(16));
        session.set_name("Amira").unwrap();
        let reply = session.send_chat(&gateway, "hello").await.unwrap();
        assert_eq!(reply, "reply #1");
        assert_eq!(session.log().len(), 4);
    }
}
