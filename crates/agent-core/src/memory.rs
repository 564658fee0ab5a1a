//! Injected Memory Collaborators
//!
//! An [`Agent`](crate::agent::Agent) keeps no state between invocations
//! unless a [`ConversationMemory`] is attached. Lessons learned across runs
//! live in a [`LessonStore`] owned by the caller and passed where needed.
//!
//! Both in-memory implementations serialize access with a `RwLock`, so a
//! single store can be shared by agents running on different tasks.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;

/// Ordered turn history attached to an agent
pub trait ConversationMemory: Send + Sync {
    /// Record one turn
    fn append(&self, turn: Message);

    /// Record a request and its answer as adjacent turns. Implementations
    /// shared between agents should override this to write both under one
    /// lock.
    fn append_exchange(&self, user: Message, assistant: Message) {
        self.append(user);
        self.append(assistant);
    }

    /// All recorded turns, oldest first
    fn history(&self) -> Vec<Message>;

    fn clear(&self);
}

/// Process-local conversation history
#[derive(Debug)]
pub struct InMemoryConversation {
    id: Uuid,
    max_turns: Option<usize>,
    turns: RwLock<Vec<Message>>,
}

impl Default for InMemoryConversation {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            max_turns: None,
            turns: RwLock::new(Vec::new()),
        }
    }

    /// Keep only the most recent `max_turns` turns
    pub fn bounded(max_turns: usize) -> Self {
        Self {
            max_turns: Some(max_turns),
            ..Self::new()
        }
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.turns.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn extend(&self, new_turns: impl IntoIterator<Item = Message>) {
        let mut turns = self.turns.write().unwrap_or_else(PoisonError::into_inner);
        turns.extend(new_turns);
        if let Some(max) = self.max_turns {
            let excess = turns.len().saturating_sub(max);
            if excess > 0 {
                turns.drain(..excess);
                tracing::debug!(conversation = %self.id, dropped = excess, "Trimmed conversation history");
            }
        }
    }
}

impl ConversationMemory for InMemoryConversation {
    fn append(&self, turn: Message) {
        self.extend([turn]);
    }

    fn append_exchange(&self, user: Message, assistant: Message) {
        self.extend([user, assistant]);
    }

    fn history(&self) -> Vec<Message> {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear(&self) {
        self.turns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Something learned from feedback on an earlier answer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// What happened
    pub situation: String,
    /// Feedback received
    pub feedback: String,
    /// What was learned
    pub learning: String,
    /// How to apply it next time
    pub application: String,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl Lesson {
    pub fn new(
        situation: impl Into<String>,
        feedback: impl Into<String>,
        learning: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        Self {
            situation: situation.into(),
            feedback: feedback.into(),
            learning: learning.into(),
            application: application.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Caller-owned repository of lessons
pub trait LessonStore: Send + Sync {
    fn add(&self, lesson: Lesson);

    /// Lessons in the order they were added
    fn list(&self) -> Vec<Lesson>;

    /// Bullet list for inclusion in a prompt
    fn render(&self) -> String {
        self.list()
            .iter()
            .map(|l| format!("- {}: {}", l.learning, l.application))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Default)]
pub struct MemoryLessonStore {
    lessons: RwLock<Vec<Lesson>>,
}

impl MemoryLessonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `lessons`
    pub fn with_lessons(lessons: impl IntoIterator<Item = Lesson>) -> Self {
        Self {
            lessons: RwLock::new(lessons.into_iter().collect()),
        }
    }
}

impl LessonStore for MemoryLessonStore {
    fn add(&self, lesson: Lesson) {
        self.lessons
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(lesson);
    }

    fn list(&self) -> Vec<Lesson> {
        self.lessons
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
