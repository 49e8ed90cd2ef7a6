//! View model for the query console.
//!
//! Holds everything the window shows: the input field, the append-only
//! message log, the in-flight loading placeholder and the active panel.
//! Renderers read it; only the methods here mutate it.

use serde_json::Value;

use crate::client::QueryError;
use crate::markup::Document;
use crate::report;
use crate::response::{AnalysisResponse, QueryDetails};

pub type MessageId = u64;

pub const LOADING_TEXT: &str = "Analyzing your query...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Question,
    Answer,
    Loading,
}

impl MessageKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            MessageKind::Question => "question",
            MessageKind::Answer => "answer",
            MessageKind::Loading => "loading",
        }
    }
}

/// Plain text is escaped when rendered; rich documents are trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Rich(Document),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub id: MessageId,
    pub kind: MessageKind,
    pub content: Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Conversation,
    Details,
    RawData,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::Conversation, Panel::Details, Panel::RawData];

    pub fn id(&self) -> &'static str {
        match self {
            Panel::Conversation => "conversation",
            Panel::Details => "details",
            Panel::RawData => "raw-data",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Panel::Conversation => "Conversation",
            Panel::Details => "Query details",
            Panel::RawData => "Raw data",
        }
    }

    pub fn from_id(id: &str) -> Option<Panel> {
        Panel::ALL.into_iter().find(|p| p.id() == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// Input was empty after trimming.
    Empty,
    /// A request is already in flight.
    Busy,
}

/// A validated query handed off for dispatch. `id` names its loading placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: MessageId,
    pub query: String,
}

#[derive(Debug)]
pub struct ConsoleView {
    input: String,
    messages: Vec<LogMessage>,
    next_id: MessageId,
    in_flight: Option<MessageId>,
    active_panel: Panel,
    latest: Option<AnalysisResponse>,
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleView {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            messages: Vec::new(),
            next_id: 1,
            in_flight: None,
            active_panel: Panel::Conversation,
            latest: None,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, value: impl Into<String>) {
        self.input = value.into();
    }

    pub fn messages(&self) -> &[LogMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn active_panel(&self) -> Panel {
        self.active_panel
    }

    pub fn latest_details(&self) -> Option<&QueryDetails> {
        self.latest.as_ref().and_then(|r| r.query_details.as_ref())
    }

    pub fn latest_raw_data(&self) -> Option<&Value> {
        self.latest.as_ref().and_then(|r| r.raw_data.as_ref())
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_message(&mut self, kind: MessageKind, content: Content) -> MessageId {
        let id = self.allocate_id();
        self.messages.push(LogMessage { id, kind, content });
        id
    }

    pub fn add_loading(&mut self) -> MessageId {
        self.add_message(MessageKind::Loading, Content::Text(LOADING_TEXT.to_string()))
    }

    /// Removes the loading placeholder with `id`. Other kinds are never removed.
    pub fn remove_loading(&mut self, id: MessageId) -> bool {
        let before = self.messages.len();
        self.messages
            .retain(|m| !(m.id == id && m.kind == MessageKind::Loading));
        self.messages.len() != before
    }

    /// Validates the input and, if accepted, logs the question and a loading
    /// placeholder. The caller dispatches the returned submission and reports
    /// back through [`ConsoleView::settle`].
    pub fn submit(&mut self) -> Result<Submission, Rejected> {
        let query = self.input.trim().to_string();
        if query.is_empty() {
            return Err(Rejected::Empty);
        }
        if self.in_flight.is_some() {
            return Err(Rejected::Busy);
        }

        self.input.clear();
        self.add_message(MessageKind::Question, Content::Text(query.clone()));
        let id = self.add_loading();
        self.in_flight = Some(id);

        Ok(Submission { id, query })
    }

    /// Replaces the loading placeholder of submission `id` with its answer.
    /// Returns false, changing nothing, if `id` is not the request in flight.
    pub fn settle(&mut self, id: MessageId, outcome: Result<AnalysisResponse, QueryError>) -> bool {
        if self.in_flight != Some(id) {
            tracing::debug!(id, "ignoring stale outcome");
            return false;
        }

        self.remove_loading(id);
        self.in_flight = None;

        let document = report::build_outcome(&outcome);
        self.add_message(MessageKind::Answer, Content::Rich(document));

        if let Ok(response) = outcome {
            self.latest = Some(response);
        }
        true
    }

    /// Makes `panel` the only active panel.
    pub fn switch_panel(&mut self, panel: Panel) {
        self.active_panel = panel;
    }

    /// Every panel paired with whether it (and its button) is active.
    pub fn panel_states(&self) -> Vec<(Panel, bool)> {
        Panel::ALL
            .into_iter()
            .map(|p| (p, p == self.active_panel))
            .collect()
    }

    /// Closing is only allowed once nothing would be lost: an empty log and no request in flight.
    pub fn can_close(&self) -> bool {
        self.in_flight.is_none() && self.messages.is_empty()
    }

    /// Empties the log. Refused while a request is in flight.
    pub fn clear_log(&mut self) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        self.messages.clear();
        self.latest = None;
        true
    }
}
