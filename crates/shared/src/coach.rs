//! AI-coach chat screen: reply normalization, outcome detection and the
//! Active -> Ended session state machine

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;
use uuid::Uuid;

use crate::messages::{ChatLogEntry, ChatProxyRequest};

pub const GREETING: &str = "سلام! من مشاور هوشمند شما هستم. من اینجا هستم تا به شما کمک کنم تا مشخص کنیم کدام نوع مشاوره برای شما مناسب‌تر است. لطفاً درباره وضعیت فعلی خود و چالش‌هایی که با آنها روبرو هستید صحبت کنید.";
pub const NO_REPLY_FALLBACK: &str = "متأسفم، نتوانستم پاسخ مناسبی دریافت کنم.";
pub const CONNECTION_ERROR: &str = "متأسفم، خطایی در ارتباط رخ داد. لطفاً دوباره تلاش کنید.";

/// Trailing fenced block carrying the final verdict
static OUTCOME_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)```(?:json)?\s*(\{[^`]*?"status"\s*:\s*"done"[^`]*?\})\s*```\s*$"#)
        .expect("outcome marker pattern is valid")
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatOutcome {
    #[serde(rename = "تراپی")]
    Therapy,
    #[serde(rename = "کوچینگ")]
    Coaching,
    #[serde(rename = "منتورینگ")]
    Mentoring,
}

impl ChatOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ChatOutcome::Therapy => "تراپی",
            ChatOutcome::Coaching => "کوچینگ",
            ChatOutcome::Mentoring => "منتورینگ",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "تراپی" => Some(ChatOutcome::Therapy),
            "کوچینگ" => Some(ChatOutcome::Coaching),
            "منتورینگ" => Some(ChatOutcome::Mentoring),
            _ => None,
        }
    }

    /// Closing message shown when the verdict arrives without prose
    pub fn summary(&self) -> &'static str {
        match self {
            ChatOutcome::Coaching => "بر اساس صحبت‌های شما، کوچینگ برای شما مناسب است. کوچینگ به شما کمک می‌کند تا اهداف خود را مشخص کرده و مسیر رسیدن به آنها را طراحی کنید.",
            ChatOutcome::Therapy => "بر اساس صحبت‌های شما، درمان روان‌شناختی (تراپی) برای شما توصیه می‌شود. تراپی به شما کمک می‌کند تا با مسائل عمیق‌تر روانی خود کار کنید.",
            ChatOutcome::Mentoring => "بر اساس صحبت‌های شما، منتورینگ برای شما مناسب است. منتورینگ به شما کمک می‌کند تا از تجربیات و راهنمایی‌های یک متخصص با تجربه بهره‌مند شوید.",
        }
    }

    /// Words that mark a product as relevant to this outcome
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            ChatOutcome::Coaching => &["کوچینگ"],
            ChatOutcome::Therapy => &["درمان", "تراپی"],
            ChatOutcome::Mentoring => &["منتور"],
        }
    }
}

/// `{"status":"done","result":...}` as emitted by the workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResult {
    pub status: String,
    pub result: ChatOutcome,
}

impl ChatResult {
    fn parse(value: Value) -> Option<Self> {
        serde_json::from_value::<ChatResult>(value)
            .ok()
            .filter(|r| r.status == "done")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoachReply {
    pub text: String,
    pub outcome: Option<ChatOutcome>,
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Display text from any of the reply shapes the webhook has produced
pub fn extract_reply_text(body: &Value) -> String {
    if let Some(text) = body
        .as_array()
        .and_then(|items| items.first())
        .and_then(|first| non_empty_str(first.get("output")))
    {
        return text.to_string();
    }

    if let Some(object) = body.as_object() {
        if let Some(text) =
            non_empty_str(object.get("response")).or_else(|| non_empty_str(object.get("message")))
        {
            return text.to_string();
        }
    }

    NO_REPLY_FALLBACK.to_string()
}

/// Split a trailing verdict block off the reply text.
/// Text without a well-formed block is returned unchanged.
pub fn extract_outcome_marker(text: &str) -> (String, Option<ChatOutcome>) {
    let Some(captures) = OUTCOME_MARKER.captures(text) else {
        return (text.to_string(), None);
    };
    let (Some(block), Some(json)) = (captures.get(0), captures.get(1)) else {
        return (text.to_string(), None);
    };

    let outcome = serde_json::from_str::<Value>(json.as_str())
        .ok()
        .and_then(ChatResult::parse)
        .map(|r| r.result);

    match outcome {
        Some(outcome) => (text[..block.start()].trim_end().to_string(), Some(outcome)),
        None => (text.to_string(), None),
    }
}

/// Full interpretation of a proxy body. A top-level `status`/`result` pair
/// wins over the text convention.
pub fn interpret_reply(body: &Value) -> CoachReply {
    if body.get("status").is_some() {
        if let Some(result) = ChatResult::parse(body.clone()) {
            return CoachReply {
                text: result.result.summary().to_string(),
                outcome: Some(result.result),
            };
        }
    }

    let raw = extract_reply_text(body);
    let (text, outcome) = extract_outcome_marker(&raw);
    let text = match outcome {
        Some(outcome) if text.is_empty() => outcome.summary().to_string(),
        _ => text,
    };
    CoachReply { text, outcome }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    Ended,
}

/// Action offered once the conversation reaches a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Continue with a human coach in the messaging app
    Messaging,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendRejected {
    #[error("message is empty")]
    Empty,
    #[error("a reply is still pending")]
    InFlight,
    #[error("the conversation has ended")]
    Ended,
}

pub struct CoachSession {
    session_id: Uuid,
    user_id: String,
    transcript: Vec<ChatMessage>,
    phase: Phase,
    in_flight: Option<String>,
    outcome: Option<ChatOutcome>,
    last_exchange: Option<ChatLogEntry>,
}

impl CoachSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: user_id.into(),
            transcript: vec![ChatMessage::new(GREETING, Sender::Ai)],
            phase: Phase::Active,
            in_flight: None,
            outcome: None,
            last_exchange: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Option<ChatOutcome> {
        self.outcome
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn accepts_input(&self) -> bool {
        self.phase == Phase::Active && self.in_flight.is_none()
    }

    /// Record the user's message and build the proxy payload
    pub fn begin_send(&mut self, text: &str) -> Result<ChatProxyRequest, SendRejected> {
        if self.phase == Phase::Ended {
            return Err(SendRejected::Ended);
        }
        if self.in_flight.is_some() {
            return Err(SendRejected::InFlight);
        }
        if text.trim().is_empty() {
            return Err(SendRejected::Empty);
        }

        let message = ChatMessage::new(text, Sender::User);
        let request = ChatProxyRequest {
            message: text.to_string(),
            user_id: self.user_id.clone(),
            timestamp: message.timestamp.to_rfc3339(),
        };
        self.transcript.push(message);
        self.in_flight = Some(text.to_string());
        Ok(request)
    }

    /// Apply the proxy's reply body
    pub fn complete(&mut self, body: &Value) -> &ChatMessage {
        let reply = interpret_reply(body);
        if let Some(outcome) = reply.outcome {
            self.outcome = Some(outcome);
            self.phase = Phase::Ended;
        }
        if let Some(sent) = self.in_flight.take() {
            self.last_exchange = Some(ChatLogEntry {
                message: sent,
                response: Some(reply.text.clone()),
                session_id: Some(self.session_id.to_string()),
            });
        }
        self.push_ai(reply.text)
    }

    /// The request never produced a body
    pub fn fail(&mut self) -> &ChatMessage {
        self.in_flight = None;
        self.push_ai(CONNECTION_ERROR)
    }

    /// Row for the most recent completed exchange, consumed once
    pub fn take_log_entry(&mut self) -> Option<ChatLogEntry> {
        self.last_exchange.take()
    }

    pub fn follow_up(&self) -> Option<FollowUp> {
        match (self.phase, self.outcome) {
            (Phase::Ended, Some(ChatOutcome::Coaching)) => Some(FollowUp::Messaging),
            _ => None,
        }
    }

    fn push_ai(&mut self, text: impl Into<String>) -> &ChatMessage {
        self.transcript.push(ChatMessage::new(text, Sender::Ai));
        &self.transcript[self.transcript.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_reply_text_shapes() {
        assert_eq!(extract_reply_text(&json!([{ "output": "x" }])), "x");
        assert_eq!(extract_reply_text(&json!({ "response": "y" })), "y");
        assert_eq!(extract_reply_text(&json!({ "message": "z" })), "z");
        assert_eq!(extract_reply_text(&json!({ "other": 1 })), NO_REPLY_FALLBACK);
        assert_eq!(extract_reply_text(&json!([])), NO_REPLY_FALLBACK);
        assert_eq!(extract_reply_text(&json!([{ "text": "x" }])), NO_REPLY_FALLBACK);
        assert_eq!(extract_reply_text(&json!("plain")), NO_REPLY_FALLBACK);
    }

    #[test]
    fn test_response_preferred_over_message() {
        let body = json!({ "response": "first", "message": "second" });
        assert_eq!(extract_reply_text(&body), "first");
        let body = json!({ "response": "", "message": "second" });
        assert_eq!(extract_reply_text(&body), "second");
    }

    #[test]
    fn test_outcome_marker_stripped() {
        let text = "به نظر می‌رسد کوچینگ مناسب شماست.\n```json\n{\"status\":\"done\",\"result\":\"کوچینگ\"}\n```";
        let (display, outcome) = extract_outcome_marker(text);
        assert_eq!(display, "به نظر می‌رسد کوچینگ مناسب شماست.");
        assert_eq!(outcome, Some(ChatOutcome::Coaching));
    }

    #[test]
    fn test_outcome_marker_tolerates_spacing_and_key_order() {
        let text = "ok ``` { \"result\": \"تراپی\", \"status\": \"done\" } ```  \n";
        let (display, outcome) = extract_outcome_marker(text);
        assert_eq!(display, "ok");
        assert_eq!(outcome, Some(ChatOutcome::Therapy));
    }

    #[test]
    fn test_outcome_marker_ignored_when_not_trailing_or_unknown() {
        let text = "```json\n{\"status\":\"done\",\"result\":\"کوچینگ\"}\n``` بعدش متن";
        assert_eq!(extract_outcome_marker(text), (text.to_string(), None));

        let text = "x\n```json\n{\"status\":\"done\",\"result\":\"other\"}\n```";
        assert_eq!(extract_outcome_marker(text), (text.to_string(), None));

        let text = "x\n```json\n{\"status\":\"pending\",\"result\":\"کوچینگ\"}\n```";
        assert_eq!(extract_outcome_marker(text).1, None);
    }

    #[test]
    fn test_interpret_structured_side_channel() {
        let reply = interpret_reply(&json!({ "status": "done", "result": "منتورینگ" }));
        assert_eq!(reply.outcome, Some(ChatOutcome::Mentoring));
        assert_eq!(reply.text, ChatOutcome::Mentoring.summary());
    }

    #[test]
    fn test_interpret_marker_only_uses_summary() {
        let body = json!([{ "output": "```json\n{\"status\":\"done\",\"result\":\"کوچینگ\"}\n```" }]);
        let reply = interpret_reply(&body);
        assert_eq!(reply.outcome, Some(ChatOutcome::Coaching));
        assert_eq!(reply.text, ChatOutcome::Coaching.summary());
    }

    #[test]
    fn test_session_starts_with_greeting() {
        let session = CoachSession::new("u1");
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].sender, Sender::Ai);
        assert_eq!(session.phase(), Phase::Active);
        assert!(session.accepts_input());
    }

    #[test]
    fn test_session_single_request_in_flight() {
        let mut session = CoachSession::new("u1");
        let req = session.begin_send("سلام").unwrap();
        assert_eq!(req.message, "سلام");
        assert_eq!(req.user_id, "u1");
        assert!(session.is_loading());
        assert_eq!(session.begin_send("دوباره"), Err(SendRejected::InFlight));
        assert_eq!(session.transcript().len(), 2);
    }

    #[test]
    fn test_session_rejects_blank() {
        let mut session = CoachSession::new("u1");
        assert_eq!(session.begin_send("   "), Err(SendRejected::Empty));
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn test_session_ends_on_coaching_marker() {
        let mut session = CoachSession::new("u1");
        session.begin_send("کمکم کن").unwrap();
        let body = json!([{ "output": "پیشنهاد من کوچینگ است.\n```json\n{\"status\":\"done\",\"result\":\"کوچینگ\"}\n```" }]);
        let shown = session.complete(&body).text.clone();

        assert_eq!(shown, "پیشنهاد من کوچینگ است.");
        assert_eq!(session.phase(), Phase::Ended);
        assert_eq!(session.outcome(), Some(ChatOutcome::Coaching));
        assert!(!session.accepts_input());
        assert_eq!(session.begin_send("سلام"), Err(SendRejected::Ended));
        assert_eq!(session.follow_up(), Some(FollowUp::Messaging));
    }

    #[test]
    fn test_no_follow_up_for_other_outcomes() {
        let mut session = CoachSession::new("u1");
        session.begin_send("x").unwrap();
        session.complete(&json!({ "status": "done", "result": "تراپی" }));
        assert_eq!(session.phase(), Phase::Ended);
        assert_eq!(session.follow_up(), None);
    }

    #[test]
    fn test_failure_keeps_session_active() {
        let mut session = CoachSession::new("u1");
        session.begin_send("x").unwrap();
        assert_eq!(session.fail().text, CONNECTION_ERROR);
        assert!(session.accepts_input());
        assert!(session.take_log_entry().is_none());
    }

    #[test]
    fn test_log_entry_for_exchange() {
        let mut session = CoachSession::new("u1");
        session.begin_send("سوال").unwrap();
        session.complete(&json!({ "response": "جواب" }));
        let entry = session.take_log_entry().unwrap();
        assert_eq!(entry.message, "سوال");
        assert_eq!(entry.response.as_deref(), Some("جواب"));
        assert_eq!(entry.session_id, Some(session.session_id().to_string()));
        assert!(session.take_log_entry().is_none());
    }

    #[test]
    fn test_transcript_keeps_insertion_order() {
        let mut session = CoachSession::new("u1");
        session.begin_send("a").unwrap();
        session.complete(&json!({ "message": "a" }));
        session.begin_send("a").unwrap();
        session.complete(&json!({ "message": "a" }));
        let texts: Vec<_> = session.transcript().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(&texts[1..], &["a", "a", "a", "a"]);
    }
}
