//! In-memory stand-ins for the outbound seams, shared by unit tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::analysis::llm::{ChatMessage, ChatModel, Role};
use crate::analysis::AnalysisError;
use crate::notify::{ChatSink, NotifyError, SlackMessage};
use crate::pr::{DiffPayload, PrError, PullRequestContext, SourceHost};

pub(crate) fn sample_context() -> PullRequestContext {
    PullRequestContext {
        number: 42,
        title: "Add OAuth2 login flow".to_string(),
        author: "alice".to_string(),
        base_branch: "main".to_string(),
        head_branch: "feature/oauth".to_string(),
        description: Some("Adds the login flow.".to_string()),
        url: "https://github.com/org/app/pull/42".to_string(),
        repo_identifier: "org/app".to_string(),
    }
}

/// `count` lines of the form `+added line N`, no trailing newline.
pub(crate) fn sample_diff(count: usize) -> String {
    (1..=count)
        .map(|i| format!("+added line {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) struct FakeSource {
    diff: Result<String, StatusCode>,
    details: Option<PullRequestContext>,
    diff_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    comments: Mutex<Vec<String>>,
}

impl FakeSource {
    pub(crate) fn with_diff(diff: impl Into<String>) -> Self {
        Self {
            diff: Ok(diff.into()),
            details: Some(sample_context()),
            diff_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
            comments: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(status: StatusCode) -> Self {
        Self {
            diff: Err(status),
            details: None,
            ..Self::with_diff("")
        }
    }

    pub(crate) fn diff_calls(&self) -> usize {
        self.diff_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn comments(&self) -> Vec<String> {
        self.comments.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceHost for FakeSource {
    async fn fetch_diff(&self, _repo: &str, _number: u64) -> Result<DiffPayload, PrError> {
        self.diff_calls.fetch_add(1, Ordering::SeqCst);
        match &self.diff {
            Ok(diff) => Ok(DiffPayload::new(diff.clone())),
            Err(status) => Err(PrError::Status(*status)),
        }
    }

    async fn fetch_details(
        &self,
        _repo: &str,
        _number: u64,
    ) -> Result<PullRequestContext, PrError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.details
            .clone()
            .ok_or(PrError::Status(StatusCode::NOT_FOUND))
    }

    async fn post_comment(&self, _repo: &str, _number: u64, body: &str) -> Result<(), PrError> {
        self.comments.lock().unwrap().push(body.to_string());
        Ok(())
    }
}

enum Script {
    Reply(String),
    Fail,
    Panic,
}

pub(crate) struct ScriptedModel {
    script: Script,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedModel {
    fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub(crate) fn reply(text: &str) -> Self {
        Self::new(Script::Reply(text.to_string()))
    }

    pub(crate) fn fail() -> Self {
        Self::new(Script::Fail)
    }

    pub(crate) fn panicking() -> Self {
        Self::new(Script::Panic)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Content of the last user message seen.
    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone());
        *self.last_prompt.lock().unwrap() = prompt;

        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail => Err(AnalysisError::MissingContent),
            Script::Panic => panic!("model exploded"),
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    fail: bool,
    attempts: AtomicUsize,
    messages: Mutex<Vec<SlackMessage>>,
}

impl RecordingSink {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Messages that were accepted.
    pub(crate) fn messages(&self) -> Vec<SlackMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSink for RecordingSink {
    async fn deliver(&self, message: &SlackMessage) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotifyError::Status(StatusCode::INTERNAL_SERVER_ERROR));
        }
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}
