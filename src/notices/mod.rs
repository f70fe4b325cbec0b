//! User-visible notices and the mapping from console errors to notice text.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::errors::ConsoleError;

pub const MSG_BAD_REQUEST: &str = "Missing fields or invalid request";
pub const MSG_UNAUTHORIZED: &str = "Invalid or missing OAuth 2 access token.";
pub const MSG_FORBIDDEN: &str = "Access denied. Are you logged in?";
pub const MSG_NOT_FOUND: &str = "Resource not found.";
pub const MSG_NOT_ACCEPTABLE: &str = "Invalid XSRF token. Refresh the page.";
pub const MSG_PRECONDITION_FAILED: &str =
    "Your Google API Project ID is incorrect or you do not have access to it";
pub const MSG_UNKNOWN: &str = "Unknown error.";
pub const MSG_UNREACHABLE: &str = "Unable to reach the console backend.";
pub const MSG_NETWORK_NOT_CONFIGURED: &str = "Configure the project network first.";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    #[default]
    Default,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub kind: NoticeKind,
    pub content: String,
    pub expand: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_content: Option<String>,
}

impl Notice {
    pub fn new(kind: NoticeKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            expand: false,
            extra_content: None,
        }
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra_content = Some(extra.into());
        self
    }
}

/// Queue of notices waiting to be shown; equal notices are kept once.
#[derive(Debug, Default)]
pub struct NoticeQueue {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, Vec<Notice>> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `notice` unless one of the same kind and content is already waiting.
    pub fn add(&self, notice: Notice) {
        let mut notices = self.queue();
        let duplicate = notices
            .iter()
            .any(|n| n.kind == notice.kind && n.content == notice.content);
        if !duplicate {
            notices.push(notice);
        }
    }

    pub fn success(&self, content: impl Into<String>) {
        self.add(Notice::new(NoticeKind::Success, content));
    }

    pub fn error(&self, content: impl Into<String>, extra: Option<String>) {
        let notice = Notice::new(NoticeKind::Error, content);
        self.add(match extra {
            Some(extra) => notice.with_extra(extra),
            None => notice,
        });
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.queue().clone()
    }

    pub fn clear(&self) {
        self.queue().clear();
    }

    /// Queue the error notice(s) describing `err`.
    pub fn report(&self, err: &ConsoleError) {
        match err {
            ConsoleError::Transport(detail) | ConsoleError::Decode(detail) => {
                self.error(MSG_UNREACHABLE, Some(detail.clone()));
            }
            ConsoleError::NetworkNotConfigured(_) => self.error(MSG_NETWORK_NOT_CONFIGURED, None),
            ConsoleError::Backend { status, messages, .. } => match status_message(*status) {
                Some(text) => self.error(text, None),
                None if messages.is_empty() => self.error(MSG_UNKNOWN, None),
                None => {
                    for message in messages {
                        self.error(message.clone(), None);
                    }
                }
            },
            ConsoleError::NotFound(_) => self.error(MSG_NOT_FOUND, None),
            other => self.error(other.message(), None),
        }
    }
}

fn status_message(status: u16) -> Option<&'static str> {
    match status {
        400 => Some(MSG_BAD_REQUEST),
        401 => Some(MSG_UNAUTHORIZED),
        403 => Some(MSG_FORBIDDEN),
        404 => Some(MSG_NOT_FOUND),
        406 => Some(MSG_NOT_ACCEPTABLE),
        412 => Some(MSG_PRECONDITION_FAILED),
        _ => None,
    }
}
