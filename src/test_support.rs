//! Fakes for the feed source and language-model collaborators.

use crate::api::{AskAsync, ChatRequest};
use crate::error::{FeedError, LlmError};
use crate::feeds::parser::FeedEntry;
use crate::feeds::{FeedDocument, FeedSource};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn entry(title: &str, link: &str, date: &str) -> FeedEntry {
    FeedEntry {
        title: title.to_string(),
        link: link.to_string(),
        iso_date: (!date.is_empty()).then(|| date.to_string()),
        ..FeedEntry::default()
    }
}

enum FakeFeed {
    Exact(String, Option<FeedDocument>),
    Prefix(String, FeedDocument),
}

/// Serves canned documents by exact URL or URL prefix; anything else is a 404.
#[derive(Default)]
pub struct FakeFeeds {
    feeds: Vec<FakeFeed>,
    delay: Option<Duration>,
    pub requested: Mutex<Vec<String>>,
}

impl FakeFeeds {
    pub fn with_feed(mut self, url: &str, title: &str, items: Vec<FeedEntry>) -> Self {
        let doc = FeedDocument {
            title: Some(title.to_string()),
            items,
        };
        self.feeds.push(FakeFeed::Exact(url.to_string(), Some(doc)));
        self
    }

    pub fn with_failure(mut self, url: &str) -> Self {
        self.feeds.push(FakeFeed::Exact(url.to_string(), None));
        self
    }

    pub fn with_prefix(mut self, prefix: &str, title: &str, items: Vec<FeedEntry>) -> Self {
        let doc = FeedDocument {
            title: Some(title.to_string()),
            items,
        };
        self.feeds.push(FakeFeed::Prefix(prefix.to_string(), doc));
        self
    }

    /// Every parse sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl FeedSource for FakeFeeds {
    async fn parse(&self, url: &str) -> Result<FeedDocument, FeedError> {
        self.requested.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        for feed in &self.feeds {
            match feed {
                FakeFeed::Exact(u, Some(doc)) if u == url => return Ok(doc.clone()),
                FakeFeed::Exact(u, None) if u == url => return Err(FeedError::Status(500)),
                FakeFeed::Prefix(p, doc) if url.starts_with(p.as_str()) => return Ok(doc.clone()),
                _ => {}
            }
        }
        Err(FeedError::Status(404))
    }
}

/// Replies from a queue (the last reply repeats) and tracks concurrent calls.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, u16>>>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with an API error carrying `status`.
    pub fn failing(status: u16) -> Self {
        let llm = Self::new(Vec::new());
        llm.replies.lock().unwrap().push_back(Err(status));
        llm
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> Result<String, u16> {
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap_or(Err(500))
        } else {
            replies.front().cloned().unwrap_or(Err(500))
        }
    }
}

impl AskAsync for ScriptedLlm {
    async fn ask(&self, request: &ChatRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.next_reply();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        reply.map_err(|status| LlmError::Api {
            status,
            body: "scripted failure".to_string(),
        })
    }
}
