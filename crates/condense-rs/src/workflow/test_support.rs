//! Scripted completion backends shared by the stage and runner tests.

use crate::{Completion, CompletionFuture, CompletionRequest, SummarizeError};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

type Reply = Box<dyn Fn(&str) -> String + Send + Sync>;

/// A completion backend that counts calls, records prompts, and answers
/// with a scripted reply.
pub(crate) struct CountingCompletion {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    reply: Reply,
}

impl CountingCompletion {
    fn with_reply(reply: Reply) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            reply,
        }
    }

    /// Replies with `"echo: <prompt>"` — handy for asserting that inputs
    /// reached the backend.
    pub(crate) fn echo() -> Self {
        Self::with_reply(Box::new(|prompt| format!("echo: {prompt}")))
    }

    /// Same as [`echo`](Self::echo); named for tests that only inspect the
    /// recorded prompts.
    pub(crate) fn recording() -> Self {
        Self::echo()
    }

    /// Replies with a fixed text regardless of the prompt.
    pub(crate) fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::with_reply(Box::new(move |_| text.clone()))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Completion for CountingCompletion {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let reply = (self.reply)(&request.prompt);
        Box::pin(async move { Ok(reply) })
    }
}

/// A completion backend whose n-th call (1-based) fails; all others
/// succeed with `"ok"`.
pub(crate) struct FailingCompletion {
    calls: AtomicUsize,
    fail_on: usize,
}

impl FailingCompletion {
    pub(crate) fn failing_on(fail_on: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on,
        }
    }
}

impl Completion for FailingCompletion {
    fn complete(&self, _request: CompletionRequest) -> CompletionFuture<'_> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail = n == self.fail_on;
        Box::pin(async move {
            if fail {
                Err(SummarizeError::Completion("scripted failure".into()))
            } else {
                Ok("ok".to_string())
            }
        })
    }
}
