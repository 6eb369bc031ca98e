//! Deterministic completion clients shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::client::{CompletionClient, DynCompletionClient};
use crate::error::UpstreamError;
use crate::prompt::Prompt;

/// Replies with a fixed script and records every prompt it receives.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, UpstreamError>>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedClient {
    pub fn new<I>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Result<String, UpstreamError>>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|text| Ok(text.to_string())))
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Parsed user turn of the `index`-th prompt.
    pub fn user_input(&self, index: usize) -> serde_json::Value {
        let prompts = self.prompts();
        let user = prompts[index].user().expect("prompt has a user turn");
        serde_json::from_str(user).expect("user turn is JSON")
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, UpstreamError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(UpstreamError::Empty))
    }
}

/// Never answers; used to exercise cancellation of in-flight calls.
pub struct StalledClient;

#[async_trait]
impl CompletionClient for StalledClient {
    async fn complete(&self, _prompt: &Prompt) -> Result<String, UpstreamError> {
        std::future::pending::<()>().await;
        unreachable!("pending never resolves")
    }
}

pub fn shared(client: Arc<ScriptedClient>) -> Arc<DynCompletionClient> {
    client
}
