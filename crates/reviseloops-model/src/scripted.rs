use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{ChatRequest, Model, ModelError};

type Responder = Box<dyn Fn(&ChatRequest) -> Result<String, ModelError> + Send + Sync>;

/// In-process model that answers from a script instead of a provider.
///
/// Every request it receives is recorded so callers can inspect the
/// rendered prompts afterwards.
pub struct ScriptedModel {
    name: String,
    responder: Responder,
    calls: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    /// Answer every request with the result of `responder`
    pub fn new<F>(name: impl Into<String>, responder: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<String, ModelError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the same text
    pub fn constant(name: impl Into<String>, response: impl Into<String>) -> Self {
        let response = response.into();
        Self::new(name, move |_| Ok(response.clone()))
    }

    /// Answer with `responses` in order; fails once the script runs out
    pub fn sequence(name: impl Into<String>, responses: Vec<Result<String, ModelError>>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(name, move |_| {
            queue
                .lock()
                .map_err(|_| ModelError::Config("script lock poisoned".into()))?
                .pop_front()
                .unwrap_or_else(|| Err(ModelError::Config("script exhausted".into())))
        })
    }

    /// Requests received so far, in arrival order
    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Model for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, ModelError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        (self.responder)(request)
    }
}
