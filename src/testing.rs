//! Completion-model doubles for unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;

use crate::completion::{CompletionModel, CompletionRequest};

enum Behavior {
    Reply(String),
    Fail(String),
    Panic,
}

/// Answers by system-prompt prefix and records every request.
pub struct ScriptedModel {
    rules: Vec<(String, Behavior)>,
    default_reply: String,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_reply: "ok".to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, system_prefix: &str, text: &str) -> Self {
        self.rules
            .push((system_prefix.to_string(), Behavior::Reply(text.to_string())));
        self
    }

    pub fn fail(mut self, system_prefix: &str, message: &str) -> Self {
        self.rules
            .push((system_prefix.to_string(), Behavior::Fail(message.to_string())));
        self
    }

    pub fn panic_on(mut self, system_prefix: &str) -> Self {
        self.rules.push((system_prefix.to_string(), Behavior::Panic));
        self
    }

    pub fn default_reply(mut self, text: &str) -> Self {
        self.default_reply = text.to_string();
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let rule = self
            .rules
            .iter()
            .find(|(prefix, _)| request.system.starts_with(prefix.as_str()));
        match rule.map(|(_, b)| b) {
            Some(Behavior::Reply(text)) => Ok(text.clone()),
            Some(Behavior::Fail(message)) => Err(anyhow!("{}", message)),
            Some(Behavior::Panic) => panic!("scripted panic"),
            None => Ok(self.default_reply.clone()),
        }
    }
}

/// Fails every call.
pub struct FailingModel {
    message: String,
}

impl FailingModel {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl CompletionModel for FailingModel {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<String> {
        Err(anyhow!("{}", self.message))
    }
}
