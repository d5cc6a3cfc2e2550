use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use renewly_core::errors::GatewayError;

use super::{CompletionRequest, LlmClient, LlmTask};

/// Stand-in for the external model. Replies are queued per task and handed
/// out in order; a task with nothing queued behaves like an outage.
#[derive(Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<HashMap<LlmTask, VecDeque<Result<String, GatewayError>>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, task: LlmTask, body: impl Into<String>) -> Self {
        self.push(task, Ok(body.into()));
        self
    }

    pub fn with_failure(self, task: LlmTask, error: GatewayError) -> Self {
        self.push(task, Err(error));
        self
    }

    pub fn push(&self, task: LlmTask, reply: Result<String, GatewayError>) {
        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        replies.entry(task).or_default().push_back(reply);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn calls_for(&self, task: LlmTask) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|request| request.task == task)
            .count()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request.clone());

        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        replies.get_mut(&request.task).and_then(VecDeque::pop_front).unwrap_or_else(|| {
            Err(GatewayError::Status {
                status: 503,
                body: format!("no scripted reply for `{}`", request.task.as_str()),
            })
        })
    }
}
