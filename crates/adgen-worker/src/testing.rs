//! In-memory provider for workflow tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use adgen_llm_client::{
    BatchItemResult, BatchProvider, BatchResultLine, ContentBlock, GenerationRequest, LlmError,
    LlmResult, Message, MessageProvider, MessageRequest,
};
use adgen_models::{BatchJob, ProcessingStatus, RequestCounts, TokenUsage};

pub fn batch_job(id: &str, status: ProcessingStatus, succeeded: u32, errored: u32) -> BatchJob {
    let processing = if status.is_terminal() { 0 } else { 1 };
    BatchJob {
        id: id.to_string(),
        processing_status: status,
        request_counts: RequestCounts {
            processing,
            succeeded,
            errored,
            canceled: 0,
            expired: 0,
        },
        created_at: Utc::now(),
        ended_at: status.is_terminal().then(Utc::now),
        expires_at: None,
        results_url: None,
    }
}

pub fn text_message(text: &str) -> Message {
    Message {
        id: "msg_test".to_string(),
        model: "test-model".to_string(),
        content: vec![ContentBlock::Text {
            text: text.to_string(),
        }],
        stop_reason: Some("end_turn".to_string()),
        usage: TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        },
    }
}

pub fn succeeded_line(custom_id: &str, text: &str) -> BatchResultLine {
    BatchResultLine {
        custom_id: custom_id.to_string(),
        result: BatchItemResult::Succeeded {
            message: text_message(text),
        },
    }
}

pub fn errored_line(custom_id: &str, kind: &str, message: &str) -> BatchResultLine {
    BatchResultLine {
        custom_id: custom_id.to_string(),
        result: BatchItemResult::Errored {
            error: json!({"type": "error", "error": {"type": kind, "message": message}}),
        },
    }
}

pub fn expired_line(custom_id: &str) -> BatchResultLine {
    BatchResultLine {
        custom_id: custom_id.to_string(),
        result: BatchItemResult::Expired,
    }
}

/// Scriptable fake for both provider traits.
#[derive(Default)]
pub struct FakeProvider {
    submissions: Mutex<Vec<Vec<GenerationRequest>>>,
    reject_next: Mutex<Option<LlmError>>,
    statuses: Mutex<VecDeque<BatchJob>>,
    results: Mutex<HashMap<String, Vec<BatchResultLine>>>,
    messages: Mutex<VecDeque<Message>>,
    message_requests: Mutex<Vec<MessageRequest>>,
    status_calls: AtomicUsize,
    results_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_next_batch(&self, error: LlmError) {
        *self.reject_next.lock().unwrap() = Some(error);
    }

    /// Queue a status. The last queued status is repeated once the others are consumed.
    pub fn push_status(&self, job: BatchJob) {
        self.statuses.lock().unwrap().push_back(job);
    }

    pub fn set_results(&self, batch_id: &str, lines: Vec<BatchResultLine>) {
        self.results.lock().unwrap().insert(batch_id.to_string(), lines);
    }

    pub fn push_message(&self, message: Message) {
        self.messages.lock().unwrap().push_back(message);
    }

    pub fn submissions(&self) -> Vec<Vec<GenerationRequest>> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn message_requests(&self) -> Vec<MessageRequest> {
        self.message_requests.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn results_calls(&self) -> usize {
        self.results_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchProvider for FakeProvider {
    async fn create_batch(&self, requests: &[GenerationRequest]) -> LlmResult<BatchJob> {
        if let Some(error) = self.reject_next.lock().unwrap().take() {
            return Err(error);
        }

        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(requests.to_vec());
        let id = format!("batch_{}", submissions.len());
        Ok(batch_job(&id, ProcessingStatus::InProgress, 0, 0))
    }

    async fn retrieve_batch(&self, batch_id: &str) -> LlmResult<BatchJob> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let mut statuses = self.statuses.lock().unwrap();
        let job = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };

        match job {
            Some(mut job) => {
                job.id = batch_id.to_string();
                Ok(job)
            }
            None => Err(LlmError::NotFound(format!("batch {}", batch_id))),
        }
    }

    async fn batch_results(&self, batch_id: &str) -> LlmResult<Vec<BatchResultLine>> {
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(batch_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl MessageProvider for FakeProvider {
    async fn create_message(&self, request: &MessageRequest) -> LlmResult<Message> {
        self.message_requests.lock().unwrap().push(request.clone());
        self.messages
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::invalid_response("no scripted message"))
    }
}
