//! Provider-backed judge.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::{JudgeError, JudgeResult};
use crate::pipeline::json::parse_json_response;
use crate::pipeline::prompts::{format_judge_prompt, JUDGE_SYSTEM};
use crate::traits::judge::{Judge, JudgeRequest, JudgeVerdict};
use crate::traits::provider::{Provider, SubmitOptions};

/// A judge that asks a provider to apply the shared rule set.
///
/// Several `LlmJudge`s over different providers (or models) make up the
/// consensus panel.
pub struct LlmJudge {
    id: String,
    provider: Arc<dyn Provider>,
}

impl LlmJudge {
    pub fn new(id: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        Self {
            id: id.into(),
            provider,
        }
    }
}

#[async_trait]
impl Judge for LlmJudge {
    fn id(&self) -> &str {
        &self.id
    }

    async fn judge(&self, request: &JudgeRequest<'_>) -> JudgeResult<JudgeVerdict> {
        let prompt = format_judge_prompt(request);
        let options = SubmitOptions::json().with_system(JUDGE_SYSTEM);

        let response = self
            .provider
            .submit(&prompt, &options)
            .await
            .map_err(|source| JudgeError::Provider {
                judge: self.id.clone(),
                source,
            })?;

        let mut verdict: JudgeVerdict =
            parse_json_response(&response).map_err(|e| JudgeError::Parse {
                judge: self.id.clone(),
                message: e.to_string(),
            })?;

        // Models answer `"corrected_location": ""` as often as null.
        if verdict
            .corrected_location
            .as_deref()
            .is_some_and(|l| l.trim().is_empty())
        {
            verdict.corrected_location = None;
        }

        debug!(judge = %self.id, candidate = request.name, valid = verdict.valid, "Judge verdict");
        Ok(verdict)
    }
}
