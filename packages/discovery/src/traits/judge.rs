//! Judge trait for consensus validation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::JudgeResult;
use crate::types::request::Criteria;

/// Everything a judge sees about one candidate.
#[derive(Debug, Clone, Copy)]
pub struct JudgeRequest<'a> {
    pub name: &'a str,
    pub website: &'a str,
    pub claimed_location: &'a str,

    /// Sanitized website text; `None` means judge by name only.
    pub evidence: Option<&'a str>,

    pub criteria: &'a Criteria,
}

/// A judge's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub valid: bool,

    #[serde(default)]
    pub rationale: String,

    #[serde(default)]
    pub corrected_location: Option<String>,
}

impl JudgeVerdict {
    pub fn accept(rationale: impl Into<String>) -> Self {
        Self {
            valid: true,
            rationale: rationale.into(),
            corrected_location: None,
        }
    }

    pub fn reject(rationale: impl Into<String>) -> Self {
        Self {
            valid: false,
            rationale: rationale.into(),
            corrected_location: None,
        }
    }

    pub fn with_corrected_location(mut self, location: impl Into<String>) -> Self {
        self.corrected_location = Some(location.into());
        self
    }
}

/// One independent evaluator.
///
/// All judges apply the same rule set; they differ only in the backend that
/// answers.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Stable identifier recorded on each verdict.
    fn id(&self) -> &str;

    async fn judge(&self, request: &JudgeRequest<'_>) -> JudgeResult<JudgeVerdict>;
}

#[async_trait]
impl<J: Judge + ?Sized> Judge for Arc<J> {
    fn id(&self) -> &str {
        (**self).id()
    }

    async fn judge(&self, request: &JudgeRequest<'_>) -> JudgeResult<JudgeVerdict> {
        (**self).judge(request).await
    }
}
