//! Boundary validation: loosely-typed request payloads become a strict
//! [`Query`] before anything else touches them.

use std::collections::BTreeSet;

use catalog::{Level, is_valid_level};
use pipeline::CourseFilter;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Request shape as received from the boundary layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub query: String,
    #[serde(default)]
    pub levels: Option<Vec<i64>>,
}

/// A validated recommendation query.
///
/// The text is trimmed and non-empty; `levels` is empty when the caller
/// accepts any level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    levels: BTreeSet<Level>,
}

impl Query {
    pub fn new(
        text: impl AsRef<str>,
        levels: impl IntoIterator<Item = i64>,
        max_chars: usize,
    ) -> Result<Self> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(EngineError::InvalidQuery("query text is empty".into()));
        }

        let chars = text.chars().count();
        if chars > max_chars {
            return Err(EngineError::InvalidQuery(format!(
                "query is {} characters, limit is {}",
                chars, max_chars
            )));
        }

        let levels = levels
            .into_iter()
            .map(|level| {
                if is_valid_level(level) {
                    Ok(level as Level)
                } else {
                    Err(EngineError::InvalidQuery(format!(
                        "level {} is not a multiple of 100 between 100 and 900",
                        level
                    )))
                }
            })
            .collect::<Result<BTreeSet<Level>>>()?;

        Ok(Self {
            text: text.to_string(),
            levels,
        })
    }

    pub fn from_request(request: &RecommendationRequest, max_chars: usize) -> Result<Self> {
        Self::new(
            &request.query,
            request.levels.iter().flatten().copied(),
            max_chars,
        )
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn levels(&self) -> &BTreeSet<Level> {
        &self.levels
    }

    /// The ranking filter this query implies
    pub fn course_filter(&self) -> CourseFilter {
        CourseFilter::levels(self.levels.iter().copied())
    }
}
