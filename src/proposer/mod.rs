//! Port to the external schedule proposer.
//!
//! The proposer is an oracle: prompt text in, a candidate weekly grid per
//! group out. Its reasoning is opaque; this module owns the wire contract
//! around it and rejects anything that does not match the expected shape.

mod client;
mod error;

pub use client::GeminiProposer;
pub use error::ProposerError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One candidate schedule as returned by the proposer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedSchedule {
    pub section: String,
    pub level: i64,
    pub grid: Value,
}

/// The proposer port. Injected into [`ServerState`] so tests can substitute
/// a deterministic stub for the real model.
///
/// [`ServerState`]: crate::types::ServerState
#[async_trait]
pub trait ScheduleProposer: Send + Sync {
    /// Consumes one prompt and returns the proposed schedules for that group.
    ///
    /// Any output that is not parseable as the expected list shape is a hard
    /// failure; no coercion of partial or malformed entries.
    async fn propose(&self, prompt: &str) -> Result<Vec<ProposedSchedule>, ProposerError>;
}

/// Parses the raw model text into the expected list of schedule objects.
///
/// Models occasionally wrap their JSON in Markdown code fences despite being
/// told not to; the fences are stripped, but nothing else is repaired.
pub fn parse_proposal_payload(text: &str) -> Result<Vec<ProposedSchedule>, ProposerError> {
    let body = strip_code_fences(text);

    let proposals: Vec<ProposedSchedule> =
        serde_json::from_str(body).map_err(|e| ProposerError::MalformedPayload {
            message: e.to_string(),
        })?;

    for (idx, proposal) in proposals.iter().enumerate() {
        if proposal.grid.is_null() {
            return Err(ProposerError::MalformedPayload {
                message: format!("entry {idx} has a null grid"),
            });
        }
    }

    Ok(proposals)
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"[
        {
            "section": "Group 1",
            "level": 3,
            "grid": {
                "Sunday": {"8:00-8:50": "SWE 211"},
                "Monday": {},
                "Tuesday": {},
                "Wednesday": {},
                "Thursday": {}
            }
        }
    ]"#;

    #[test]
    fn parses_valid_list() {
        let proposals = parse_proposal_payload(VALID).unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].section, "Group 1");
        assert_eq!(proposals[0].level, 3);
        assert!(proposals[0].grid.is_object());
    }

    #[test]
    fn parses_fenced_payload() {
        let fenced = format!("```json\n{VALID}\n```");
        let proposals = parse_proposal_payload(&fenced).unwrap();
        assert_eq!(proposals.len(), 1);
    }

    #[test]
    fn rejects_non_list_shape() {
        let err = parse_proposal_payload(r#"{"section": "Group 1"}"#).unwrap_err();
        assert!(matches!(err, ProposerError::MalformedPayload { .. }));
    }

    #[test]
    fn rejects_missing_grid() {
        let err =
            parse_proposal_payload(r#"[{"section": "Group 1", "level": 3}]"#).unwrap_err();
        assert!(matches!(err, ProposerError::MalformedPayload { .. }));
    }

    #[test]
    fn rejects_null_grid() {
        let err = parse_proposal_payload(r#"[{"section": "Group 1", "level": 3, "grid": null}]"#)
            .unwrap_err();
        assert!(matches!(err, ProposerError::MalformedPayload { .. }));
    }

    #[test]
    fn rejects_prose() {
        let err = parse_proposal_payload("Here is your schedule!").unwrap_err();
        assert!(matches!(err, ProposerError::MalformedPayload { .. }));
    }
}
