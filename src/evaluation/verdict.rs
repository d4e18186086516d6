//! The judge's verdict and its strict decoder.
//!
//! Judges tend to wrap JSON in markdown fences and older prompts used the
//! labels `Fund`/`Pass`. The decoder strips fences, normalises labels into
//! [`Decision`], and rejects anything else with
//! [`SimError::EvaluationParse`].

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SimError};

/// Highest allowed sentiment score.
pub const MAX_SENTIMENT: u8 = 10;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\s*```\s*$").unwrap()
});

/// Whether the buyer took the offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" | "fund" => Ok(Decision::Accept),
            "reject" | "pass" => Ok(Decision::Reject),
            other => Err(format!("unknown decision label '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Decision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Accept => f.write_str("accept"),
            Decision::Reject => f.write_str("reject"),
        }
    }
}

/// Structured judgment of one transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub decision: Decision,
    /// 0 (very negative) to 10 (very positive).
    pub sentiment_analysis: u8,
    pub reasoning: String,
}

/// Wire shape before range checks.
#[derive(Deserialize)]
struct RawVerdict {
    decision: Decision,
    sentiment_analysis: i64,
    reasoning: String,
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fence(reply: &str) -> &str {
    match CODE_FENCE.captures(reply).and_then(|c| c.get(1)) {
        Some(body) => body.as_str(),
        None => reply.trim(),
    }
}

/// Decode a judge reply into a [`Verdict`].
pub fn parse_verdict(reply: &str) -> Result<Verdict> {
    let body = strip_code_fence(reply);
    let raw: RawVerdict = serde_json::from_str(body)
        .map_err(|e| SimError::evaluation_parse(format!("invalid verdict JSON: {}", e), reply))?;

    if !(0..=MAX_SENTIMENT as i64).contains(&raw.sentiment_analysis) {
        return Err(SimError::evaluation_parse(
            format!(
                "sentiment_analysis {} outside 0..={}",
                raw.sentiment_analysis, MAX_SENTIMENT
            ),
            reply,
        ));
    }

    Ok(Verdict {
        decision: raw.decision,
        sentiment_analysis: raw.sentiment_analysis as u8,
        reasoning: raw.reasoning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let verdict = parse_verdict(
            r#"{"decision": "accept", "sentiment_analysis": 8, "reasoning": "Keen buyer."}"#,
        )
        .unwrap();
        assert_eq!(verdict.decision, Decision::Accept);
        assert_eq!(verdict.sentiment_analysis, 8);
        assert_eq!(verdict.reasoning, "Keen buyer.");
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "```json\n{\"decision\": \"reject\", \"sentiment_analysis\": 2, \"reasoning\": \"Too pricey.\"}\n```\n";
        let verdict = parse_verdict(reply).unwrap();
        assert_eq!(verdict.decision, Decision::Reject);
        assert_eq!(verdict.sentiment_analysis, 2);
    }

    #[test]
    fn test_parse_bare_fence() {
        let reply = "```\n{\"decision\": \"accept\", \"sentiment_analysis\": 10, \"reasoning\": \"\"}\n```";
        assert_eq!(parse_verdict(reply).unwrap().sentiment_analysis, 10);
    }

    #[test]
    fn test_legacy_labels_normalised() {
        let fund = parse_verdict(r#"{"decision": "Fund", "sentiment_analysis": 6, "reasoning": "ok"}"#).unwrap();
        assert_eq!(fund.decision, Decision::Accept);
        let pass = parse_verdict(r#"{"decision": "PASS", "sentiment_analysis": 1, "reasoning": "no"}"#).unwrap();
        assert_eq!(pass.decision, Decision::Reject);
    }

    #[test]
    fn test_unknown_label_rejected() {
        let err = parse_verdict(r#"{"decision": "maybe", "sentiment_analysis": 5, "reasoning": "?"}"#)
            .unwrap_err();
        assert!(matches!(err, SimError::EvaluationParse { .. }));
    }

    #[test]
    fn test_out_of_range_sentiment_rejected() {
        for score in ["-3", "11"] {
            let reply = format!(
                r#"{{"decision": "reject", "sentiment_analysis": {}, "reasoning": "x"}}"#,
                score
            );
            let err = parse_verdict(&reply).unwrap_err();
            match err {
                SimError::EvaluationParse { raw_reply, .. } => assert_eq!(raw_reply, reply),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_missing_field_rejected() {
        assert!(parse_verdict(r#"{"decision": "accept", "sentiment_analysis": 7}"#).is_err());
    }

    #[test]
    fn test_non_json_rejected() {
        let err = parse_verdict("The customer seemed happy.").unwrap_err();
        assert!(matches!(err, SimError::EvaluationParse { .. }));
    }

    #[test]
    fn test_fractional_sentiment_rejected() {
        assert!(parse_verdict(r#"{"decision": "accept", "sentiment_analysis": 7.5, "reasoning": "x"}"#).is_err());
    }

    #[test]
    fn test_strip_code_fence_passthrough() {
        assert_eq!(strip_code_fence("  {\"a\": 1} \n"), "{\"a\": 1}");
    }
}
