//! Wire shapes shared by the live channel and the history endpoint.
//!
//! The live channel pushes JSON records keyed by `type`; the history
//! endpoint answers paginated range queries. Both are produced by the
//! viewer server and consumed here; nothing in this module touches the
//! network.

use serde::Deserialize;

/// System-message payload that separates the connect replay from live
/// tailing. Rendered as a divider, not a log line.
pub const LIVE_START: &str = "__LIVE_START__";

/// A message pushed over the live channel.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveMessage {
    /// Sent once, immediately after connect.
    Metadata {
        size: u64,
        size_human: String,
        lines: u64,
    },
    /// Out-of-band server notice.
    Sys { msg: String },
    /// One new line.
    Log { data: String },
    /// Ordered group of new lines.
    LogBatch { data: Vec<String> },
}

impl LiveMessage {
    /// Parse a text frame. Malformed frames are the caller's problem to
    /// log and drop; they never tear the connection down.
    pub fn parse(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

/// Paging direction for a history query.
///
/// `Down` is the exact counterpart of `Up`: an exclusive `after_line`
/// lower bound returning the next `count` lines below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Top,
    Up,
    Down,
}

impl Direction {
    pub fn as_param(self) -> &'static str {
        match self {
            Direction::Top => "top",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// A paginated history query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRequest {
    pub direction: Direction,
    /// Exclusive upper bound when paging up.
    pub before_line: Option<u64>,
    /// Exclusive lower bound when paging down.
    pub after_line: Option<u64>,
    pub count: u64,
}

impl HistoryRequest {
    pub fn top(count: u64) -> Self {
        Self {
            direction: Direction::Top,
            before_line: None,
            after_line: None,
            count,
        }
    }

    pub fn up(before_line: u64, count: u64) -> Self {
        Self {
            direction: Direction::Up,
            before_line: Some(before_line),
            after_line: None,
            count,
        }
    }

    pub fn down(after_line: u64, count: u64) -> Self {
        Self {
            direction: Direction::Down,
            before_line: None,
            after_line: Some(after_line),
            count,
        }
    }

    /// Query-string parameters for the HTTP fetcher.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("direction", self.direction.as_param().to_string()),
            ("count", self.count.to_string()),
        ];
        if let Some(n) = self.before_line {
            params.push(("before_line", n.to_string()));
        }
        if let Some(n) = self.after_line {
            params.push(("after_line", n.to_string()));
        }
        params
    }
}

/// The history endpoint's answer to one query.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HistoryResponse {
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default)]
    pub start_line: u64,
    #[serde(default)]
    pub end_line: u64,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl HistoryResponse {
    /// Empty result with nothing further in that direction: the edge of
    /// the file, not an error.
    pub fn is_boundary(&self) -> bool {
        self.lines.is_empty() && !self.has_more
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata() {
        let msg = LiveMessage::parse(
            r#"{"type":"metadata","size":52428800,"size_human":"50.0 MB","lines":10000}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            LiveMessage::Metadata {
                size: 52_428_800,
                size_human: "50.0 MB".to_string(),
                lines: 10_000,
            }
        );
    }

    #[test]
    fn test_parse_line_carriers() {
        let single = LiveMessage::parse(r#"{"type":"log","data":"WARN disk low"}"#).unwrap();
        assert_eq!(
            single,
            LiveMessage::Log {
                data: "WARN disk low".to_string()
            }
        );

        let batch = LiveMessage::parse(r#"{"type":"log_batch","data":["a","b"]}"#).unwrap();
        assert_eq!(
            batch,
            LiveMessage::LogBatch {
                data: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(LiveMessage::parse("not json").is_err());
        assert!(LiveMessage::parse(r#"{"type":"wibble"}"#).is_err());
        assert!(LiveMessage::parse(r#"{"type":"log"}"#).is_err());
    }

    #[test]
    fn test_request_query_params() {
        let req = HistoryRequest::up(501, 500);
        assert_eq!(
            req.query_params(),
            vec![
                ("direction", "up".to_string()),
                ("count", "500".to_string()),
                ("before_line", "501".to_string()),
            ]
        );

        let req = HistoryRequest::down(1000, 500);
        assert_eq!(
            req.query_params(),
            vec![
                ("direction", "down".to_string()),
                ("count", "500".to_string()),
                ("after_line", "1000".to_string()),
            ]
        );
    }

    #[test]
    fn test_boundary_detection() {
        let resp: HistoryResponse =
            serde_json::from_str(r#"{"lines":[],"start_line":0,"end_line":0,"has_more":false}"#)
                .unwrap();
        assert!(resp.is_boundary());

        let resp: HistoryResponse =
            serde_json::from_str(r#"{"lines":["x"],"start_line":1,"end_line":1,"has_more":false}"#)
                .unwrap();
        assert!(!resp.is_boundary());
    }
}
