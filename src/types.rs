//! Core identifier types for the lockstep workflow engine.
//!
//! [`NodeKind`] names the vertices of a workflow graph. The `Start` and `End`
//! variants are reserved sentinels: they mark the graph's entry and terminal
//! points, may appear as edge endpoints, and are never registered as
//! executable nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `Start` and `End` are virtual endpoints used only for topology; the
/// builder rejects attempts to register them as executable nodes. All real
/// nodes use the `Custom` variant with a caller-chosen unique name.
///
/// # Examples
///
/// ```rust
/// use lockstep::types::NodeKind;
///
/// let start = NodeKind::Start;
/// let extract = NodeKind::Custom("extract".to_string());
/// let end = NodeKind::End;
///
/// // String literals convert directly; the sentinel names are recognized.
/// assert_eq!(NodeKind::from("extract"), extract);
/// assert_eq!(NodeKind::from("End"), end);
/// assert!(start.is_start());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// Entry sentinel. Its outgoing edges form the first frontier.
    Start,

    /// Terminal sentinel. A frontier consisting only of `End` ends the run.
    End,

    /// Executable node identified by a user-defined string.
    Custom(String),
}

impl NodeKind {
    /// Returns `true` if this is the [`Start`](Self::Start) sentinel.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` if this is the [`End`](Self::End) sentinel.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns `true` for either sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Start | Self::End)
    }

    /// Returns `true` if this is an executable (non-sentinel) node.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

// Developer experience: allow string literals where a NodeKind is expected.
impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeKind::Start,
            "End" => NodeKind::End,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(s: String) -> Self {
        NodeKind::from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_names_convert_to_sentinels() {
        assert_eq!(NodeKind::from("Start"), NodeKind::Start);
        assert_eq!(NodeKind::from("End"), NodeKind::End);
        assert_eq!(
            NodeKind::from("worker"),
            NodeKind::Custom("worker".to_string())
        );
    }

    #[test]
    fn display_uses_bare_names() {
        assert_eq!(NodeKind::Start.to_string(), "Start");
        assert_eq!(NodeKind::Custom("ask".into()).to_string(), "ask");
    }

    #[test]
    fn custom_equality_is_by_name() {
        let a = NodeKind::Custom("a".into());
        assert_eq!(a, NodeKind::Custom("a".into()));
        assert_ne!(a, NodeKind::Custom("b".into()));
        assert!(!a.is_sentinel());
    }
}
