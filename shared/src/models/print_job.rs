//! Print Job Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a print job carries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrintJobKind {
    /// Customer receipt
    Receipt,
    /// Kitchen order ticket
    Kot,
    /// Test page printed after connecting
    Test,
}

impl PrintJobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrintJobKind::Receipt => "receipt",
            PrintJobKind::Kot => "kot",
            PrintJobKind::Test => "test",
        }
    }
}

impl fmt::Display for PrintJobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded ESC/POS payload tagged with its kind
///
/// Built by a renderer and moved into the transmission pipeline, which
/// consumes it exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct PrintJob {
    kind: PrintJobKind,
    payload: Vec<u8>,
}

impl PrintJob {
    pub fn new(kind: PrintJobKind, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    pub fn kind(&self) -> PrintJobKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Take the bytes out of the job
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_accessors() {
        let job = PrintJob::new(PrintJobKind::Kot, vec![0x1B, 0x40]);
        assert_eq!(job.kind(), PrintJobKind::Kot);
        assert_eq!(job.len(), 2);
        assert!(!job.is_empty());
        assert_eq!(job.into_payload(), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(PrintJobKind::Receipt.to_string(), "receipt");
        assert_eq!(
            serde_json::to_string(&PrintJobKind::Kot).unwrap(),
            "\"KOT\""
        );
    }
}
