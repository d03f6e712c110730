use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use super::item::WorkItem;

/// Entities produced by capturing the parties of one process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyCounts {
    pub total_parties: u64,
    pub clients: u64,
    pub opposing_parties: u64,
    pub third_parties: u64,
    pub representatives: u64,
    pub links: u64,
}

impl AddAssign for PartyCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.total_parties += rhs.total_parties;
        self.clients += rhs.clients;
        self.opposing_parties += rhs.opposing_parties;
        self.third_parties += rhs.third_parties;
        self.representatives += rhs.representatives;
        self.links += rhs.links;
    }
}

/// What a capture worker returns for one item. `errors` are in-band problems
/// (a party that failed to persist, for instance), not worker failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureOutput {
    pub counts: PartyCounts,
    pub errors: Vec<String>,
    pub raw_payload: Option<serde_json::Value>,
}

/// An error attributed to a single work item in the job summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub item_id: i64,
    pub process_number: String,
    pub message: String,
}

impl ItemError {
    pub fn new(item: &WorkItem, message: impl Into<String>) -> Self {
        Self {
            item_id: item.id,
            process_number: item.process_number.clone(),
            message: message.into(),
        }
    }
}

/// Where an audit write ended up for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditWrite {
    Written(String),
    Failed(String),
}

/// Per-item result handed to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub item_id: i64,
    pub counts: PartyCounts,
    pub errors: Vec<ItemError>,
    pub audit: AuditWrite,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}
