//! Validation and sanitizing of an incoming capture request.

use serde::{Deserialize, Serialize};

use crate::domain::{Grau, TribunalCode};
use crate::error::CapturaError;

/// Raw invocation payload as received from the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    #[serde(default)]
    pub requester_id: Option<i64>,
    #[serde(default)]
    pub credential_ids: Vec<i64>,
    #[serde(default)]
    pub item_ids: Vec<i64>,
    #[serde(default)]
    pub tribunals: Vec<String>,
    #[serde(default)]
    pub graus: Vec<String>,
    #[serde(default)]
    pub process_number: Option<String>,
    #[serde(default)]
    pub process_numbers: Vec<String>,
}

/// Which work items a request selects. Every non-empty dimension must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    pub item_ids: Vec<i64>,
    pub process_numbers: Vec<String>,
    pub tribunals: Vec<TribunalCode>,
    pub graus: Vec<Grau>,
}

impl ItemFilter {
    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
            && self.process_numbers.is_empty()
            && self.tribunals.is_empty()
            && self.graus.is_empty()
    }

    pub fn matches(&self, item: &crate::domain::WorkItem) -> bool {
        (self.item_ids.is_empty() || self.item_ids.contains(&item.id))
            && (self.process_numbers.is_empty()
                || self.process_numbers.contains(&item.process_number))
            && (self.tribunals.is_empty() || self.tribunals.contains(&item.tribunal))
            && (self.graus.is_empty() || self.graus.contains(&item.grau))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub requester_id: i64,
    pub credential_ids: Vec<i64>,
    pub filter: ItemFilter,
}

impl CaptureRequest {
    pub fn validate(&self) -> Result<ValidatedRequest, CapturaError> {
        let requester_id = match self.requester_id {
            Some(id) if id != 0 && !self.credential_ids.is_empty() => id,
            _ => {
                return Err(CapturaError::Validation(
                    "missing required parameters: requester_id, credential_ids (non-empty array)"
                        .into(),
                ));
            }
        };

        let mut process_numbers = sanitize_process_numbers(&self.process_numbers);
        if let Some(single) = self
            .process_number
            .as_deref()
            .and_then(sanitize_process_number)
            .filter(|n| !process_numbers.contains(n))
        {
            process_numbers.push(single);
        }

        let filter = ItemFilter {
            item_ids: dedup(self.item_ids.iter().copied()),
            process_numbers,
            tribunals: dedup(self.tribunals.iter().filter_map(|t| t.parse().ok())),
            graus: dedup(self.graus.iter().filter_map(|g| g.parse().ok())),
        };

        if filter.is_empty() {
            return Err(CapturaError::Validation(
                "at least one filter is required: item_ids, process_number, process_numbers, tribunals or graus"
                    .into(),
            ));
        }

        Ok(ValidatedRequest {
            requester_id,
            credential_ids: dedup(self.credential_ids.iter().copied()),
            filter,
        })
    }
}

/// Strips every whitespace character; `None` when nothing is left.
pub fn sanitize_process_number(value: &str) -> Option<String> {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn sanitize_process_numbers(values: &[String]) -> Vec<String> {
    dedup(values.iter().filter_map(|v| sanitize_process_number(v)))
}

// Keeps first occurrence order.
fn dedup<T: PartialEq>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}
