//! Wire types of the knowledge-base HTTP API.

use mediaflow_core::StoreReceipt;
use serde::{Deserialize, Serialize};

/// Response body of `POST /store`.
///
/// Deployments disagree on the id field name, so both spellings are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreResponse {
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl StoreResponse {
    /// Convert to a receipt, if the response named the new record.
    pub fn into_receipt(self) -> Option<StoreReceipt> {
        let record_id = self.record_id.or(self.id)?;
        Some(StoreReceipt {
            record_id,
            status: self.status,
        })
    }
}
