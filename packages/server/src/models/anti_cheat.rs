use common::ViolationKind;
use serde::{Deserialize, Serialize};

use crate::anti_cheat::ViolationOutcome;

/// A violation observed by the editor. The reporter is the offending player.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ViolationReportRequest {
    pub match_id: i32,
    pub kind: ViolationKind,
    /// Free-form context from the client.
    pub details: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ViolationReportResponse {
    pub outcome: ViolationOutcome,
}
