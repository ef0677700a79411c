#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a duel.
///
/// `Pending -> Active -> {Completed, Cheating}` and `{Pending, Active} -> Cancelled`.
/// Terminal states never transition again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Created, waiting for both players to connect.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PENDING"))]
    Pending,
    /// Both players joined; submissions are accepted.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ACTIVE"))]
    Active,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "COMPLETED"))]
    Completed,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CANCELLED"))]
    Cancelled,
    /// Ended by the anti-cheat evaluator. Nobody is credited a win.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CHEATING"))]
    Cheating,
}

impl MatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Cheating)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: MatchStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::Active, Self::Completed)
                | (Self::Active, Self::Cheating)
                | (Self::Pending, Self::Cancelled)
                | (Self::Active, Self::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Cheating => "CHEATING",
        }
    }
}

impl Default for MatchStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a match reached its terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum MatchEndReason {
    /// A submission passed every test case.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "accepted"))]
    Accepted,
    /// Both players finished judging and one passed strictly more cases.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "more_tests_passed"))]
    MoreTestsPassed,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "draw"))]
    Draw,
    /// The opponent left while the match was active.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "disconnect"))]
    Disconnect,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "anti_cheat"))]
    AntiCheat,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "cancelled"))]
    Cancelled,
    /// Nobody showed up before the pending window ran out.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "expired"))]
    Expired,
}

impl MatchEndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::MoreTestsPassed => "more_tests_passed",
            Self::Draw => "draw",
            Self::Disconnect => "disconnect",
            Self::AntiCheat => "anti_cheat",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for MatchEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
