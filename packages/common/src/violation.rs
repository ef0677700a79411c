#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Suspicious client-side behaviour reported by the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PASTE_ACTION"))]
    PasteAction,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TAB_SWITCH"))]
    TabSwitch,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "SUSPICIOUS_TYPING_SPEED"))]
    SuspiciousTypingSpeed,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 3] = [
        Self::PasteAction,
        Self::TabSwitch,
        Self::SuspiciousTypingSpeed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PasteAction => "PASTE_ACTION",
            Self::TabSwitch => "TAB_SWITCH",
            Self::SuspiciousTypingSpeed => "SUSPICIOUS_TYPING_SPEED",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
