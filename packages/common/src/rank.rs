#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display tier derived from a player's rating.
///
/// Variants are ordered from lowest to highest.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
pub enum Rank {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Bronze"))]
    Bronze,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Silver"))]
    Silver,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Gold"))]
    Gold,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Diamond"))]
    Diamond,
}

impl Rank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Diamond => "Diamond",
        }
    }
}

impl Default for Rank {
    fn default() -> Self {
        Self::Bronze
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
