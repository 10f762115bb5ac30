// src/models/location.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Níveis dos seletores em cascata.
///
/// Duas hierarquias independentes:
/// - geográfica: `country -> state -> city`
/// - comercial: `branch -> route -> area -> village`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LocationLevel {
    Country,
    State,
    City,
    Branch,
    Route,
    Area,
    Village,
}

impl LocationLevel {
    pub fn table(self) -> &'static str {
        match self {
            LocationLevel::Country => "countries",
            LocationLevel::State => "states",
            LocationLevel::City => "cities",
            LocationLevel::Branch => "branches",
            LocationLevel::Route => "routes",
            LocationLevel::Area => "areas",
            LocationLevel::Village => "villages",
        }
    }

    /// Coluna que aponta para o nível de cima. `None` nas raízes.
    pub fn parent_column(self) -> Option<&'static str> {
        match self {
            LocationLevel::Country | LocationLevel::Branch => None,
            LocationLevel::State => Some("country_id"),
            LocationLevel::City => Some("state_id"),
            LocationLevel::Route => Some("branch_id"),
            LocationLevel::Area => Some("route_id"),
            LocationLevel::Village => Some("area_id"),
        }
    }

    pub fn parent(self) -> Option<LocationLevel> {
        match self {
            LocationLevel::Country | LocationLevel::Branch => None,
            LocationLevel::State => Some(LocationLevel::Country),
            LocationLevel::City => Some(LocationLevel::State),
            LocationLevel::Route => Some(LocationLevel::Branch),
            LocationLevel::Area => Some(LocationLevel::Route),
            LocationLevel::Village => Some(LocationLevel::Area),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LocationLevel::Country => "country",
            LocationLevel::State => "state",
            LocationLevel::City => "city",
            LocationLevel::Branch => "branch",
            LocationLevel::Route => "route",
            LocationLevel::Area => "area",
            LocationLevel::Village => "village",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationNode {
    #[schema(example = 3)]
    pub id: i64,
    #[schema(example = "Karnataka")]
    pub name: String,
    pub parent_id: Option<i64>,
}
