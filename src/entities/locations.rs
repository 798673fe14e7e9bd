use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum LocationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum LocationCategory {
    #[sea_orm(string_value = "restaurant")]
    Restaurant,
    #[sea_orm(string_value = "bar")]
    Bar,
    #[sea_orm(string_value = "attraction")]
    Attraction,
    #[sea_orm(string_value = "other")]
    Other,
}

impl LocationCategory {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "restaurant" => Some(Self::Restaurant),
            "bar" => Some(Self::Bar),
            "attraction" => Some(Self::Attraction),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub description: String,

    pub category: LocationCategory,

    pub status: LocationStatus,

    pub city: String,

    pub address: String,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    /// Code printed on the venue's QR sticker.
    #[sea_orm(unique)]
    pub qr_code: String,

    pub image_url: String,

    /// Editorial score shown in listings, 0..=100.
    pub vibe_match_score: i32,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::location_moods::Entity")]
    LocationMoods,
    #[sea_orm(has_many = "super::visits::Entity")]
    Visits,
    #[sea_orm(has_many = "super::collectibles::Entity")]
    Collectibles,
    #[sea_orm(has_many = "super::favorites::Entity")]
    Favorites,
    #[sea_orm(has_many = "super::promotions::Entity")]
    Promotions,
}

impl Related<super::location_moods::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LocationMoods.def()
    }
}

impl Related<super::moods::Entity> for Entity {
    fn to() -> RelationDef {
        super::location_moods::Relation::Moods.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::location_moods::Relation::Locations.def().rev())
    }
}

impl Related<super::visits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visits.def()
    }
}

impl Related<super::collectibles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Collectibles.def()
    }
}

impl Related<super::favorites::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Favorites.def()
    }
}

impl Related<super::promotions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promotions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
