use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "moods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(unique)]
    pub slug: String,

    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::location_moods::Entity")]
    LocationMoods,
}

impl Related<super::location_moods::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LocationMoods.def()
    }
}

impl Related<super::locations::Entity> for Entity {
    fn to() -> RelationDef {
        super::location_moods::Relation::Locations.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::location_moods::Relation::Moods.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
