use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "location_moods")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub location_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub mood_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::locations::Entity",
        from = "Column::LocationId",
        to = "super::locations::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Locations,
    #[sea_orm(
        belongs_to = "super::moods::Entity",
        from = "Column::MoodId",
        to = "super::moods::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Moods,
}

impl Related<super::locations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Locations.def()
    }
}

impl Related<super::moods::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Moods.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
