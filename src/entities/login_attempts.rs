use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "login_attempts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Lowercased login identifier.
    #[sea_orm(unique)]
    pub identifier: String,

    pub attempts: i32,

    pub locked_until: Option<DateTimeUtc>,

    pub last_attempt: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
