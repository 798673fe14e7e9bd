use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    /// `jti` claim of the refresh token this session was issued with.
    #[sea_orm(unique)]
    pub refresh_token_jti: String,

    pub device_name: String,

    pub user_agent: String,

    pub ip_address: Option<String>,

    pub created_at: DateTimeUtc,

    pub last_seen_at: DateTimeUtc,

    /// Expiry of the refresh token bound to this session.
    pub expires_at: DateTimeUtc,

    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
