use sea_orm_migration::prelude::*;

mod m20260301_accounts;
mod m20260302_locations;
mod m20260303_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_accounts::Migration),
            Box::new(m20260302_locations::Migration),
            Box::new(m20260303_add_indexes::Migration),
        ]
    }
}
