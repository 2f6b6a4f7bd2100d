pub use sea_orm_migration::prelude::*;

mod m20250601_000001_add_users_table;
mod m20250601_000002_add_message_logs_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_add_users_table::Migration),
            Box::new(m20250601_000002_add_message_logs_table::Migration),
        ]
    }
}
