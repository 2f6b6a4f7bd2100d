use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Immutable audit log: one row per dispatch attempt.
///
/// The `status` column is the binary sent/failed projection; `outcomes`
/// keeps the full per-recipient part list so partial failures stay visible.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MessageLogs::Table)
                    .if_not_exists()
                    .col(pk_auto(MessageLogs::Id))
                    .col(integer(MessageLogs::UserId))
                    .col(
                        ColumnDef::new(MessageLogs::MessageType)
                            .string()
                            .not_null()
                            .comment("'emergency_alert' or 'test_message'"),
                    )
                    .col(json(MessageLogs::Recipients))
                    .col(text(MessageLogs::MessageContent))
                    .col(json_null(MessageLogs::LocationData))
                    .col(string_null(MessageLogs::ProviderMessageIds))
                    .col(
                        ColumnDef::new(MessageLogs::Status)
                            .string()
                            .not_null()
                            .comment("'sent' or 'failed'"),
                    )
                    .col(text_null(MessageLogs::ErrorMessage))
                    .col(json(MessageLogs::Outcomes))
                    .col(
                        timestamp_with_time_zone(MessageLogs::SentAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(MessageLogs::DeliveredAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_logs_user_id")
                            .from(MessageLogs::Table, MessageLogs::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_message_logs_user_id")
                    .table(MessageLogs::Table)
                    .col(MessageLogs::UserId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_message_logs_sent_at")
                    .table(MessageLogs::Table)
                    .col(MessageLogs::SentAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MessageLogs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum MessageLogs {
    Table,
    Id,
    UserId,
    MessageType,
    Recipients,
    MessageContent,
    LocationData,
    ProviderMessageIds,
    Status,
    ErrorMessage,
    Outcomes,
    SentAt,
    DeliveredAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
