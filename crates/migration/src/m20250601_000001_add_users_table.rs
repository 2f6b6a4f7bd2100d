use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Subscriber accounts with the per-user message quota counters.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::UserToken).unique_key())
                    .col(string_null(Users::Email))
                    .col(boolean(Users::PremiumActive).default(false))
                    .col(timestamp_with_time_zone_null(Users::PremiumExpiresAt))
                    .col(string_null(Users::SubscriptionType))
                    .col(integer(Users::WhatsappQuotaUsed).default(0))
                    .col(
                        ColumnDef::new(Users::WhatsappQuotaLimit)
                            .integer()
                            .not_null()
                            .default(1000)
                            .comment("Monthly message-unit budget"),
                    )
                    .col(timestamp_with_time_zone_null(Users::WhatsappQuotaResetAt))
                    .col(
                        timestamp_with_time_zone(Users::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Users::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Users::LastActiveAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_users_user_token")
                    .table(Users::Table)
                    .col(Users::UserToken)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_users_user_token")
                    .table(Users::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    UserToken,
    Email,
    PremiumActive,
    PremiumExpiresAt,
    SubscriptionType,
    WhatsappQuotaUsed,
    WhatsappQuotaLimit,
    WhatsappQuotaResetAt,
    CreatedAt,
    UpdatedAt,
    LastActiveAt,
}
