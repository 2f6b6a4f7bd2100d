//! Subscriber accounts, including the per-user message quota counters.
//!
//! The quota columns are only ever mutated through the atomic conditional
//! update in [`crate::store::SeaOrmStore`], never read-modify-written by
//! application code.

use sea_orm::entity::prelude::*;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_token: String,
    pub email: Option<String>,
    pub premium_active: bool,
    pub premium_expires_at: Option<OffsetDateTime>,
    pub subscription_type: Option<String>,
    pub whatsapp_quota_used: i32,
    pub whatsapp_quota_limit: i32,
    pub whatsapp_quota_reset_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub last_active_at: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
