//! Immutable audit log of dispatch attempts.
//!
//! One row per dispatch attempt, written after the attempt completes. The
//! `status` column is the binary sent/failed projection; the `outcomes`
//! column retains the full per-recipient detail so partial failures are not
//! lost. `delivered_at` is reserved for a later delivery-confirmation hook
//! and is never written by the engine.

use sea_orm::entity::prelude::*;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "message_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub message_type: String, // "emergency_alert" or "test_message"
    pub recipients: Json,
    pub message_content: String,
    pub location_data: Option<Json>,
    pub provider_message_ids: Option<String>,
    pub status: String, // "sent" or "failed"
    pub error_message: Option<String>,
    pub outcomes: Json,
    pub sent_at: OffsetDateTime,
    pub delivered_at: Option<OffsetDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
