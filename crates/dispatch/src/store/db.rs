//! SeaORM-backed implementation of [`AlertStore`].

use crate::entity::{message_log, user};
use crate::error::StoreError;
use crate::store::{
    AlertStore, AuditReceipt, NewAuditRecord, QuotaReservation, QuotaState, UserProfile,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, DatabaseConnection, EntityTrait, Statement,
};
use std::sync::Arc;

pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn backend(&self) -> sea_orm::DatabaseBackend {
        self.db.get_database_backend()
    }
}

fn quota_state(model: &user::Model) -> QuotaState {
    QuotaState {
        used: model.whatsapp_quota_used,
        limit: model.whatsapp_quota_limit,
        reset_at: model.whatsapp_quota_reset_at,
    }
}

impl AlertStore for SeaOrmStore {
    #[tracing::instrument(skip(self))]
    async fn get_user(&self, user_id: i32) -> Result<Option<UserProfile>, StoreError> {
        let model = user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(|m| UserProfile {
            id: m.id,
            premium_active: m.premium_active,
            quota: quota_state(&m),
        }))
    }

    /// Single conditional UPDATE: the check and the increment are one
    /// storage-level read-modify-write, so two concurrent reservations can
    /// never both pass on the same remaining budget.
    #[tracing::instrument(skip(self))]
    async fn reserve_quota(
        &self,
        user_id: i32,
        units: i32,
    ) -> Result<QuotaReservation, StoreError> {
        let stmt = Statement::from_sql_and_values(
            self.backend(),
            r#"UPDATE users
               SET whatsapp_quota_used = whatsapp_quota_used + $2,
                   updated_at = CURRENT_TIMESTAMP
               WHERE id = $1 AND whatsapp_quota_used + $2 <= whatsapp_quota_limit
               RETURNING whatsapp_quota_used, whatsapp_quota_limit, whatsapp_quota_reset_at"#,
            vec![user_id.into(), units.into()],
        );

        if let Some(row) = self.db.query_one(stmt).await? {
            let state = QuotaState {
                used: row.try_get("", "whatsapp_quota_used")?,
                limit: row.try_get("", "whatsapp_quota_limit")?,
                reset_at: row.try_get("", "whatsapp_quota_reset_at")?,
            };
            return Ok(QuotaReservation {
                allowed: true,
                state,
            });
        }

        // Denied (or the user vanished): report the current state untouched.
        let model = user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(StoreError::UserNotFound(user_id))?;
        Ok(QuotaReservation {
            allowed: false,
            state: quota_state(&model),
        })
    }

    #[tracing::instrument(skip(self, record))]
    async fn append_audit_record(
        &self,
        record: NewAuditRecord,
    ) -> Result<AuditReceipt, StoreError> {
        let entry = message_log::ActiveModel {
            id: ActiveValue::NotSet,
            user_id: ActiveValue::Set(record.user_id),
            message_type: ActiveValue::Set(record.kind.as_str().to_string()),
            recipients: ActiveValue::Set(record.recipients),
            message_content: ActiveValue::Set(record.content),
            location_data: ActiveValue::Set(record.location),
            provider_message_ids: ActiveValue::Set(record.provider_message_ids),
            status: ActiveValue::Set(record.status.as_str().to_string()),
            error_message: ActiveValue::Set(record.error_detail),
            outcomes: ActiveValue::Set(record.outcomes),
            sent_at: ActiveValue::Set(record.sent_at),
            delivered_at: ActiveValue::NotSet,
        };
        let inserted = entry.insert(self.db.as_ref()).await?;
        Ok(AuditReceipt {
            id: inserted.id,
            created_at: inserted.sent_at,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn touch_user_activity(&self, user_id: i32) -> Result<(), StoreError> {
        let stmt = Statement::from_sql_and_values(
            self.backend(),
            "UPDATE users SET last_active_at = CURRENT_TIMESTAMP WHERE id = $1",
            vec![user_id.into()],
        );
        self.db.execute(stmt).await?;
        Ok(())
    }
}
