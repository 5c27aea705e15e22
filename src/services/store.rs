//! Pending login store
//!
//! The only way in or out of the `pending_logins` table. Exposes
//! create/get/list/transition, serializes transitions per id, and emits an
//! audit event for every committed mutation. Records are never deleted
//! here; cleanup is an external administrative concern.

use dashmap::DashMap;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{DomainError, LoginStatus};
use crate::models::audit_event;
use crate::models::pending_login;
use crate::models::ActorKind;
use crate::services::events::EventBus;

#[derive(Clone, Debug, Default)]
pub struct NewPendingLogin {
    pub platform: String,
    pub username: String,
    pub password: String,
    pub otp: Option<String>,
    pub note: Option<String>,
    pub profile_ref: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct TransitionOpts {
    pub actor: ActorKind,
    pub note: Option<String>,
    /// Replaces the stored OTP value (OTP-related transitions only)
    pub otp: Option<String>,
    pub meta: Option<serde_json::Value>,
}

/// Outcome reported by the automation engine once a job finishes.
#[derive(Clone, Debug)]
pub enum JobOutcome {
    Success,
    NeedsOtp,
    Failed(String),
}

#[derive(Clone)]
pub struct PendingLoginStore {
    db: DatabaseConnection,
    events: EventBus,
    // Per-id critical section so concurrent decisions on one job resolve
    // deterministically: one winner, one InvalidTransition.
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl PendingLoginStore {
    pub fn new(db: DatabaseConnection, events: EventBus) -> Self {
        Self {
            db,
            events,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Create a new relay job in `pending` and emit the creation event.
    pub async fn create(&self, new: NewPendingLogin) -> Result<pending_login::Model, DomainError> {
        if new.platform.trim().is_empty() {
            return Err(DomainError::Validation("platform is required".to_string()));
        }
        if new.username.trim().is_empty() {
            return Err(DomainError::Validation("username is required".to_string()));
        }
        if new.password.is_empty() {
            return Err(DomainError::Validation("password is required".to_string()));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let id = uuid::Uuid::new_v4().to_string();

        let record = pending_login::ActiveModel {
            id: Set(id),
            platform: Set(new.platform),
            username: Set(new.username),
            password: Set(new.password),
            otp: Set(new.otp),
            status: Set(LoginStatus::Pending.as_str().to_string()),
            note: Set(new.note),
            profile_ref: Set(new.profile_ref),
            requires_otp: Set(false),
            job_error: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        let created = record.insert(&self.db).await?;
        tracing::info!(
            "Pending login created: {} (platform: {})",
            created.id,
            created.platform
        );

        self.append_event(&created.id, ActorKind::System, None, LoginStatus::Pending, None)
            .await?;

        Ok(created)
    }

    pub async fn get(&self, id: &str) -> Result<pending_login::Model, DomainError> {
        pending_login::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)
    }

    /// Point-in-time snapshot, newest first.
    pub async fn list(
        &self,
        status: Option<LoginStatus>,
    ) -> Result<Vec<pending_login::Model>, DomainError> {
        let mut query = pending_login::Entity::find()
            .order_by_desc(pending_login::Column::CreatedAt);

        if let Some(status) = status {
            query = query.filter(pending_login::Column::Status.eq(status.as_str()));
        }

        Ok(query.all(&self.db).await?)
    }

    /// Move a job to `target` if the transition table allows it.
    ///
    /// Runs inside the per-id critical section: of two concurrent decisions
    /// on the same job, one commits and the other sees InvalidTransition.
    /// The audit event is emitted after the row is committed, so observers
    /// reacting to it always read consistent state.
    pub async fn transition(
        &self,
        id: &str,
        target: LoginStatus,
        opts: TransitionOpts,
    ) -> Result<pending_login::Model, DomainError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let current = self.get(id).await?;
        let from = current.status();

        if !from.can_transition_to(target) {
            return Err(DomainError::InvalidTransition { from, to: target });
        }

        let mut active: pending_login::ActiveModel = current.into();
        active.status = Set(target.as_str().to_string());
        if let Some(note) = opts.note.clone() {
            active.note = Set(Some(note));
        }
        if let Some(otp) = opts.otp.clone() {
            active.otp = Set(Some(otp));
        }
        if target == LoginStatus::Failed {
            if let Some(meta) = opts.meta.as_ref() {
                if let Some(reason) = meta.get("error").and_then(|v| v.as_str()) {
                    active.job_error = Set(Some(reason.to_string()));
                }
            }
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active.update(&self.db).await?;
        tracing::info!("Pending login {}: {} -> {}", updated.id, from, target);

        let meta = match (opts.meta, opts.note) {
            (Some(meta), _) => Some(meta),
            (None, Some(note)) => Some(serde_json::json!({ "note": note })),
            (None, None) => None,
        };
        self.append_event(&updated.id, opts.actor, Some(from), target, meta)
            .await?;

        Ok(updated)
    }

    /// Apply the automation engine's job outcome.
    ///
    /// Success leaves the record untouched (`approved` already maps to the
    /// caller-facing success). A detected second-factor challenge flags the
    /// record so status reads surface the OTP prompt. Hard failures move
    /// the job to `failed`.
    pub async fn record_outcome(
        &self,
        id: &str,
        outcome: JobOutcome,
    ) -> Result<pending_login::Model, DomainError> {
        match outcome {
            JobOutcome::Success => self.get(id).await,
            JobOutcome::NeedsOtp => self.mark_otp_challenge(id).await,
            JobOutcome::Failed(reason) => {
                self.transition(
                    id,
                    LoginStatus::Failed,
                    TransitionOpts {
                        actor: ActorKind::System,
                        meta: Some(serde_json::json!({ "error": reason })),
                        ..Default::default()
                    },
                )
                .await
            }
        }
    }

    /// Flag a second-factor challenge detected after approval. Status stays
    /// `approved`; the flag is what status reads surface as `requires_otp`.
    async fn mark_otp_challenge(&self, id: &str) -> Result<pending_login::Model, DomainError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let current = self.get(id).await?;
        let status = current.status();

        let mut active: pending_login::ActiveModel = current.into();
        active.requires_otp = Set(true);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        let updated = active.update(&self.db).await?;

        self.append_event(
            &updated.id,
            ActorKind::System,
            Some(status),
            status,
            Some(serde_json::json!({ "event": "otp_challenge" })),
        )
        .await?;

        Ok(updated)
    }

    pub async fn audit_trail(
        &self,
        pending_login_id: &str,
    ) -> Result<Vec<audit_event::Model>, DomainError> {
        Ok(audit_event::Entity::find()
            .filter(audit_event::Column::PendingLoginId.eq(pending_login_id))
            .order_by_asc(audit_event::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn append_event(
        &self,
        pending_login_id: &str,
        actor: ActorKind,
        from: Option<LoginStatus>,
        to: LoginStatus,
        meta: Option<serde_json::Value>,
    ) -> Result<(), DomainError> {
        let event = audit_event::ActiveModel {
            pending_login_id: Set(pending_login_id.to_string()),
            actor_kind: Set(actor.as_str().to_string()),
            from_status: Set(from.map(|s| s.as_str().to_string())),
            to_status: Set(to.as_str().to_string()),
            meta: Set(meta.map(|m| m.to_string())),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let stored = event.insert(&self.db).await?;
        self.events.publish(stored);
        Ok(())
    }
}
