use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::LoginStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_logins")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String, // uuid v4, assigned at creation, never reused
    pub platform: String,
    pub username: String,
    pub password: String,
    pub otp: Option<String>,
    #[sea_orm(default_value = "pending")]
    pub status: String, // pending, otp_required, approved, denied, failed
    pub note: Option<String>,
    pub profile_ref: Option<String>,
    pub requires_otp: bool,
    pub job_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> LoginStatus {
        // The store only ever writes values produced by LoginStatus::as_str
        LoginStatus::parse(&self.status).unwrap_or(LoginStatus::Pending)
    }
}
