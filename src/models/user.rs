use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{ContactChannel, Gender, UserRole};

/// Aggregate root for doctors and patients alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub role: UserRole,
    pub is_active: bool,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
}

/// One name record; its given names live in a child table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserName {
    pub id: i64,
    pub user_id: String,
    pub family_name: Option<String>,
    pub name_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContact {
    pub id: i64,
    pub user_id: String,
    pub channel: ContactChannel,
    pub label: String,
    pub value: String,
}
