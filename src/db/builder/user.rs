use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::enums::{ContactChannel, Gender, UserRole};
use crate::models::{User, UserContact, UserName};

/// Builder for the User aggregate (doctors and patients).
pub struct UserBuilder<'c> {
    conn: &'c Connection,
    row: User,
}

impl<'c> UserBuilder<'c> {
    /// Load the row with the given id, or insert a fresh one immediately
    /// so child rows can reference it.
    pub fn load_or_create(conn: &'c Connection, id: Option<&str>) -> Result<Self, StoreError> {
        if let Some(id) = id {
            if let Some(row) = get_user(conn, id)? {
                return Ok(Self { conn, row });
            }
        }

        let row = User {
            id: id
                .map(str::to_owned)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            role: UserRole::Patient,
            is_active: true,
            birth_date: None,
            gender: None,
        };
        conn.execute(
            "INSERT INTO users (id, role, is_active, birth_date, gender)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row.id,
                row.role.as_str(),
                row.is_active,
                row.birth_date.map(|d| d.to_string()),
                row.gender.map(|g| g.as_str()),
            ],
        )?;
        Ok(Self { conn, row })
    }

    pub fn id(&self) -> &str {
        &self.row.id
    }

    pub fn row(&self) -> &User {
        &self.row
    }

    pub fn set_role(&mut self, role: UserRole) {
        self.row.role = role;
    }

    pub fn set_is_active(&mut self, is_active: bool) {
        self.row.is_active = is_active;
    }

    pub fn set_birth_date(&mut self, birth_date: NaiveDate) {
        self.row.birth_date = Some(birth_date);
    }

    pub fn set_gender(&mut self, gender: Gender) {
        self.row.gender = Some(gender);
    }

    /// Flush scalar fields to the store. Child rows are written as they
    /// are added and need no flush.
    pub fn save(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE users SET role = ?2, is_active = ?3, birth_date = ?4, gender = ?5
             WHERE id = ?1",
            params![
                self.row.id,
                self.row.role.as_str(),
                self.row.is_active,
                self.row.birth_date.map(|d| d.to_string()),
                self.row.gender.map(|g| g.as_str()),
            ],
        )?;
        Ok(())
    }

    /// Delete every name record together with its given names.
    /// Idempotent; a no-op when no names exist.
    pub fn clear_names(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM user_given_names WHERE user_name_id IN
             (SELECT id FROM user_names WHERE user_id = ?1)",
            params![self.row.id],
        )?;
        self.conn.execute(
            "DELETE FROM user_names WHERE user_id = ?1",
            params![self.row.id],
        )?;
        Ok(())
    }

    /// Insert one name record, then its given-name rows against the
    /// freshly generated name id.
    pub fn add_name(
        &self,
        family_name: Option<&str>,
        name_text: Option<&str>,
        given_names: &[String],
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO user_names (user_id, family_name, name_text) VALUES (?1, ?2, ?3)",
            params![self.row.id, family_name, name_text],
        )?;
        let name_id = self.conn.last_insert_rowid();

        for given_name in given_names {
            self.conn.execute(
                "INSERT INTO user_given_names (user_name_id, given_name) VALUES (?1, ?2)",
                params![name_id, given_name],
            )?;
        }
        Ok(())
    }

    pub fn clear_contact_info(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM user_contacts WHERE user_id = ?1",
            params![self.row.id],
        )?;
        Ok(())
    }

    pub fn add_contact_info(
        &self,
        channel: ContactChannel,
        label: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO user_contacts (user_id, channel, label, value) VALUES (?1, ?2, ?3, ?4)",
            params![self.row.id, channel.as_str(), label, value],
        )?;
        Ok(())
    }
}

pub fn get_user(conn: &Connection, id: &str) -> Result<Option<User>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, role, is_active, birth_date, gender FROM users WHERE id = ?1",
    )?;

    let row = stmt
        .query_row(params![id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })
        .optional()?;

    let Some((id, role, is_active, birth_date, gender)) = row else {
        return Ok(None);
    };

    Ok(Some(User {
        id,
        role: UserRole::from_str(&role)?,
        is_active,
        birth_date: birth_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        gender: gender.map(|g| Gender::from_str(&g)).transpose()?,
    }))
}

pub fn user_names(conn: &Connection, user_id: &str) -> Result<Vec<UserName>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, family_name, name_text FROM user_names
         WHERE user_id = ?1 ORDER BY id",
    )?;

    let rows = stmt.query_map(params![user_id], |row| {
        Ok(UserName {
            id: row.get(0)?,
            user_id: row.get(1)?,
            family_name: row.get(2)?,
            name_text: row.get(3)?,
        })
    })?;

    rows.map(|r| r.map_err(StoreError::from)).collect()
}

pub fn user_contacts(conn: &Connection, user_id: &str) -> Result<Vec<UserContact>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, channel, label, value FROM user_contacts
         WHERE user_id = ?1 ORDER BY id",
    )?;

    let rows = stmt.query_map(params![user_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut contacts = Vec::new();
    for row in rows {
        let (id, user_id, channel, label, value) = row?;
        contacts.push(UserContact {
            id,
            user_id,
            channel: ContactChannel::from_str(&channel)?,
            label,
            value,
        });
    }
    Ok(contacts)
}

pub fn user_exists(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    let found = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}
