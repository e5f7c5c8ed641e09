use serde::{Deserialize, Serialize};

/// A registered account. The password hash is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub const COLUMNS: &'static str = "id, email, password_hash, name, image, created_at, updated_at";

    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            name: row.get(3)?,
            image: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    pub conversation_id: String,
    pub metadata: Option<serde_json::Value>,
    pub user_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ChatMessage {
    pub const COLUMNS: &'static str =
        "id, role, content, conversation_id, metadata, user_id, created_at, updated_at";

    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let metadata: Option<String> = row.get(4)?;
        Ok(ChatMessage {
            id: row.get(0)?,
            role: row.get(1)?,
            content: row.get(2)?,
            conversation_id: row.get(3)?,
            // Opaque JSON column; unreadable values are dropped rather than failing the row
            metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
            user_id: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

/// A logged trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diary {
    pub id: String,
    pub user_id: String,
    pub pair: String,
    pub direction: String,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub pips: Option<f64>,
    pub notes: Option<String>,
    pub image: Option<String>,
    pub date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Diary {
    pub const COLUMNS: &'static str = "id, user_id, pair, direction, entry_price, exit_price, \
                                       pips, notes, image, date, created_at, updated_at";

    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Diary {
            id: row.get(0)?,
            user_id: row.get(1)?,
            pair: row.get(2)?,
            direction: row.get(3)?,
            entry_price: row.get(4)?,
            exit_price: row.get(5)?,
            pips: row.get(6)?,
            notes: row.get(7)?,
            image: row.get(8)?,
            date: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serialization_omits_password_hash() {
        let user = User {
            id: "u1".into(),
            email: "a@example.com".into(),
            password_hash: "$2b$12$secret".into(),
            name: Some("Ana".into()),
            image: None,
            created_at: "2024-01-01 00:00:00".into(),
            updated_at: "2024-01-01 00:00:00".into(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "a@example.com");
        assert_eq!(json["createdAt"], "2024-01-01 00:00:00");
    }
}
