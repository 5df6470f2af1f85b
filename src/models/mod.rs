use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub pro: bool,
    pub todos: Vec<Todo>,
}
impl User {
    pub fn new(name: String, username: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            username,
            pro: false,
            todos: Vec::new(),
        }
    }

    pub fn todo_mut(&mut self, id: Uuid) -> Option<&mut Todo> {
        self.todos.iter_mut().find(|todo| todo.id == id)
    }
    pub fn todo_by_wire_id(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|todo| same_wire_id(todo.id, id))
    }
}

// Ids only match their serialized spelling; urn, braced, simple and
// uppercase forms of the same UUID do not.
pub fn same_wire_id(id: Uuid, raw: &str) -> bool {
    let mut buf = Uuid::encode_buffer();
    *id.hyphenated().encode_lower(&mut buf) == *raw
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "millis")]
    pub deadline: DateTime<Utc>,
    pub done: bool,
    #[serde(with = "millis")]
    pub created_at: DateTime<Utc>,
}
impl Todo {
    pub fn new(title: String, deadline: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            deadline,
            done: false,
            created_at: Utc::now(),
        }
    }
}

// accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD` (midnight UTC)
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

pub fn deserialize_deadline<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_deadline(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid deadline: {raw}")))
}

/// RFC 3339 in UTC with exactly three fractional digits, e.g.
/// `2021-02-27T00:00:00.000Z`.
pub mod millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        super::deserialize_deadline(deserializer)
    }
}
