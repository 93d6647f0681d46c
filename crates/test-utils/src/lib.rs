//! Commons test utilities.
//!
//! Fixture builders producing entity rows as JSON objects, ready to be
//! inserted into any store keyed by collection. Ids are left to the store
//! unless set with `with_id`.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value as JsonValue, json};

fn object(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    }
}

fn with_optional_id(mut row: Map<String, JsonValue>, id: Option<i64>) -> JsonValue {
    if let Some(id) = id {
        row.insert("id".to_string(), JsonValue::from(id));
    }
    JsonValue::Object(row)
}

/// Create a test user with default values.
pub fn test_user(username: &str) -> TestUser {
    TestUser {
        id: None,
        username: username.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        bio: String::new(),
        is_active: true,
        is_superuser: false,
        latitude: None,
        longitude: None,
    }
}

/// A user row builder.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Option<i64>,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl TestUser {
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_name(mut self, first: &str, last: &str) -> Self {
        self.first_name = first.to_string();
        self.last_name = last.to_string();
        self
    }

    pub fn with_bio(mut self, bio: &str) -> Self {
        self.bio = bio.to_string();
        self
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    /// Row as stored, including the private columns serializers drop.
    pub fn to_row(&self) -> JsonValue {
        let row = object(json!({
            "username": self.username,
            "first_name": self.first_name,
            "last_name": self.last_name,
            "bio": self.bio,
            "email": format!("{}@example.com", self.username),
            "password_hash": "$argon2id$fixture",
            "is_active": self.is_active,
            "is_superuser": self.is_superuser,
            "unread_notifications": 0,
            "last_login": null,
            "latitude": self.latitude,
            "longitude": self.longitude,
        }));
        with_optional_id(row, self.id)
    }
}

/// Create a test post by `creator_id`.
pub fn test_post(creator_id: i64, title: &str) -> TestPost {
    TestPost {
        id: None,
        creator_id,
        title: title.to_string(),
        content: String::new(),
        category_id: None,
        author_club_id: None,
        event_id: None,
        is_anon: false,
    }
}

/// A post row builder.
#[derive(Debug, Clone)]
pub struct TestPost {
    pub id: Option<i64>,
    pub creator_id: i64,
    pub title: String,
    pub content: String,
    pub category_id: Option<i64>,
    pub author_club_id: Option<i64>,
    pub event_id: Option<i64>,
    pub is_anon: bool,
}

impl TestPost {
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn by_club(mut self, club_id: i64) -> Self {
        self.author_club_id = Some(club_id);
        self
    }

    pub fn about_event(mut self, event_id: i64) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.is_anon = true;
        self
    }

    pub fn to_row(&self) -> JsonValue {
        let row = object(json!({
            "creator_id": self.creator_id,
            "title": self.title,
            "content": self.content,
            "category_id": self.category_id,
            "author_club_id": self.author_club_id,
            "event_id": self.event_id,
            "is_anon": self.is_anon,
        }));
        with_optional_id(row, self.id)
    }
}

/// Comment row on `post_id`, optionally replying to another comment.
pub fn comment(creator_id: i64, post_id: i64, content: &str, reply_to: Option<i64>) -> JsonValue {
    json!({
        "creator_id": creator_id,
        "post_id": post_id,
        "content": content,
        "reply_to_id": reply_to,
        "is_anon": false,
    })
}

/// Create a test event hosted by a user, starting `starts_in` from now and
/// lasting two hours.
pub fn test_event(host_user_id: i64, name: &str, starts_in: Duration) -> TestEvent {
    let start_date = Utc::now() + starts_in;
    TestEvent {
        id: None,
        host_user_id,
        host_club_id: None,
        name: name.to_string(),
        description: String::new(),
        category_id: None,
        start_date,
        end_date: start_date + Duration::hours(2),
    }
}

/// An event row builder.
#[derive(Debug, Clone)]
pub struct TestEvent {
    pub id: Option<i64>,
    pub host_user_id: i64,
    pub host_club_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl TestEvent {
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn hosted_by_club(mut self, club_id: i64) -> Self {
        self.host_club_id = Some(club_id);
        self
    }

    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn ending_at(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = end_date;
        self
    }

    pub fn to_row(&self) -> JsonValue {
        let row = object(json!({
            "host_user_id": self.host_user_id,
            "host_club_id": self.host_club_id,
            "name": self.name,
            "description": self.description,
            "category_id": self.category_id,
            "start_date": self.start_date.to_rfc3339(),
            "end_date": self.end_date.to_rfc3339(),
            "qr_code": "fixture-qr",
            "verification_link": "https://example.com/verify/fixture",
        }));
        with_optional_id(row, self.id)
    }
}

/// Club row; `post_policy` false limits posting to admins.
pub fn club(name: &str, post_policy: bool) -> JsonValue {
    json!({
        "name": name,
        "description": format!("{name} club"),
        "category_id": null,
        "post_policy": post_policy,
    })
}

/// Place row.
pub fn place(name: &str) -> JsonValue {
    json!({
        "name": name,
        "description": format!("{name} place"),
        "category_id": null,
    })
}

pub fn connection(from_user_id: i64, to_user_id: i64, is_accepted: bool) -> JsonValue {
    json!({
        "from_user_id": from_user_id,
        "to_user_id": to_user_id,
        "is_accepted": is_accepted,
    })
}

pub fn block(blocking_user_id: i64, blocked_user_id: i64) -> JsonValue {
    json!({
        "blocking_user_id": blocking_user_id,
        "blocked_user_id": blocked_user_id,
    })
}

/// Hide row; `item_type` is the persisted item kind name, e.g. `"Post"`.
pub fn hide(hider_id: i64, item_type: &str, item_id: i64) -> JsonValue {
    json!({
        "hider_id": hider_id,
        "item_type": item_type,
        "item_id": item_id,
    })
}

pub fn report(reporter_id: i64, item_type: &str, item_id: i64, reason: &str) -> JsonValue {
    json!({
        "reporter_id": reporter_id,
        "item_type": item_type,
        "item_id": item_id,
        "reason": reason,
    })
}

pub fn membership(user_id: i64, club_id: i64, is_admin: bool) -> JsonValue {
    json!({
        "user_id": user_id,
        "club_id": club_id,
        "is_admin": is_admin,
    })
}

/// Attendance row with an optional registration form answer.
pub fn attendee(
    user_id: i64,
    event_id: i64,
    is_verified: bool,
    form_data: Option<JsonValue>,
) -> JsonValue {
    json!({
        "user_id": user_id,
        "event_id": event_id,
        "is_verified": is_verified,
        "form_data": form_data,
    })
}

pub fn ownership(user_id: i64, place_id: i64) -> JsonValue {
    json!({
        "user_id": user_id,
        "place_id": place_id,
    })
}

pub fn tag(item_type: &str, item_id: i64, name: &str) -> JsonValue {
    json!({
        "item_type": item_type,
        "item_id": item_id,
        "name": name,
    })
}

pub fn rate(user_id: i64, item_type: &str, item_id: i64, rate: i64) -> JsonValue {
    json!({
        "user_id": user_id,
        "item_type": item_type,
        "item_id": item_id,
        "rate": rate,
    })
}
