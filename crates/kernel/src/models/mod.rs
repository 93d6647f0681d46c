//! Stored collections and the attachable item kinds.
//!
//! The framework never inspects entity internals except through named
//! columns, so each collection is identified by a [`Model`] that knows its
//! table name and natural ordering.

use serde::{Deserialize, Serialize};

pub mod club;
pub mod event;
pub mod place;
pub mod user;

pub use user::Caller;

/// A persisted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    User,
    Connection,
    Blocked,
    Post,
    Comment,
    Event,
    Attendee,
    Club,
    Membership,
    Place,
    Ownership,
    Advertisement,
    Tag,
    Rate,
    Hide,
    Report,
}

impl Model {
    /// Table backing this collection.
    pub fn table(self) -> &'static str {
        match self {
            Model::User => "users",
            Model::Connection => "connections",
            Model::Blocked => "blocked",
            Model::Post => "posts",
            Model::Comment => "comments",
            Model::Event => "events",
            Model::Attendee => "attendees",
            Model::Club => "clubs",
            Model::Membership => "memberships",
            Model::Place => "places",
            Model::Ownership => "ownerships",
            Model::Advertisement => "advertisements",
            Model::Tag => "tags",
            Model::Rate => "rates",
            Model::Hide => "hides",
            Model::Report => "reports",
        }
    }

    /// Declared ordering, applied ahead of the `id` tiebreaker.
    ///
    /// Only columns listed here are used for the natural order; everything
    /// else pages by primary key.
    pub fn default_ordering(self) -> &'static [(&'static str, bool)] {
        match self {
            Model::Event => &[("start_date", false)],
            Model::User => &[("username", false)],
            _ => &[],
        }
    }
}

/// Kinds of items that hides, reports, rates and tags can point at.
///
/// Stored as `item_type` next to an `item_id`; the string form is the
/// persisted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    User,
    Post,
    Comment,
    Event,
    Club,
    Place,
}

/// Reverse lookup table for parsing persisted values and collections.
const ITEM_KINDS: [(ItemKind, Model, &str); 6] = [
    (ItemKind::User, Model::User, "User"),
    (ItemKind::Post, Model::Post, "Post"),
    (ItemKind::Comment, Model::Comment, "Comment"),
    (ItemKind::Event, Model::Event, "Event"),
    (ItemKind::Club, Model::Club, "Club"),
    (ItemKind::Place, Model::Place, "Place"),
];

impl ItemKind {
    /// Collection holding items of this kind.
    pub fn model(self) -> Model {
        match self {
            ItemKind::User => Model::User,
            ItemKind::Post => Model::Post,
            ItemKind::Comment => Model::Comment,
            ItemKind::Event => Model::Event,
            ItemKind::Club => Model::Club,
            ItemKind::Place => Model::Place,
        }
    }

    /// Persisted `item_type` value.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::User => "User",
            ItemKind::Post => "Post",
            ItemKind::Comment => "Comment",
            ItemKind::Event => "Event",
            ItemKind::Club => "Club",
            ItemKind::Place => "Place",
        }
    }

    /// Parse a persisted `item_type` value.
    pub fn parse(value: &str) -> Option<Self> {
        ITEM_KINDS
            .iter()
            .find(|(_, _, name)| *name == value)
            .map(|(kind, _, _)| *kind)
    }

    /// Item kind stored in a collection, if the collection is attachable.
    pub fn for_model(model: Model) -> Option<Self> {
        ITEM_KINDS
            .iter()
            .find(|(_, m, _)| *m == model)
            .map(|(kind, _, _)| *kind)
    }
}
