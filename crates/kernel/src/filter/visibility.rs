//! Caller-scoped visibility modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Caller, ItemKind, Model};
use crate::query::Predicate;

/// Partition of a collection relative to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityMode {
    /// Everything except what the caller hid or blocked.
    #[default]
    Regular,
    /// Only what the caller hid.
    Hidden,
    /// Only what the caller blocked.
    Blocked,
    /// No restriction.
    All,
}

impl FromStr for VisibilityMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(VisibilityMode::Regular),
            "hidden" => Ok(VisibilityMode::Hidden),
            "blocked" => Ok(VisibilityMode::Blocked),
            "all" => Ok(VisibilityMode::All),
            _ => Err(()),
        }
    }
}

impl fmt::Display for VisibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VisibilityMode::Regular => "regular",
            VisibilityMode::Hidden => "hidden",
            VisibilityMode::Blocked => "blocked",
            VisibilityMode::All => "all",
        };
        f.write_str(name)
    }
}

/// Produces an extra "blocked" predicate for one caller.
pub type VisibilityRule = fn(&Caller) -> Predicate;

/// Rows of `kind` the caller has hidden.
pub fn hidden_by(kind: ItemKind, caller: &Caller) -> Predicate {
    Predicate::in_subquery(
        "id",
        Model::Hide,
        "item_id",
        Predicate::eq("hider_id", caller.id).and(Predicate::eq("item_type", kind.as_str())),
    )
}

/// Rows whose `column` references a user the caller blocked.
pub fn owner_blocked(column: &str, caller: &Caller) -> Predicate {
    Predicate::in_subquery(
        column,
        Model::Blocked,
        "blocked_user_id",
        Predicate::eq("blocking_user_id", caller.id),
    )
}
