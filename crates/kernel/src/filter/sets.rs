//! Concrete filter sets for every listed collection.

use crate::models::user::{blocked_by, connections_of};
use crate::models::{Caller, ItemKind, Model, club::memberships_of};
use crate::query::{Aggregate, FilterValue, Predicate, QuerySet};

use super::filter_set::{ConfigError, FilterError, FilterSet, FunctionOutput};
use super::schema::{BindError, ParamKind, ParamSpec};
use super::visibility::owner_blocked;

/// All filter sets, built once at startup.
#[derive(Debug)]
pub struct FilterRegistry {
    pub users: FilterSet,
    pub posts: FilterSet,
    pub comments: FilterSet,
    pub events: FilterSet,
    pub clubs: FilterSet,
    pub places: FilterSet,
    pub hides: FilterSet,
    pub reports: FilterSet,
}

impl FilterRegistry {
    pub fn build() -> Result<Self, ConfigError> {
        Ok(Self {
            users: users()?,
            posts: posts()?,
            comments: comments()?,
            events: events()?,
            clubs: clubs()?,
            places: places()?,
            hides: hides()?,
            reports: reports()?,
        })
    }
}

/// Integer argument of a function filter; anything else is a bind error.
fn integer_arg(function: &str, value: &FilterValue) -> Result<i64, FilterError> {
    match value {
        FilterValue::Integer(id) => Ok(*id),
        other => Err(BindError {
            field: function.to_string(),
            expected: ParamKind::Int.expected(),
            value: other.as_string().unwrap_or_default(),
        }
        .into()),
    }
}

/// `id IN (SELECT item_id FROM tags WHERE item_type = kind AND name IN (...))`.
fn tagged(kind: ItemKind) -> impl Fn(&FilterValue, QuerySet, Option<&Caller>) -> FunctionOutput {
    move |value, queryset, _| {
        let names = value.split_list().members();
        let tags = Predicate::eq("item_type", kind.as_str()).and(Predicate::is_in("name", names));
        Ok((
            queryset.filter(Predicate::in_subquery("id", Model::Tag, "item_id", tags)),
            Vec::new(),
        ))
    }
}

/// Users who rated the item, annotated with the sum of their rates for it.
fn rated(kind: ItemKind) -> impl Fn(&FilterValue, QuerySet, Option<&Caller>) -> FunctionOutput {
    move |value, queryset, _| {
        let rates = Predicate::eq("item_type", kind.as_str())
            .and(Predicate::eq("item_id", value.clone()));
        let queryset = queryset
            .filter(Predicate::in_subquery("id", Model::Rate, "user_id", rates.clone()))
            .annotate(
                "rate",
                Aggregate::sum(Model::Rate, "rate")
                    .correlate("user_id", "id")
                    .filter(rates),
            );
        Ok((queryset, vec!["rate".to_string()]))
    }
}

fn related_users(
    model: Model,
    key: &'static str,
    flag: &'static str,
    flag_value: bool,
) -> impl Fn(&FilterValue, QuerySet, Option<&Caller>) -> FunctionOutput {
    move |value, queryset, _| {
        let rows = Predicate::eq(key, value.clone()).and(Predicate::eq(flag, flag_value));
        Ok((
            queryset.filter(Predicate::in_subquery("id", model, "user_id", rows)),
            Vec::new(),
        ))
    }
}

/// Rows owned by the caller through `column`; anonymous callers are refused.
fn owned_by_caller(
    function: &'static str,
    column: &'static str,
) -> impl Fn(&FilterValue, QuerySet, Option<&Caller>) -> FunctionOutput {
    move |_, queryset, caller| {
        let caller = caller.ok_or_else(|| FilterError::CallerRequired {
            function: function.to_string(),
        })?;
        Ok((queryset.filter(Predicate::eq(column, caller.id)), Vec::new()))
    }
}

pub fn users() -> Result<FilterSet, ConfigError> {
    FilterSet::builder("users", Model::User)
        .search(&["username", "first_name", "last_name", "bio"])
        .param(ParamSpec::related("posts", ParamKind::Int, Model::Post, "creator_id", "id"))
        .param(ParamSpec::related("comments", ParamKind::Int, Model::Comment, "creator_id", "id"))
        .param(ParamSpec::related("hosted_events", ParamKind::Int, Model::Event, "host_user_id", "id"))
        .param(ParamSpec::related("attended_events", ParamKind::Int, Model::Attendee, "user_id", "event_id"))
        .param(ParamSpec::related("places", ParamKind::Int, Model::Ownership, "user_id", "place_id"))
        .param(ParamSpec::related("clubs", ParamKind::Int, Model::Membership, "user_id", "club_id"))
        .param(ParamSpec::new("latitude__lte", ParamKind::Float))
        .param(ParamSpec::new("latitude__gte", ParamKind::Float))
        .param(ParamSpec::new("longitude__lte", ParamKind::Float))
        .param(ParamSpec::new("longitude__gte", ParamKind::Float))
        .function_filter("connections", ParamKind::Int)
        .function_filter("rated_post", ParamKind::Int)
        .function_filter("rated_comment", ParamKind::Int)
        .function_filter("rated_event", ParamKind::Int)
        .function_filter("club_admins", ParamKind::Int)
        .function_filter("club_members", ParamKind::Int)
        .function_filter("verified_attendees", ParamKind::Int)
        .function_filter("unverified_attendees", ParamKind::Int)
        .function("connections", |value, queryset, _| {
            let user_id = integer_arg("connections", value)?;
            Ok((queryset.filter(connections_of(user_id)), Vec::new()))
        })
        .function("rated_post", rated(ItemKind::Post))
        .function("rated_comment", rated(ItemKind::Comment))
        .function("rated_event", rated(ItemKind::Event))
        .function("club_admins", related_users(Model::Membership, "club_id", "is_admin", true))
        .function("club_members", related_users(Model::Membership, "club_id", "is_admin", false))
        .function("verified_attendees", related_users(Model::Attendee, "event_id", "is_verified", true))
        .function("unverified_attendees", related_users(Model::Attendee, "event_id", "is_verified", false))
        .block_by(|caller| blocked_by(caller.id))
        .build()
}

pub fn posts() -> Result<FilterSet, ConfigError> {
    FilterSet::builder("posts", Model::Post)
        .search(&["title", "content"])
        .param(ParamSpec::new("category", ParamKind::Int).on_column("category_id"))
        .param(ParamSpec::new("creator", ParamKind::Int).on_column("creator_id"))
        .param(ParamSpec::new("author_club", ParamKind::Int).on_column("author_club_id"))
        .param(ParamSpec::new("event", ParamKind::Int).on_column("event_id"))
        .function_filter("tags", ParamKind::ListStr)
        .function("tags", tagged(ItemKind::Post))
        .block_by(|caller| owner_blocked("creator_id", caller))
        .build()
}

pub fn comments() -> Result<FilterSet, ConfigError> {
    FilterSet::builder("comments", Model::Comment)
        .search(&["content"])
        .param(ParamSpec::new("creator", ParamKind::Int).on_column("creator_id"))
        .param(ParamSpec::new("post", ParamKind::Int).on_column("post_id"))
        .param(ParamSpec::new("reply_to", ParamKind::Int).on_column("reply_to_id"))
        .function_filter("tags", ParamKind::ListStr)
        .function("tags", tagged(ItemKind::Comment))
        .block_by(|caller| owner_blocked("creator_id", caller))
        .build()
}

pub fn events() -> Result<FilterSet, ConfigError> {
    FilterSet::builder("events", Model::Event)
        .search(&["name", "description"])
        .param(ParamSpec::new("host_user__id__in", ParamKind::ListStr))
        .param(ParamSpec::new("host_club", ParamKind::Int).on_column("host_club_id"))
        .param(ParamSpec::new("host_user", ParamKind::Int).on_column("host_user_id"))
        .param(ParamSpec::related("attendees", ParamKind::Int, Model::Attendee, "event_id", "user_id"))
        .param(ParamSpec::new("category", ParamKind::Int).on_column("category_id"))
        .param(ParamSpec::new("start_date__gte", ParamKind::DateTime))
        .param(ParamSpec::new("end_date__lte", ParamKind::DateTime))
        .function_filter("tags", ParamKind::ListStr)
        .function("tags", tagged(ItemKind::Event))
        .block_by(|caller| owner_blocked("host_user_id", caller))
        .build()
}

pub fn clubs() -> Result<FilterSet, ConfigError> {
    FilterSet::builder("clubs", Model::Club)
        .search(&["name", "description"])
        .param(ParamSpec::new("category", ParamKind::Int).on_column("category_id"))
        .param(ParamSpec::related("posts", ParamKind::Int, Model::Post, "author_club_id", "id"))
        .param(ParamSpec::related("hosted_events", ParamKind::Int, Model::Event, "host_club_id", "id"))
        .function_filter("admins", ParamKind::Int)
        .function_filter("members", ParamKind::Int)
        .function_filter("tags", ParamKind::ListStr)
        .function("admins", |value, queryset, _| {
            let user_id = integer_arg("admins", value)?;
            Ok((queryset.filter(memberships_of(user_id, true)), Vec::new()))
        })
        .function("members", |value, queryset, _| {
            let user_id = integer_arg("members", value)?;
            Ok((queryset.filter(memberships_of(user_id, false)), Vec::new()))
        })
        .function("tags", tagged(ItemKind::Club))
        .build()
}

pub fn places() -> Result<FilterSet, ConfigError> {
    FilterSet::builder("places", Model::Place)
        .search(&["name", "description"])
        .param(ParamSpec::new("category", ParamKind::Int).on_column("category_id"))
        .param(ParamSpec::related("owners", ParamKind::Int, Model::Ownership, "place_id", "user_id"))
        .function_filter("tags", ParamKind::ListStr)
        .function("tags", tagged(ItemKind::Place))
        .build()
}

pub fn hides() -> Result<FilterSet, ConfigError> {
    FilterSet::builder("hides", Model::Hide)
        .param(ParamSpec::new("item_type", ParamKind::Str))
        .function_filter("me", ParamKind::Str)
        .function("me", owned_by_caller("me", "hider_id"))
        .default_value("me", "me")
        .build()
}

pub fn reports() -> Result<FilterSet, ConfigError> {
    FilterSet::builder("reports", Model::Report)
        .param(ParamSpec::new("item_type", ParamKind::Str))
        .function_filter("me", ParamKind::Str)
        .function("me", owned_by_caller("me", "reporter_id"))
        .default_value("me", "me")
        .build()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterParameters;

    #[test]
    fn registry_builds() {
        let registry = FilterRegistry::build().unwrap();
        assert_eq!(registry.users.function_names().count(), 8);
        assert_eq!(registry.events.params().len(), 7);
        assert_eq!(registry.hides.search_fields().len(), 0);
    }

    #[test]
    fn rated_post_annotates_rate() {
        let set = users().unwrap();
        let params = FilterParameters::new().with("rated_post", 12);
        let (qs, annotations) = set
            .apply_function_filters(&params, QuerySet::new(Model::User), None)
            .unwrap();
        assert_eq!(annotations, vec!["rate".to_string()]);
        assert!(qs.has_annotation("rate"));
    }

    #[test]
    fn user_id_filters_reject_non_integers() {
        let set = clubs().unwrap();
        let params = FilterParameters::new().with("admins", "seven");
        let err = set
            .apply_function_filters(&params, QuerySet::new(Model::Club), None)
            .unwrap_err();
        assert!(matches!(err, FilterError::Bind(ref bind) if bind.field == "admins"));

        let params = FilterParameters::new().with("connections", 4);
        assert!(users()
            .unwrap()
            .apply_function_filters(&params, QuerySet::new(Model::User), None)
            .is_ok());
    }

    #[test]
    fn hides_me_requires_caller() {
        let set = hides().unwrap();
        let params = FilterParameters::new().with("me", "me");
        let err = set
            .apply_function_filters(&params, QuerySet::new(Model::Hide), None)
            .unwrap_err();
        assert_eq!(
            err,
            FilterError::CallerRequired {
                function: "me".into()
            }
        );
    }

    #[test]
    fn tags_match_own_item_kind() {
        let set = places().unwrap();
        let params = FilterParameters::new().with("tags", "cafe,quiet");
        let (qs, _) = set
            .apply_function_filters(&params, QuerySet::new(Model::Place), None)
            .unwrap();
        assert_eq!(
            qs.predicate(),
            &Predicate::in_subquery(
                "id",
                Model::Tag,
                "item_id",
                Predicate::eq("item_type", "Place")
                    .and(Predicate::is_in("name", vec!["cafe".into(), "quiet".into()])),
            )
        );
    }
}
