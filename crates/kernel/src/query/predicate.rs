//! Predicate algebra shared by every store backend.
//!
//! Predicates are plain data: the SQL builder compiles them with SeaQuery and
//! the in-memory store evaluates them directly, with the same three-valued
//! semantics.

use crate::models::Model;

use super::types::{FilterValue, Lookup};

/// Boolean condition over the columns of one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row.
    True,
    /// Matches no row.
    False,
    /// Column compared to a value.
    Compare {
        field: String,
        lookup: Lookup,
        value: FilterValue,
    },
    /// Column value appears in the column of another collection's rows.
    InSubquery {
        field: String,
        subquery: Box<Subquery>,
    },
    /// All members hold.
    And(Vec<Predicate>),
    /// At least one member holds.
    Or(Vec<Predicate>),
    /// The inner predicate is not definitely true (`IS NOT TRUE`).
    Not(Box<Predicate>),
}

/// `SELECT column FROM model WHERE predicate`, NULLs skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    pub model: Model,
    pub column: String,
    pub predicate: Predicate,
}

impl Subquery {
    pub fn new(model: Model, column: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            model,
            column: column.into(),
            predicate,
        }
    }
}

impl Predicate {
    /// `field = value`.
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::lookup(field, Lookup::Exact, value)
    }

    /// `field <lookup> value`.
    pub fn lookup(field: impl Into<String>, lookup: Lookup, value: impl Into<FilterValue>) -> Self {
        Predicate::Compare {
            field: field.into(),
            lookup,
            value: value.into(),
        }
    }

    /// `field IN (values)`.
    pub fn is_in(field: impl Into<String>, values: Vec<FilterValue>) -> Self {
        Self::lookup(field, Lookup::In, FilterValue::List(values))
    }

    /// Case-insensitive substring match.
    pub fn icontains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::lookup(field, Lookup::IContains, FilterValue::String(needle.into()))
    }

    /// `field IN (SELECT column FROM model WHERE predicate)`.
    pub fn in_subquery(
        field: impl Into<String>,
        model: Model,
        column: impl Into<String>,
        predicate: Predicate,
    ) -> Self {
        Predicate::InSubquery {
            field: field.into(),
            subquery: Box::new(Subquery::new(model, column, predicate)),
        }
    }

    /// Conjunction, flattening nested conjunctions and dropping `True`.
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::True, p) | (p, Predicate::True) => p,
            (Predicate::False, _) | (_, Predicate::False) => Predicate::False,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, Predicate::And(mut right)) => {
                right.insert(0, p);
                Predicate::And(right)
            }
            (left, right) => Predicate::And(vec![left, right]),
        }
    }

    /// Disjunction, flattening nested disjunctions and dropping `False`.
    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::False, p) | (p, Predicate::False) => p,
            (Predicate::True, _) | (_, Predicate::True) => Predicate::True,
            (Predicate::Or(mut left), Predicate::Or(right)) => {
                left.extend(right);
                Predicate::Or(left)
            }
            (Predicate::Or(mut left), p) => {
                left.push(p);
                Predicate::Or(left)
            }
            (p, Predicate::Or(mut right)) => {
                right.insert(0, p);
                Predicate::Or(right)
            }
            (left, right) => Predicate::Or(vec![left, right]),
        }
    }

    /// Negation with `IS NOT TRUE` semantics.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        match self {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            p => Predicate::Not(Box::new(p)),
        }
    }

    /// OR-combine a list of predicates; empty lists match nothing.
    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        predicates
            .into_iter()
            .fold(Predicate::False, Predicate::or)
    }
}

/// Aggregate function for annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
}

/// Aggregate over a related collection.
///
/// Compiles to `(SELECT func(column) FROM model WHERE inner = outer.outer AND
/// predicate)`; without a correlation the `inner = outer.outer` term is
/// dropped and every outer row sees the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub func: AggregateFunc,
    pub model: Model,
    pub column: String,
    pub inner_column: String,
    pub outer_column: String,
    pub predicate: Predicate,
}

impl Aggregate {
    fn new(func: AggregateFunc, model: Model, column: &str) -> Self {
        Self {
            func,
            model,
            column: column.to_string(),
            inner_column: String::new(),
            outer_column: "id".to_string(),
            predicate: Predicate::True,
        }
    }

    pub fn is_correlated(&self) -> bool {
        !self.inner_column.is_empty()
    }

    pub fn count(model: Model) -> Self {
        Self::new(AggregateFunc::Count, model, "id")
    }

    pub fn sum(model: Model, column: &str) -> Self {
        Self::new(AggregateFunc::Sum, model, column)
    }

    pub fn avg(model: Model, column: &str) -> Self {
        Self::new(AggregateFunc::Avg, model, column)
    }

    /// Correlate `model.inner = outer.outer_column`.
    pub fn correlate(mut self, inner: &str, outer: &str) -> Self {
        self.inner_column = inner.to_string();
        self.outer_column = outer.to_string();
        self
    }

    /// Restrict the aggregated rows.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = self.predicate.and(predicate);
        self
    }
}

/// Named aggregate attached to every fetched entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub name: String,
    pub aggregate: Aggregate,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_drops_true_and_flattens() {
        let p = Predicate::True
            .and(Predicate::eq("a", 1))
            .and(Predicate::eq("b", 2))
            .and(Predicate::eq("c", 3));
        match p {
            Predicate::And(items) => assert_eq!(items.len(), 3),
            other => panic!("expected conjunction, got {other:?}"),
        }
    }

    #[test]
    fn and_with_false_is_false() {
        assert_eq!(Predicate::eq("a", 1).and(Predicate::False), Predicate::False);
    }

    #[test]
    fn any_of_nothing_is_false() {
        assert_eq!(Predicate::any(Vec::new()), Predicate::False);
    }

    #[test]
    fn any_of_one_is_itself() {
        let p = Predicate::eq("a", 1);
        assert_eq!(Predicate::any(vec![p.clone()]), p);
    }

    #[test]
    fn not_folds_constants() {
        assert_eq!(Predicate::False.not(), Predicate::True);
        assert_eq!(Predicate::True.not(), Predicate::False);
    }

    #[test]
    fn aggregate_builder_sets_correlation() {
        let agg = Aggregate::sum(Model::Rate, "rate")
            .correlate("user_id", "id")
            .filter(Predicate::eq("item_type", "Post"));
        assert_eq!(agg.inner_column, "user_id");
        assert_eq!(agg.outer_column, "id");
        assert_eq!(agg.predicate, Predicate::eq("item_type", "Post"));
    }
}
