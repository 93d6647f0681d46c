//! SQL generation for querysets using SeaQuery.
//!
//! The outer collection is addressed by its table name; every nested
//! subquery gets its own `sN` alias so self-referencing aggregates (replies
//! counted against the comments table, for instance) stay unambiguous.

use sea_query::{
    Alias, Asterisk, Cond, Expr, ExprTrait, Func, Order, PostgresQueryBuilder, Query,
    SelectStatement, SimpleExpr, Value,
};

use super::predicate::{Aggregate, AggregateFunc, Predicate, Subquery};
use super::queryset::{Ordering, QuerySet, Slice, SortDirection};
use super::types::{FilterValue, Lookup};

/// Compiles one [`QuerySet`] to PostgreSQL.
pub struct QuerySetBuilder<'a> {
    queryset: &'a QuerySet,
}

impl<'a> QuerySetBuilder<'a> {
    pub fn new(queryset: &'a QuerySet) -> Self {
        Self { queryset }
    }

    fn table(&self) -> &'static str {
        self.queryset.model().table()
    }

    /// Build the row SELECT, with annotations and an optional window.
    pub fn build(&self, slice: Option<Slice>) -> String {
        let table = self.table();
        let mut query = Query::select();

        query.column((Alias::new(table), Asterisk));
        for annotation in self.queryset.annotations() {
            query.expr_as(
                aggregate_expr(&annotation.aggregate, table, 1),
                Alias::new(&annotation.name),
            );
        }
        query.from(Alias::new(table));

        self.add_filters(&mut query);
        self.add_sorts(&mut query);

        if let Some(slice) = slice {
            query.limit(slice.limit);
            query.offset(slice.offset);
        }

        query.to_string(PostgresQueryBuilder)
    }

    /// Build the row SELECT wrapped so each row comes back as one JSON object.
    pub fn build_json(&self, slice: Option<Slice>) -> String {
        format!("SELECT row_to_json(t) FROM ({}) t", self.build(slice))
    }

    /// Build a COUNT query over the full filtered set.
    pub fn build_count(&self) -> String {
        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count());
        query.from(Alias::new(self.table()));
        self.add_filters(&mut query);
        query.to_string(PostgresQueryBuilder)
    }

    fn add_filters(&self, query: &mut SelectStatement) {
        let predicate = self.queryset.predicate();
        if *predicate != Predicate::True {
            query.and_where(predicate_expr(predicate, self.table(), 1));
        }
    }

    fn add_sorts(&self, query: &mut SelectStatement) {
        let table = self.table();
        match self.queryset.ordering() {
            Ordering::Random => {
                query.order_by_expr(Expr::cust("RANDOM()"), Order::Asc);
            }
            Ordering::Columns(columns) => {
                for (field, direction) in columns {
                    let order = match direction {
                        SortDirection::Asc => Order::Asc,
                        SortDirection::Desc => Order::Desc,
                    };
                    query.order_by((Alias::new(table), Alias::new(field)), order);
                }
                if !columns.iter().any(|(field, _)| field == "id") {
                    query.order_by((Alias::new(table), Alias::new("id")), Order::Asc);
                }
            }
        }
    }
}

fn column(alias: &str, field: &str) -> Expr {
    Expr::col((Alias::new(alias), Alias::new(field)))
}

/// Compile a predicate against the collection addressed as `alias`.
///
/// `depth` numbers the aliases of nested subqueries.
fn predicate_expr(predicate: &Predicate, alias: &str, depth: usize) -> SimpleExpr {
    match predicate {
        Predicate::True => Expr::cust("TRUE"),
        Predicate::False => Expr::cust("FALSE"),
        Predicate::Compare {
            field,
            lookup,
            value,
        } => compare_expr(column(alias, field), *lookup, value),
        Predicate::InSubquery { field, subquery } => {
            column(alias, field).in_subquery(subquery_select(subquery, depth))
        }
        Predicate::And(items) => items
            .iter()
            .fold(Cond::all(), |cond, p| cond.add(predicate_expr(p, alias, depth)))
            .into(),
        Predicate::Or(items) => items
            .iter()
            .fold(Cond::any(), |cond, p| cond.add(predicate_expr(p, alias, depth)))
            .into(),
        Predicate::Not(inner) => {
            Expr::cust_with_expr("($1) IS NOT TRUE", predicate_expr(inner, alias, depth))
        }
    }
}

fn compare_expr(col: Expr, lookup: Lookup, value: &FilterValue) -> SimpleExpr {
    if lookup == Lookup::IsNull {
        let wants_null = match value {
            FilterValue::Boolean(b) => *b,
            other => other.as_string().is_some_and(|s| s == "true" || s == "1"),
        };
        return if wants_null {
            col.is_null()
        } else {
            col.is_not_null()
        };
    }

    if lookup == Lookup::In {
        let values: Vec<Value> = value.members().iter().filter_map(sql_value).collect();
        if values.is_empty() {
            return Expr::cust("FALSE");
        }
        return col.is_in(values);
    }

    if lookup == Lookup::IContains {
        let needle = value.as_string().unwrap_or_default().to_lowercase();
        return Expr::expr(Func::lower(col))
            .like(format!("%{}%", escape_like_wildcards(&needle)));
    }

    let Some(value) = sql_value(value) else {
        return Expr::cust("FALSE");
    };
    match lookup {
        Lookup::Ne => col.ne(value),
        Lookup::Gt => col.gt(value),
        Lookup::Gte => col.gte(value),
        Lookup::Lt => col.lt(value),
        Lookup::Lte => col.lte(value),
        _ => col.eq(value),
    }
}

fn sql_value(value: &FilterValue) -> Option<Value> {
    Some(match value {
        FilterValue::String(s) => Value::from(s.clone()),
        FilterValue::Integer(i) => Value::from(*i),
        FilterValue::Float(f) => Value::from(*f),
        FilterValue::Boolean(b) => Value::from(*b),
        FilterValue::DateTime(d) => Value::from(*d),
        FilterValue::List(_) => return None,
    })
}

/// `SELECT sN.column FROM table AS sN WHERE predicate AND sN.column IS NOT NULL`.
fn subquery_select(subquery: &Subquery, depth: usize) -> SelectStatement {
    let alias = format!("s{depth}");
    let mut select = Query::select();
    select
        .column((Alias::new(&alias), Alias::new(&subquery.column)))
        .from_as(Alias::new(subquery.model.table()), Alias::new(&alias))
        .and_where(column(&alias, &subquery.column).is_not_null());
    if subquery.predicate != Predicate::True {
        select.and_where(predicate_expr(&subquery.predicate, &alias, depth + 1));
    }
    select
}

/// Correlated scalar subquery computing one annotation.
fn aggregate_expr(aggregate: &Aggregate, outer: &str, depth: usize) -> SimpleExpr {
    let alias = format!("s{depth}");
    let target = column(&alias, &aggregate.column);
    let func = match aggregate.func {
        AggregateFunc::Count => Func::count(target),
        AggregateFunc::Sum => Func::sum(target),
        AggregateFunc::Avg => Func::avg(target),
    };

    let mut select = Query::select();
    select
        .expr(func)
        .from_as(Alias::new(aggregate.model.table()), Alias::new(&alias));
    if aggregate.is_correlated() {
        select.and_where(
            column(&alias, &aggregate.inner_column)
                .equals((Alias::new(outer), Alias::new(&aggregate.outer_column))),
        );
    }
    if aggregate.predicate != Predicate::True {
        select.and_where(predicate_expr(&aggregate.predicate, &alias, depth + 1));
    }
    SimpleExpr::SubQuery(None, Box::new(select.into_sub_query_statement()))
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
