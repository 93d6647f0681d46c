//! Query adapter over the persistence layer.
//!
//! Filter sets describe what they want as a [`QuerySet`]: a predicate, a list
//! of aggregate annotations and an ordering over one collection. A [`Store`]
//! executes it, either against PostgreSQL ([`PgStore`]) or in memory
//! ([`MemoryStore`]).

pub mod memory;
pub mod predicate;
pub mod query_builder;
pub mod queryset;
pub mod store;
pub mod types;

pub use memory::MemoryStore;
pub use predicate::{Aggregate, AggregateFunc, Annotation, Predicate, Subquery};
pub use query_builder::QuerySetBuilder;
pub use queryset::{Entity, Ordering, QuerySet, Slice, SortDirection};
pub use store::{PgStore, Store};
pub use types::{FilterValue, Lookup};
