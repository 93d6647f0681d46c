//! Declarative filtering: parameter binding, visibility, search and
//! function filters composed into a [`QuerySet`](crate::query::QuerySet).

pub mod filter_set;
pub mod schema;
pub mod sets;
pub mod visibility;

pub use filter_set::{
    ConfigError, FilterError, FilterRequest, FilterSet, FilterSetBuilder, FunctionFilter,
    FunctionOutput,
};
pub use schema::{BindError, FilterParameters, ParamKind, ParamSpec, ParamTarget};
pub use sets::FilterRegistry;
pub use visibility::{VisibilityMode, VisibilityRule};
