//! Declarative filter sets.
//!
//! A [`FilterSet`] binds one collection to its parameter table, search
//! fields, named function filters and block rules. It is built once at
//! startup and shared read-only by every request; per-request data always
//! arrives as arguments.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::models::{Caller, ItemKind, Model};
use crate::query::{FilterValue, Predicate, QuerySet};

use super::schema::{BindError, FilterParameters, ParamKind, ParamSpec};
use super::visibility::{VisibilityMode, VisibilityRule, hidden_by};

/// Query-string keys consumed by the pipeline itself.
pub const MODE_KEY: &str = "mode";
pub const SEARCH_KEY: &str = "search";

/// Result of a function filter: the reshaped queryset and the annotation
/// names it attached.
pub type FunctionOutput = Result<(QuerySet, Vec<String>), FilterError>;

/// A registered function filter.
///
/// Receives the bound value, the queryset as reshaped by every earlier
/// function, and the caller.
pub type FunctionFilter =
    Arc<dyn Fn(&FilterValue, QuerySet, Option<&Caller>) -> FunctionOutput + Send + Sync>;

/// Inconsistent filter set declaration, detected when building.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("filter set {set}: function filter {name} is declared but has no implementation")]
    UnregisteredFunction { set: String, name: String },

    #[error("filter set {set}: function {name} is registered but not declared")]
    UndeclaredFunction { set: String, name: String },

    #[error("filter set {set}: {name} is declared more than once")]
    DuplicateName { set: String, name: String },

    #[error("filter set {set}: default value for undeclared function filter {name}")]
    UnknownDefault { set: String, name: String },
}

/// Per-request failure inside the filter pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("function filter {function} did not attach annotation {annotation}")]
    MissingAnnotation { function: String, annotation: String },

    #[error("function filter {function} requires an authenticated caller")]
    CallerRequired { function: String },
}

/// A declared function filter with its implementation.
#[derive(Clone)]
pub struct FunctionSpec {
    pub name: String,
    pub kind: ParamKind,
    pub default: Option<FilterValue>,
    callable: FunctionFilter,
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

/// Everything the pipeline needs from one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterRequest {
    pub mode: VisibilityMode,
    pub search: Option<String>,
    pub parameters: FilterParameters,
    pub function_filters: FilterParameters,
}

/// Filter recipe for one collection.
#[derive(Debug)]
pub struct FilterSet {
    name: String,
    model: Model,
    item_kind: Option<ItemKind>,
    params: Vec<ParamSpec>,
    search_fields: Vec<String>,
    functions: Vec<FunctionSpec>,
    block_rules: Vec<VisibilityRule>,
}

impl FilterSet {
    pub fn builder(name: &str, model: Model) -> FilterSetBuilder {
        FilterSetBuilder {
            name: name.to_string(),
            model,
            item_kind: ItemKind::for_model(model),
            params: Vec::new(),
            search_fields: Vec::new(),
            declared: Vec::new(),
            registered: Vec::new(),
            defaults: Vec::new(),
            block_rules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn search_fields(&self) -> &[String] {
        &self.search_fields
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|f| f.name.as_str())
    }

    /// Bind raw query-string pairs against the declared schema.
    ///
    /// Unknown keys are ignored. Function filters that the caller omits
    /// fall back to their declared default.
    pub fn bind(&self, raw: &HashMap<String, String>) -> Result<FilterRequest, BindError> {
        let mode = match raw.get(MODE_KEY).map(|m| m.trim()).filter(|m| !m.is_empty()) {
            None => VisibilityMode::default(),
            Some(value) => value.parse().map_err(|()| BindError {
                field: MODE_KEY.to_string(),
                expected: "one of regular, hidden, blocked, all",
                value: value.to_string(),
            })?,
        };

        let search = raw
            .get(SEARCH_KEY)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut parameters = FilterParameters::new();
        for spec in &self.params {
            if let Some(raw_value) = raw.get(&spec.name)
                && let Some(value) = spec.kind.bind(&spec.name, raw_value)?
            {
                parameters.set(spec.name.clone(), value);
            }
        }

        let mut function_filters = FilterParameters::new();
        for spec in &self.functions {
            let bound = match raw.get(&spec.name) {
                Some(raw_value) => spec.kind.bind(&spec.name, raw_value)?,
                None => None,
            };
            if let Some(value) = bound.or_else(|| spec.default.clone()) {
                function_filters.set(spec.name.clone(), value);
            }
        }

        Ok(FilterRequest {
            mode,
            search,
            parameters,
            function_filters,
        })
    }

    /// `(hidden, blocked)` predicates for the caller.
    ///
    /// Hidden matches rows the caller hid by item kind and id; blocked is the
    /// OR of this set's block rules. Either is `False` when it cannot apply.
    pub fn mode_filters(&self, caller: &Caller) -> (Predicate, Predicate) {
        let hidden = match self.item_kind {
            Some(kind) => hidden_by(kind, caller),
            None => Predicate::False,
        };
        let blocked = Predicate::any(self.block_rules.iter().map(|rule| rule(caller)));
        (hidden, blocked)
    }

    /// Starting queryset for a visibility mode.
    ///
    /// Anonymous callers always get the unrestricted view.
    pub fn base_queryset(&self, mode: VisibilityMode, caller: Option<&Caller>) -> QuerySet {
        let queryset = QuerySet::new(self.model);
        let Some(caller) = caller else {
            return queryset;
        };
        let (hidden, blocked) = self.mode_filters(caller);
        match mode {
            VisibilityMode::Regular => queryset.exclude(hidden.or(blocked)),
            VisibilityMode::Hidden => queryset.filter(hidden),
            VisibilityMode::Blocked => queryset.filter(blocked),
            VisibilityMode::All => queryset,
        }
    }

    /// AND in one constraint per bound parameter, in declaration order.
    pub fn apply_filters(&self, parameters: &FilterParameters, queryset: QuerySet) -> QuerySet {
        self.params.iter().fold(queryset, |qs, spec| match parameters.get(&spec.name) {
            Some(value) => qs.filter(spec.predicate(value)),
            None => qs,
        })
    }

    /// AND in a case-insensitive match of `text` against any search field.
    pub fn search(&self, text: Option<&str>, queryset: QuerySet) -> QuerySet {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return queryset;
        };
        if self.search_fields.is_empty() {
            return queryset;
        }
        let matches = Predicate::any(
            self.search_fields
                .iter()
                .map(|field| Predicate::icontains(field.clone(), text)),
        );
        queryset.filter(matches)
    }

    /// Run every bound function filter in declaration order.
    ///
    /// Returns the final queryset and the accumulated annotation names.
    pub fn apply_function_filters(
        &self,
        function_filters: &FilterParameters,
        queryset: QuerySet,
        caller: Option<&Caller>,
    ) -> Result<(QuerySet, Vec<String>), FilterError> {
        let mut queryset = queryset;
        let mut annotations: Vec<String> = Vec::new();

        for spec in &self.functions {
            let Some(value) = function_filters.get(&spec.name) else {
                continue;
            };
            let (next, names) = (spec.callable)(value, queryset, caller)?;
            for name in names {
                if !next.has_annotation(&name) {
                    return Err(FilterError::MissingAnnotation {
                        function: spec.name.clone(),
                        annotation: name,
                    });
                }
                if !annotations.contains(&name) {
                    annotations.push(name);
                }
            }
            queryset = next;
        }

        Ok((queryset, annotations))
    }

    /// The whole pipeline: visibility, parameters, search, then function
    /// filters.
    pub fn resolve(
        &self,
        request: &FilterRequest,
        caller: Option<&Caller>,
    ) -> Result<(QuerySet, Vec<String>), FilterError> {
        let queryset = self.base_queryset(request.mode, caller);
        let queryset = self.apply_filters(&request.parameters, queryset);
        let queryset = self.search(request.search.as_deref(), queryset);
        let (queryset, annotations) =
            self.apply_function_filters(&request.function_filters, queryset, caller)?;

        debug!(
            set = %self.name,
            mode = %request.mode,
            anonymous = caller.is_none(),
            parameters = request.parameters.len(),
            annotations = ?annotations,
            "resolved filter set"
        );
        Ok((queryset, annotations))
    }
}

/// Builder for [`FilterSet`]; see [`FilterSet::builder`].
pub struct FilterSetBuilder {
    name: String,
    model: Model,
    item_kind: Option<ItemKind>,
    params: Vec<ParamSpec>,
    search_fields: Vec<String>,
    declared: Vec<(String, ParamKind)>,
    registered: Vec<(String, FunctionFilter)>,
    defaults: Vec<(String, FilterValue)>,
    block_rules: Vec<VisibilityRule>,
}

impl FilterSetBuilder {
    /// Override the kind used to match hides.
    pub fn item_kind(mut self, kind: Option<ItemKind>) -> Self {
        self.item_kind = kind;
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn search(mut self, fields: &[&str]) -> Self {
        self.search_fields
            .extend(fields.iter().map(|field| field.to_string()));
        self
    }

    /// Declare a function filter parameter.
    pub fn function_filter(mut self, name: &str, kind: ParamKind) -> Self {
        self.declared.push((name.to_string(), kind));
        self
    }

    /// Register the implementation of a declared function filter.
    pub fn function<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&FilterValue, QuerySet, Option<&Caller>) -> FunctionOutput + Send + Sync + 'static,
    {
        self.registered.push((name.to_string(), Arc::new(f)));
        self
    }

    /// Value used when the caller omits a function filter key.
    pub fn default_value(mut self, name: &str, value: impl Into<FilterValue>) -> Self {
        self.defaults.push((name.to_string(), value.into()));
        self
    }

    pub fn block_by(mut self, rule: VisibilityRule) -> Self {
        self.block_rules.push(rule);
        self
    }

    pub fn build(self) -> Result<FilterSet, ConfigError> {
        let set = self.name.clone();
        let mut seen = HashSet::new();
        for name in self
            .params
            .iter()
            .map(|p| &p.name)
            .chain(self.declared.iter().map(|(n, _)| n))
        {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateName {
                    set,
                    name: name.clone(),
                });
            }
        }

        let mut registered: HashMap<String, FunctionFilter> = HashMap::new();
        for (name, callable) in self.registered {
            if !self.declared.iter().any(|(declared, _)| *declared == name) {
                return Err(ConfigError::UndeclaredFunction { set, name });
            }
            if registered.insert(name.clone(), callable).is_some() {
                return Err(ConfigError::DuplicateName { set, name });
            }
        }

        for (name, _) in &self.defaults {
            if !self.declared.iter().any(|(declared, _)| declared == name) {
                return Err(ConfigError::UnknownDefault {
                    set,
                    name: name.clone(),
                });
            }
        }

        let mut functions = Vec::with_capacity(self.declared.len());
        for (name, kind) in self.declared {
            let Some(callable) = registered.remove(&name) else {
                return Err(ConfigError::UnregisteredFunction { set, name });
            };
            let default = self
                .defaults
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone());
            functions.push(FunctionSpec {
                name,
                kind,
                default,
                callable,
            });
        }

        Ok(FilterSet {
            name: self.name,
            model: self.model,
            item_kind: self.item_kind,
            params: self.params,
            search_fields: self.search_fields,
            functions,
            block_rules: self.block_rules,
        })
    }
}
