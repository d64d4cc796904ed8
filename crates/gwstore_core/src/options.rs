//! Options for read, delete, and list calls.

use crate::error::{StoreError, StoreResult};
use crate::object::ObjectType;
use gwstore_filter::{compile_filter, Filter};

/// Default 1-based page number.
pub const DEFAULT_PAGE: usize = 1;
/// Default page size.
pub const DEFAULT_PAGE_SIZE: usize = 100;
/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Restricts a listing to objects referencing one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListScope {
    /// Type of the referenced resource.
    pub object_type: ObjectType,
    /// ID of the referenced resource.
    pub id: String,
}

/// Validated list parameters. Build with [`ListOpts::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct ListOpts {
    page: usize,
    page_size: usize,
    scope: Option<ListScope>,
    filter: Option<Filter>,
}

impl Default for ListOpts {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            scope: None,
            filter: None,
        }
    }
}

impl ListOpts {
    /// Starts building list options.
    #[must_use]
    pub fn builder() -> ListOptsBuilder {
        ListOptsBuilder::default()
    }

    /// The 1-based page number.
    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    /// The page size, within `[1, MAX_PAGE_SIZE]`.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The reference scope, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&ListScope> {
        self.scope.as_ref()
    }

    /// The compiled tag filter, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Returns the page following this one when `total_count` entries exist
    /// beyond what this page and the ones before it hold.
    #[must_use]
    pub fn next_page(&self, total_count: usize) -> Option<usize> {
        let seen = self.page.saturating_mul(self.page_size);
        (seen < total_count).then_some(self.page + 1)
    }
}

/// Builder for [`ListOpts`].
///
/// ```rust
/// use gwstore_core::{ListOpts, ObjectType};
///
/// let opts = ListOpts::builder()
///     .page(2)
///     .page_size(50)
///     .with_filter_expr(r#""prod" in tags"#)
///     .build()
///     .unwrap();
/// assert_eq!(opts.page(), 2);
///
/// let err = ListOpts::builder()
///     .list_for(ObjectType::Service, "42")
///     .with_filter_expr(r#""prod" in tags"#)
///     .build()
///     .unwrap_err();
/// assert!(err.to_string().starts_with("listing results with a pagination filter"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ListOptsBuilder {
    page: Option<usize>,
    page_size: Option<usize>,
    scope: Option<ListScope>,
    filter: Option<Filter>,
    filter_expr: Option<String>,
}

impl ListOptsBuilder {
    /// Sets the 1-based page number; 0 means the default.
    #[must_use]
    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the page size; 0 means the default.
    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Lists only objects referencing `object_type/id` through a foreign
    /// index.
    #[must_use]
    pub fn list_for(mut self, object_type: ObjectType, id: impl Into<String>) -> Self {
        self.scope = Some(ListScope {
            object_type,
            id: id.into(),
        });
        self
    }

    /// Keeps only objects whose tags satisfy `filter`. Replaces any
    /// expression set earlier.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self.filter_expr = None;
        self
    }

    /// Like [`ListOptsBuilder::with_filter`], compiling `expression` when
    /// the options are built. Replaces any filter set earlier.
    #[must_use]
    pub fn with_filter_expr(mut self, expression: impl Into<String>) -> Self {
        self.filter_expr = Some(expression.into());
        self.filter = None;
        self
    }

    /// Validates and builds the options.
    ///
    /// # Errors
    ///
    /// Returns a client error if the page size is out of range, the filter
    /// expression does not compile, or a scope and a filter are combined. An
    /// over-long expression is a validation error on the `filter` field.
    pub fn build(self) -> StoreResult<ListOpts> {
        let page = match self.page {
            None | Some(0) => DEFAULT_PAGE,
            Some(page) => page,
        };
        let page_size = match self.page_size {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(size) if size > MAX_PAGE_SIZE => {
                return Err(StoreError::client(format!(
                    "invalid page_size '{size}', must be within range [1 - {MAX_PAGE_SIZE}]"
                )));
            }
            Some(size) => size,
        };

        let filter = match (self.filter, self.filter_expr) {
            (Some(filter), _) => Some(filter),
            (None, Some(expression)) => Some(compile_filter(&expression)?),
            (None, None) => None,
        };

        if let (Some(scope), Some(_)) = (&self.scope, &filter) {
            return Err(StoreError::client(format!(
                "listing results with a pagination filter is currently unsupported when \
                 results are scoped to the \"{}\" (ID: \"{}\") resource",
                scope.object_type, scope.id
            )));
        }

        Ok(ListOpts {
            page,
            page_size,
            scope: self.scope,
            filter,
        })
    }
}

/// Selects the object a read resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOpts {
    id: Option<String>,
    index: Option<(String, String)>,
    id_fallback: bool,
}

impl ReadOpts {
    /// Reads by ID.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Reads through the unique index `name` holding `value`.
    pub fn by_index(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            index: Some((name.into(), value.into())),
            ..Self::default()
        }
    }

    /// Reads through the `name` index.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self::by_index("name", name)
    }

    /// Reads through the `name` index, falling back to treating `value` as
    /// an ID when no object has that name.
    pub fn by_name_or_id(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            id: Some(value.clone()),
            index: Some(("name".to_string(), value)),
            id_fallback: true,
        }
    }

    /// Returns the ID to read, if set.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Returns the index name and value to read through, if set.
    #[must_use]
    pub fn index(&self) -> Option<(&str, &str)> {
        self.index
            .as_ref()
            .filter(|(name, value)| !name.is_empty() && !value.is_empty())
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns true if a missed index lookup should retry by ID.
    #[must_use]
    pub fn falls_back_to_id(&self) -> bool {
        self.id_fallback
    }

    /// Fails unless an ID or an index lookup is set.
    ///
    /// # Errors
    ///
    /// Returns the client error `id or index required`.
    pub fn check(&self) -> StoreResult<()> {
        if self.id().is_none() && self.index().is_none() {
            return Err(StoreError::client("id or index required"));
        }
        Ok(())
    }
}

/// Identifies the object a delete removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOpts {
    object_type: ObjectType,
    id: String,
}

impl DeleteOpts {
    /// Deletes `object_type/id`.
    pub fn new(object_type: ObjectType, id: impl Into<String>) -> Self {
        Self {
            object_type,
            id: id.into(),
        }
    }

    /// The type of the object to delete.
    #[must_use]
    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// The ID of the object to delete.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fails if the ID is empty.
    ///
    /// # Errors
    ///
    /// Returns the client error `id required`.
    pub fn check(&self) -> StoreResult<()> {
        if self.id.is_empty() {
            return Err(StoreError::client("id required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = ListOpts::builder().build().unwrap();
        assert_eq!(opts.page(), 1);
        assert_eq!(opts.page_size(), 100);
        assert!(opts.scope().is_none());
        assert!(opts.filter().is_none());
        assert_eq!(opts, ListOpts::default());
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let opts = ListOpts::builder().page(0).page_size(0).build().unwrap();
        assert_eq!(opts.page(), DEFAULT_PAGE);
        assert_eq!(opts.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn page_size_bounds() {
        assert_eq!(
            ListOpts::builder().page_size(1000).build().unwrap().page_size(),
            1000
        );
        let err = ListOpts::builder().page_size(1001).build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid page_size '1001', must be within range [1 - 1000]"
        );
    }

    #[test]
    fn scope_and_filter_are_exclusive() {
        let err = ListOpts::builder()
            .list_for(ObjectType::Service, "s1")
            .with_filter_expr(r#""a" in tags"#)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::client(
                "listing results with a pagination filter is currently unsupported when \
                 results are scoped to the \"service\" (ID: \"s1\") resource"
            )
        );
    }

    #[test]
    fn precompiled_filter_is_also_exclusive() {
        let filter = compile_filter(r#""a" in tags"#).unwrap();
        let err = ListOpts::builder()
            .with_filter(filter)
            .list_for(ObjectType::Upstream, "u1")
            .build()
            .unwrap_err();
        assert!(matches!(err, StoreError::Client { .. }));
    }

    #[test]
    fn bad_filter_is_client_error() {
        let err = ListOpts::builder()
            .with_filter_expr("tags[0]")
            .build()
            .unwrap_err();
        assert_eq!(err, StoreError::client("undeclared reference to '_[_]'"));
    }

    #[test]
    fn last_filter_setter_wins() {
        let compiled = compile_filter(r#""a" in tags"#).unwrap();
        let opts = ListOpts::builder()
            .with_filter(compiled.clone())
            .with_filter_expr(r#""b" in tags"#)
            .build()
            .unwrap();
        assert_eq!(opts.filter().unwrap().expression(), r#""b" in tags"#);

        let opts = ListOpts::builder()
            .with_filter_expr("not even parsed (")
            .with_filter(compiled)
            .build()
            .unwrap();
        assert_eq!(opts.filter().unwrap().expression(), r#""a" in tags"#);
    }

    #[test]
    fn next_page_only_when_more_remain() {
        let opts = ListOpts::builder().page(1).page_size(10).build().unwrap();
        assert_eq!(opts.next_page(25), Some(2));
        assert_eq!(opts.next_page(10), None);
        assert_eq!(opts.next_page(0), None);
        let last = ListOpts::builder().page(3).page_size(10).build().unwrap();
        assert_eq!(last.next_page(25), None);
    }

    #[test]
    fn read_opts_require_a_selector() {
        assert_eq!(
            ReadOpts::default().check(),
            Err(StoreError::client("id or index required"))
        );
        assert!(ReadOpts::by_id("").check().is_err());
        assert!(ReadOpts::by_id("x").check().is_ok());
        assert!(ReadOpts::by_name("web").check().is_ok());
    }

    #[test]
    fn name_or_id_sets_both() {
        let opts = ReadOpts::by_name_or_id("web");
        assert_eq!(opts.index(), Some(("name", "web")));
        assert_eq!(opts.id(), Some("web"));
        assert!(opts.falls_back_to_id());
    }

    #[test]
    fn delete_requires_id() {
        assert!(DeleteOpts::new(ObjectType::Route, "").check().is_err());
        assert!(DeleteOpts::new(ObjectType::Route, "r1").check().is_ok());
    }
}
