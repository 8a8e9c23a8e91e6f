//! Translation of query-string parameters into filter expressions.
//!
//! Every parameter that is not a control key names a field. Its value may start with an
//! operator character:
//!
//! | prefix | meaning                                   |
//! |--------|-------------------------------------------|
//! | none   | exact match                               |
//! | `>`    | lower bound, inclusive                    |
//! | `<`    | upper bound, exclusive                    |
//! | `~`    | substring (strings) or element (lists)    |
//!
//! Clauses are grouped per field. Within a field the bounds always intersect, and the
//! exact and contains clauses are joined with the `logic` combinator. Different fields
//! are always intersected.
//!
//! Datetime values accept an offset whose `+` was decoded to a space, so
//! `birth_date=>1980-06-30T10:00:00+01:00` works with or without percent-encoding.

use std::str::FromStr;

use bson::Bson;
use thiserror::Error;

use crate::{
    page::{DEFAULT_PAGE_SIZE, PaginationParams},
    query::{Expr, FieldOp, Query, Sort, SortDirection},
    schema::{FieldKind, ID_FIELD, ModelSchema},
};

pub const LOGIC_KEY: &str = "logic";
pub const SORT_BY_KEY: &str = "sort_by";
pub const SORT_ORDER_KEY: &str = "sort_order";
pub const PAGE_KEY: &str = "page";
pub const PAGE_SIZE_KEY: &str = "page_size";

/// Errors raised while translating query parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Invalid query: unknown field '{0}'")]
    UnknownField(String),
    #[error("Invalid query: '{value}' is not a valid {expected} for field '{field}'")]
    InvalidValue {
        field: String,
        value: String,
        expected: FieldKind,
    },
    #[error("Malformed request: invalid value '{value}' for '{param}'")]
    InvalidControl { param: String, value: String },
}

impl QueryError {
    /// True when the request itself is malformed, as opposed to naming something that does not exist.
    pub fn is_malformed(&self) -> bool {
        matches!(self, QueryError::InvalidControl { .. })
    }
}

/// Operator selected by the leading character of a query value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Exact,
    GreaterThan,
    LessThan,
    Contains,
}

impl QueryOperator {
    /// Splits the operator prefix off a raw value.
    pub fn split(raw: &str) -> (Self, &str) {
        let operator = match raw.chars().next() {
            Some('>') => QueryOperator::GreaterThan,
            Some('<') => QueryOperator::LessThan,
            Some('~') => QueryOperator::Contains,
            _ => return (QueryOperator::Exact, raw),
        };

        (operator, &raw[1..])
    }

    fn field_op(self) -> FieldOp {
        match self {
            QueryOperator::Exact => FieldOp::Eq,
            QueryOperator::GreaterThan => FieldOp::Gte,
            QueryOperator::LessThan => FieldOp::Lt,
            QueryOperator::Contains => FieldOp::Contains,
        }
    }

    fn is_bound(self) -> bool {
        matches!(self, QueryOperator::GreaterThan | QueryOperator::LessThan)
    }
}

/// Combinator joining the exact and contains clauses of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl FromStr for Logic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(Logic::And),
            "OR" => Ok(Logic::Or),
            _ => Err(()),
        }
    }
}

/// One `(field, operator, value)` predicate with its value already coerced.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: String,
    pub operator: QueryOperator,
    pub value: Bson,
}

impl Clause {
    fn to_expr(&self) -> Expr {
        Expr::field(self.field.clone(), self.operator.field_op(), self.value.clone())
    }
}

/// The translated form of a list request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListRequest {
    pub clauses: Vec<Clause>,
    pub logic: Logic,
    pub sort: Option<Sort>,
    pub page: Option<PaginationParams>,
}

impl ListRequest {
    /// Builds the filter expression, or `None` when no clause was given.
    pub fn filter(&self) -> Option<Expr> {
        let mut groups: Vec<(&str, Vec<&Clause>)> = Vec::new();

        for clause in &self.clauses {
            match groups.iter().position(|(field, _)| *field == clause.field) {
                Some(index) => groups[index].1.push(clause),
                None => groups.push((clause.field.as_str(), vec![clause])),
            }
        }

        let per_field = groups
            .into_iter()
            .filter_map(|(_, group)| self.field_expr(&group))
            .collect::<Vec<_>>();

        combine(per_field, Expr::And)
    }

    fn field_expr(&self, group: &[&Clause]) -> Option<Expr> {
        let (bounds, matches): (Vec<&Clause>, Vec<&Clause>) =
            group.iter().copied().partition(|clause| clause.operator.is_bound());

        let matches = matches.into_iter().map(Clause::to_expr).collect::<Vec<_>>();
        let matched = match self.logic {
            Logic::And => combine(matches, Expr::And),
            Logic::Or => combine(matches, Expr::Or),
        };

        let parts = bounds
            .into_iter()
            .map(Clause::to_expr)
            .chain(matched)
            .collect::<Vec<_>>();

        combine(parts, Expr::And)
    }

    /// Converts this request into a backend query, keeping sort and page window.
    pub fn to_query(&self) -> Query {
        let mut builder = Query::builder();

        if let Some(filter) = self.filter() {
            builder = builder.filter(filter);
        }

        if let Some(sort) = &self.sort {
            builder = builder.sort(sort.field.clone(), sort.direction);
        }

        if let Some(page) = self.page {
            builder = builder.offset(page.offset()).limit(page.limit());
        }

        builder.build()
    }
}

fn combine(mut exprs: Vec<Expr>, join: fn(Vec<Expr>) -> Expr) -> Option<Expr> {
    match exprs.len() {
        0 => None,
        1 => exprs.pop(),
        _ => Some(join(exprs)),
    }
}

/// Translates query-string pairs against a model schema.
///
/// # Example
///
/// ```ignore
/// let request = QueryTranslator::new(User::schema())
///     .translate([("sequence", ">20"), ("sequence", "<25"), ("sort_by", "sequence")])?;
/// ```
#[derive(Debug, Clone)]
pub struct QueryTranslator<'a> {
    schema: &'a ModelSchema,
    default_page_size: usize,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(schema: &'a ModelSchema) -> Self {
        Self { schema, default_page_size: DEFAULT_PAGE_SIZE }
    }

    /// Sets the page size used when only `page` is given.
    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size.max(1);
        self
    }

    pub fn translate<I, K, V>(&self, params: I) -> Result<ListRequest, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = ListRequest::default();
        let mut sort_by = None;
        let mut sort_order = None;
        let mut page = None;
        let mut page_size = None;

        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());

            match key {
                LOGIC_KEY => {
                    request.logic = value
                        .parse()
                        .map_err(|_| invalid_control(key, value))?;
                }
                SORT_BY_KEY => sort_by = Some(value.to_string()),
                SORT_ORDER_KEY => {
                    sort_order = Some(
                        value
                            .parse::<SortDirection>()
                            .map_err(|_| invalid_control(key, value))?,
                    );
                }
                PAGE_KEY => page = Some(positive(key, value)?),
                PAGE_SIZE_KEY => page_size = Some(positive(key, value)?),
                _ => request.clauses.push(self.clause(key, value)?),
            }
        }

        if let Some(field) = sort_by {
            if !self.is_known(&field) {
                return Err(QueryError::UnknownField(field));
            }

            request.sort = Some(Sort {
                field,
                direction: sort_order.unwrap_or_default(),
            });
        }

        if page.is_some() || page_size.is_some() {
            request.page = Some(PaginationParams::new(
                page.unwrap_or(1),
                page_size.unwrap_or(self.default_page_size),
            ));
        }

        Ok(request)
    }

    fn clause(&self, key: &str, raw: &str) -> Result<Clause, QueryError> {
        let field = self.schema.field(key);

        if field.is_none() && key != ID_FIELD {
            return Err(QueryError::UnknownField(key.to_string()));
        }

        let (operator, text) = QueryOperator::split(raw);
        let value = match (operator, field) {
            (QueryOperator::Contains, _) | (_, None) => Bson::String(text.to_string()),
            (_, Some(field)) => field
                .coerce_query(text)
                .ok_or_else(|| invalid_value(key, text, field.kind))?,
        };

        Ok(Clause { field: key.to_string(), operator, value })
    }

    fn is_known(&self, key: &str) -> bool {
        key == ID_FIELD || self.schema.field(key).is_some()
    }
}

fn positive(param: &str, value: &str) -> Result<usize, QueryError> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| invalid_control(param, value))
}

fn invalid_control(param: &str, value: &str) -> QueryError {
    QueryError::InvalidControl {
        param: param.to_string(),
        value: value.to_string(),
    }
}

fn invalid_value(field: &str, value: &str, expected: FieldKind) -> QueryError {
    QueryError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        query::Filter,
        schema::FieldDescriptor,
        value::{parse_datetime, to_bson_datetime},
    };

    fn schema() -> ModelSchema {
        ModelSchema::builder("User", "users")
            .field(FieldDescriptor::new("name", FieldKind::String).not_empty())
            .field(FieldDescriptor::new("roles", FieldKind::StringList))
            .field(FieldDescriptor::new("birth_date", FieldKind::DateTime))
            .field(FieldDescriptor::new("locked", FieldKind::Boolean))
            .field(FieldDescriptor::new("sequence", FieldKind::Integer))
            .build()
    }

    fn translate(params: &[(&str, &str)]) -> Result<ListRequest, QueryError> {
        let schema = schema();
        QueryTranslator::new(&schema).translate(params.iter().copied())
    }

    #[test]
    fn operator_prefixes_are_parsed() {
        assert_eq!(QueryOperator::split(">5"), (QueryOperator::GreaterThan, "5"));
        assert_eq!(QueryOperator::split("<5"), (QueryOperator::LessThan, "5"));
        assert_eq!(QueryOperator::split("~ali"), (QueryOperator::Contains, "ali"));
        assert_eq!(QueryOperator::split("alice"), (QueryOperator::Exact, "alice"));
        assert_eq!(QueryOperator::split(""), (QueryOperator::Exact, ""));
    }

    #[test]
    fn empty_query_has_no_filter() {
        let request = translate(&[]).unwrap();

        assert_eq!(request.filter(), None);
        assert_eq!(request.sort, None);
        assert_eq!(request.page, None);
    }

    #[test]
    fn single_exact_clause() {
        let request = translate(&[("name", "Alice")]).unwrap();

        assert_eq!(request.filter(), Some(Filter::eq("name", "Alice")));
    }

    #[test]
    fn values_are_coerced_by_field_kind() {
        let request = translate(&[("locked", "True"), ("sequence", ">20")]).unwrap();

        assert_eq!(
            request.filter(),
            Some(Filter::and(vec![
                Filter::eq("locked", true),
                Filter::gte("sequence", 20_i64),
            ]))
        );
    }

    #[test]
    fn range_bounds_intersect_even_under_or() {
        let request = translate(&[("sequence", ">20"), ("sequence", "<25"), ("logic", "or")]).unwrap();

        assert_eq!(
            request.filter(),
            Some(Filter::and(vec![
                Filter::gte("sequence", 20_i64),
                Filter::lt("sequence", 25_i64),
            ]))
        );
    }

    #[test]
    fn same_field_matches_follow_logic() {
        let request = translate(&[("name", "~Ali"), ("name", "~Bo"), ("logic", "OR")]).unwrap();

        assert_eq!(
            request.filter(),
            Some(Filter::or(vec![
                Filter::contains("name", "Ali"),
                Filter::contains("name", "Bo"),
            ]))
        );
    }

    #[test]
    fn different_fields_always_intersect() {
        let request = translate(&[("name", "Alice"), ("locked", "false"), ("logic", "OR")]).unwrap();

        assert_eq!(
            request.filter(),
            Some(Filter::and(vec![
                Filter::eq("name", "Alice"),
                Filter::eq("locked", false),
            ]))
        );
    }

    #[test]
    fn bounds_and_matches_on_one_field_combine() {
        let request = translate(&[
            ("sequence", "3"),
            ("sequence", ">1"),
            ("sequence", "4"),
            ("logic", "or"),
        ])
        .unwrap();

        assert_eq!(
            request.filter(),
            Some(Filter::and(vec![
                Filter::gte("sequence", 1_i64),
                Filter::or(vec![Filter::eq("sequence", 3_i64), Filter::eq("sequence", 4_i64)]),
            ]))
        );
    }

    #[test]
    fn datetime_bounds_parse_iso_dates() {
        let request = translate(&[("birth_date", ">1980-03-01"), ("birth_date", "<1980-05-30")]).unwrap();
        let lower = to_bson_datetime(&parse_datetime("1980-03-01").unwrap());
        let upper = to_bson_datetime(&parse_datetime("1980-05-30").unwrap());

        assert_eq!(
            request.filter(),
            Some(Filter::and(vec![
                Filter::gte("birth_date", lower),
                Filter::lt("birth_date", upper),
            ]))
        );
    }

    #[test]
    fn datetime_offset_survives_form_decoding() {
        let encoded = translate(&[("birth_date", ">1980-06-30T10:00:00+01:00")]).unwrap();
        let decoded = translate(&[("birth_date", ">1980-06-30T10:00:00 01:00")]).unwrap();
        let expected = to_bson_datetime(&parse_datetime("1980-06-30T09:00:00Z").unwrap());

        assert_eq!(encoded.filter(), Some(Filter::gte("birth_date", expected)));
        assert_eq!(decoded.filter(), encoded.filter());
    }

    #[test]
    fn contains_keeps_raw_text() {
        let request = translate(&[("sequence", "~12")]).unwrap();

        assert_eq!(request.filter(), Some(Filter::contains("sequence", "12")));
    }

    #[test]
    fn id_is_filterable() {
        let request = translate(&[("id", "abc")]).unwrap();

        assert_eq!(request.filter(), Some(Filter::eq("id", "abc")));
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert_eq!(
            translate(&[("nickname", "bob")]),
            Err(QueryError::UnknownField("nickname".into()))
        );
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        assert_eq!(
            translate(&[("sort_by", "nickname")]),
            Err(QueryError::UnknownField("nickname".into()))
        );
    }

    #[test]
    fn unparseable_values_are_invalid() {
        for params in [
            [("sequence", "twelve")],
            [("locked", "maybe")],
            [("birth_date", ">someday")],
        ] {
            let err = translate(&params).unwrap_err();
            assert!(matches!(err, QueryError::InvalidValue { .. }), "{params:?}");
            assert!(!err.is_malformed());
        }
    }

    #[test]
    fn malformed_controls_are_flagged() {
        for params in [
            [("logic", "XOR")],
            [("sort_order", "up")],
            [("page", "0")],
            [("page_size", "-1")],
            [("page", "one")],
        ] {
            let err = translate(&params).unwrap_err();
            assert!(err.is_malformed(), "{params:?}");
        }
    }

    #[test]
    fn sort_defaults_to_ascending() {
        let request = translate(&[("sort_by", "sequence")]).unwrap();

        assert_eq!(
            request.sort,
            Some(Sort { field: "sequence".into(), direction: SortDirection::Asc })
        );
    }

    #[test]
    fn sort_order_without_sort_by_is_ignored() {
        let request = translate(&[("sort_order", "DESC")]).unwrap();

        assert_eq!(request.sort, None);
    }

    #[test]
    fn page_parts_default_independently() {
        let only_page = translate(&[("page", "3")]).unwrap();
        let only_size = translate(&[("page_size", "5")]).unwrap();

        assert_eq!(only_page.page, Some(PaginationParams::new(3, 10)));
        assert_eq!(only_size.page, Some(PaginationParams::new(1, 5)));
    }

    #[test]
    fn configured_default_page_size_applies() {
        let schema = schema();
        let request = QueryTranslator::new(&schema)
            .with_default_page_size(25)
            .translate([("page", "2")])
            .unwrap();

        assert_eq!(request.page, Some(PaginationParams::new(2, 25)));
    }

    #[test]
    fn query_carries_page_window_and_sort() {
        let request = translate(&[
            ("sort_by", "sequence"),
            ("sort_order", "desc"),
            ("page", "3"),
            ("page_size", "5"),
        ])
        .unwrap();
        let query = request.to_query();

        assert_eq!(query.offset, Some(10));
        assert_eq!(query.limit, Some(5));
        assert_eq!(
            query.sort,
            Some(Sort { field: "sequence".into(), direction: SortDirection::Desc })
        );
        assert_eq!(query.filter, None);
    }
}
