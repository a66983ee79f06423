// Query-string to SQL translation for list endpoints.
// Supports filtering (equality plus gte/gt/lte/lt suffixes), multi-column
// sorting with a '-' prefix for descending, field limiting, and pagination.
// Column names always come from the whitelist; values are always bound.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Keys that are consumed by sorting/pagination/projection, not filtering.
const RESERVED_KEYS: [&str; 4] = ["sort", "fields", "page", "limit"];

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

fn key_op_regex() -> &'static Regex {
    static KEY_OP: OnceLock<Regex> = OnceLock::new();
    KEY_OP.get_or_init(|| Regex::new(r"^([a-z_]+)\[(gte|gt|lte|lt)\]$").expect("static regex"))
}

/// How a whitelisted column is typed in SQL, which decides how a bound
/// text parameter is compared against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Compared after CAST($n AS DOUBLE PRECISION)
    Numeric,
    /// Case-insensitive equality via ILIKE
    Text,
    /// Postgres enum compared through its text representation
    Enum,
}

/// A column clients may filter or sort on.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One parsed filter term, e.g. `price[gte]=500`.
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: Column,
    pub op: FilterOp,
    pub value: String,
}

/// Validated, normalized query options for a list endpoint.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub filters: Vec<Filter>,
    pub sort: Vec<(&'static str, SortOrder)>,
    pub fields: Option<Vec<String>>,
    pub page: u32,
    pub limit: u32,
}

/// Query-string validation error
#[derive(Debug)]
pub struct QueryError {
    pub message: String,
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for QueryError {}

impl QueryError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Column whitelist for one queryable table.
pub struct QuerySchema {
    filterable: &'static [Column],
    sortable: &'static [&'static str],
    selectable: &'static [&'static str],
}

impl QuerySchema {
    pub const fn new(
        filterable: &'static [Column],
        sortable: &'static [&'static str],
        selectable: &'static [&'static str],
    ) -> Self {
        Self {
            filterable,
            sortable,
            selectable,
        }
    }

    fn filter_column(&self, name: &str) -> Option<Column> {
        self.filterable.iter().copied().find(|c| c.name == name)
    }

    /// Parse and validate a raw query-string map into QueryOptions.
    pub fn parse(&self, raw: &HashMap<String, String>) -> Result<QueryOptions, QueryError> {
        let mut filters = Vec::new();

        for (key, value) in raw {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }

            let (column_name, op) = match key_op_regex().captures(key) {
                Some(caps) => {
                    let op = match &caps[2] {
                        "gte" => FilterOp::Gte,
                        "gt" => FilterOp::Gt,
                        "lte" => FilterOp::Lte,
                        "lt" => FilterOp::Lt,
                        _ => unreachable!("regex only matches known operators"),
                    };
                    (caps[1].to_string(), op)
                }
                None => (key.clone(), FilterOp::Eq),
            };

            let column = self
                .filter_column(&column_name)
                .ok_or_else(|| QueryError::new(format!("Unknown filter field '{}'", column_name)))?;

            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(QueryError::new(format!(
                    "Empty value for filter field '{}'",
                    column_name
                )));
            }

            match column.kind {
                ColumnKind::Numeric => {
                    let parsed: f64 = value.parse().map_err(|_| {
                        QueryError::new(format!(
                            "Filter value for '{}' must be a number",
                            column_name
                        ))
                    })?;
                    if !parsed.is_finite() {
                        return Err(QueryError::new(format!(
                            "Filter value for '{}' must be a finite number",
                            column_name
                        )));
                    }
                }
                ColumnKind::Text | ColumnKind::Enum => {
                    if op != FilterOp::Eq {
                        return Err(QueryError::new(format!(
                            "Comparison operators are not supported on '{}'",
                            column_name
                        )));
                    }
                }
            }

            filters.push(Filter { column, op, value });
        }

        // Stable clause order regardless of HashMap iteration
        filters.sort_by(|a, b| (a.column.name, a.op.sql()).cmp(&(b.column.name, b.op.sql())));

        let sort = match raw.get("sort") {
            Some(spec) => self.parse_sort(spec)?,
            None => vec![("created_at", SortOrder::Desc)],
        };

        let fields = match raw.get("fields") {
            Some(spec) => Some(self.parse_fields(spec)?),
            None => None,
        };

        let page = parse_positive(raw.get("page"), "page", DEFAULT_PAGE)?;
        let limit = parse_positive(raw.get("limit"), "limit", DEFAULT_LIMIT)?;
        if limit > MAX_LIMIT {
            return Err(QueryError::new(format!(
                "limit must not exceed {}",
                MAX_LIMIT
            )));
        }

        Ok(QueryOptions {
            filters,
            sort,
            fields,
            page,
            limit,
        })
    }

    fn parse_sort(&self, spec: &str) -> Result<Vec<(&'static str, SortOrder)>, QueryError> {
        let mut sort = Vec::new();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, order) = match part.strip_prefix('-') {
                Some(rest) => (rest, SortOrder::Desc),
                None => (part, SortOrder::Asc),
            };
            let column = self
                .sortable
                .iter()
                .find(|c| **c == name)
                .ok_or_else(|| QueryError::new(format!("Cannot sort by '{}'", name)))?;
            sort.push((*column, order));
        }
        if sort.is_empty() {
            return Err(QueryError::new("Empty sort specification"));
        }
        Ok(sort)
    }

    fn parse_fields(&self, spec: &str) -> Result<Vec<String>, QueryError> {
        let mut fields = Vec::new();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if !self.selectable.contains(&part) {
                return Err(QueryError::new(format!("Unknown field '{}'", part)));
            }
            fields.push(part.to_string());
        }
        if fields.is_empty() {
            return Err(QueryError::new("Empty fields specification"));
        }
        Ok(fields)
    }
}

fn parse_positive(
    raw: Option<&String>,
    param_name: &str,
    default: u32,
) -> Result<u32, QueryError> {
    match raw {
        None => Ok(default),
        Some(s) => {
            let value: u32 = s
                .trim()
                .parse()
                .map_err(|_| QueryError::new(format!("{} must be a positive number", param_name)))?;
            if value == 0 {
                return Err(QueryError::new(format!(
                    "{} must be a positive number (greater than 0)",
                    param_name
                )));
            }
            Ok(value)
        }
    }
}

/// Builds a parameterized SELECT from validated QueryOptions.
/// Filter values are bound as text and cast in SQL; column names only ever
/// come from the whitelist above.
pub struct SqlQueryBuilder {
    select_list: &'static str,
    table: &'static str,
    base_clauses: Vec<String>,
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_clause: Option<String>,
    limit: u32,
    offset: u64,
}

impl SqlQueryBuilder {
    pub fn new(select_list: &'static str, table: &'static str) -> Self {
        Self {
            select_list,
            table,
            base_clauses: Vec::new(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_clause: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// A fixed, non-parameterized clause (e.g. hiding secret tours).
    pub fn add_base_clause(&mut self, clause: &str) {
        self.base_clauses.push(clause.to_string());
    }

    pub fn apply(&mut self, options: &QueryOptions) {
        for filter in &options.filters {
            self.add_filter(filter);
        }
        self.set_sort(&options.sort);
        self.set_pagination(options.page, options.limit);
    }

    fn add_filter(&mut self, filter: &Filter) {
        let param_index = self.params.len() + 1;
        let clause = match filter.column.kind {
            ColumnKind::Numeric => format!(
                "{} {} CAST(${} AS DOUBLE PRECISION)",
                filter.column.name,
                filter.op.sql(),
                param_index
            ),
            ColumnKind::Text => format!("{} ILIKE ${}", filter.column.name, param_index),
            ColumnKind::Enum => format!("{}::text = ${}", filter.column.name, param_index),
        };
        self.where_clauses.push(clause);
        self.params.push(match filter.column.kind {
            ColumnKind::Enum => filter.value.to_lowercase(),
            _ => filter.value.clone(),
        });
    }

    fn set_sort(&mut self, sort: &[(&'static str, SortOrder)]) {
        if sort.is_empty() {
            return;
        }
        let spec = sort
            .iter()
            .map(|(column, order)| {
                let dir = match order {
                    SortOrder::Asc => "ASC",
                    SortOrder::Desc => "DESC",
                };
                format!("{} {}", column, dir)
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.order_clause = Some(spec);
    }

    fn set_pagination(&mut self, page: u32, limit: u32) {
        self.limit = limit;
        // 64-bit math: page and limit are both client-supplied u32s
        self.offset = u64::from(page - 1) * u64::from(limit);
    }

    /// Returns (query_string, bound_parameters).
    pub fn build(&self) -> (String, Vec<String>) {
        let mut query = format!("SELECT {} FROM {}", self.select_list, self.table);

        let all_clauses: Vec<&String> = self
            .base_clauses
            .iter()
            .chain(self.where_clauses.iter())
            .collect();
        if !all_clauses.is_empty() {
            query.push_str(" WHERE ");
            let joined = all_clauses
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(" AND ");
            query.push_str(&joined);
        }

        if let Some(ref order) = self.order_clause {
            query.push_str(" ORDER BY ");
            query.push_str(order);
        }

        // LIMIT/OFFSET are integers under our control, not client text
        query.push_str(&format!(" LIMIT {}", self.limit));
        query.push_str(&format!(" OFFSET {}", self.offset));

        (query, self.params.clone())
    }
}

/// Drop all keys not named in `fields` from a serialized object (or from
/// every element of a serialized array). Field limiting happens after the
/// typed row is fetched, so SELECT lists stay static.
pub fn project_fields(value: serde_json::Value, fields: &[String]) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(k, _)| fields.iter().any(|f| f == k))
                .collect(),
        ),
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items
                .into_iter()
                .map(|item| project_fields(item, fields))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FILTERABLE: &[Column] = &[
        Column {
            name: "name",
            kind: ColumnKind::Text,
        },
        Column {
            name: "difficulty",
            kind: ColumnKind::Enum,
        },
        Column {
            name: "price",
            kind: ColumnKind::Numeric,
        },
        Column {
            name: "duration",
            kind: ColumnKind::Numeric,
        },
    ];
    const SORTABLE: &[&str] = &["price", "ratings_average", "created_at"];
    const SELECTABLE: &[&str] = &["name", "price", "difficulty", "summary"];

    fn schema() -> QuerySchema {
        QuerySchema::new(FILTERABLE, SORTABLE, SELECTABLE)
    }

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_defaults() {
        let options = schema().parse(&raw(&[])).unwrap();
        assert!(options.filters.is_empty());
        assert_eq!(options.sort, vec![("created_at", SortOrder::Desc)]);
        assert_eq!(options.fields, None);
        assert_eq!(options.page, DEFAULT_PAGE);
        assert_eq!(options.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_parse_comparison_operator() {
        let options = schema().parse(&raw(&[("price[gte]", "500")])).unwrap();
        assert_eq!(options.filters.len(), 1);
        assert_eq!(options.filters[0].column.name, "price");
        assert_eq!(options.filters[0].op, FilterOp::Gte);
        assert_eq!(options.filters[0].value, "500");
    }

    #[test]
    fn test_parse_equality_filter() {
        let options = schema().parse(&raw(&[("difficulty", "Easy")])).unwrap();
        assert_eq!(options.filters[0].op, FilterOp::Eq);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(schema().parse(&raw(&[("password_hash", "x")])).is_err());
        assert!(schema().parse(&raw(&[("price; DROP TABLE tours", "1")])).is_err());
    }

    #[test]
    fn test_non_numeric_value_on_numeric_column_is_rejected() {
        assert!(schema().parse(&raw(&[("price[gte]", "abc")])).is_err());
        assert!(schema().parse(&raw(&[("price", "NaN")])).is_err());
    }

    #[test]
    fn test_comparison_on_text_column_is_rejected() {
        assert!(schema().parse(&raw(&[("name[gte]", "a")])).is_err());
    }

    #[test]
    fn test_parse_sort_with_descending_prefix() {
        let options = schema()
            .parse(&raw(&[("sort", "-ratings_average,price")]))
            .unwrap();
        assert_eq!(
            options.sort,
            vec![("ratings_average", SortOrder::Desc), ("price", SortOrder::Asc)]
        );
    }

    #[test]
    fn test_sort_by_unknown_column_is_rejected() {
        assert!(schema().parse(&raw(&[("sort", "password_hash")])).is_err());
    }

    #[test]
    fn test_parse_fields() {
        let options = schema().parse(&raw(&[("fields", "name,price")])).unwrap();
        assert_eq!(
            options.fields,
            Some(vec!["name".to_string(), "price".to_string()])
        );
        assert!(schema().parse(&raw(&[("fields", "name,id")])).is_err());
    }

    #[test]
    fn test_pagination_validation() {
        let options = schema()
            .parse(&raw(&[("page", "3"), ("limit", "20")]))
            .unwrap();
        assert_eq!(options.page, 3);
        assert_eq!(options.limit, 20);

        assert!(schema().parse(&raw(&[("page", "0")])).is_err());
        assert!(schema().parse(&raw(&[("limit", "-1")])).is_err());
        assert!(schema().parse(&raw(&[("limit", "ten")])).is_err());
    }

    #[test]
    fn test_limit_is_capped() {
        assert_eq!(
            schema()
                .parse(&raw(&[("limit", "1000")]))
                .unwrap()
                .limit,
            MAX_LIMIT
        );
        assert!(schema().parse(&raw(&[("limit", "1001")])).is_err());
    }

    #[test]
    fn test_large_page_offset_does_not_overflow() {
        let options = schema()
            .parse(&raw(&[("page", "4294967295"), ("limit", "1000")]))
            .unwrap();
        let mut builder = SqlQueryBuilder::new("*", "tours");
        builder.apply(&options);
        let (query, _) = builder.build();
        assert!(query.contains("OFFSET 4294967294000"));
    }

    #[test]
    fn test_builder_basic_query() {
        let builder = SqlQueryBuilder::new("*", "tours");
        let (query, params) = builder.build();
        assert!(query.starts_with("SELECT * FROM tours"));
        assert!(query.contains("LIMIT 100"));
        assert!(query.contains("OFFSET 0"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_builder_applies_filters_sort_and_pagination() {
        let options = schema()
            .parse(&raw(&[
                ("price[gte]", "500"),
                ("price[lt]", "2000"),
                ("difficulty", "easy"),
                ("sort", "-price"),
                ("page", "2"),
                ("limit", "10"),
            ]))
            .unwrap();

        let mut builder = SqlQueryBuilder::new("*", "tours");
        builder.add_base_clause("secret = FALSE");
        builder.apply(&options);
        let (query, params) = builder.build();

        assert!(query.contains("WHERE secret = FALSE AND "));
        assert!(query.contains("difficulty::text = $1"));
        assert!(query.contains("price < CAST($2 AS DOUBLE PRECISION)"));
        assert!(query.contains("price >= CAST($3 AS DOUBLE PRECISION)"));
        assert!(query.contains("ORDER BY price DESC"));
        assert!(query.contains("LIMIT 10"));
        assert!(query.contains("OFFSET 10"));
        assert_eq!(params, vec!["easy", "2000", "500"]);
    }

    #[test]
    fn test_builder_clause_order_is_stable() {
        // Same input map must always produce the same SQL text
        let input = raw(&[("price[gte]", "1"), ("duration[lte]", "9"), ("name", "x")]);
        let options_a = schema().parse(&input).unwrap();
        let options_b = schema().parse(&input).unwrap();

        let mut builder_a = SqlQueryBuilder::new("*", "tours");
        builder_a.apply(&options_a);
        let mut builder_b = SqlQueryBuilder::new("*", "tours");
        builder_b.apply(&options_b);

        assert_eq!(builder_a.build().0, builder_b.build().0);
    }

    #[test]
    fn test_project_fields_on_object_and_array() {
        let fields = vec!["name".to_string(), "price".to_string()];
        let value = json!([
            {"name": "Forest Hiker", "price": 497.0, "secret": false},
            {"name": "Sea Explorer", "price": 397.0, "secret": true}
        ]);
        let projected = project_fields(value, &fields);
        assert_eq!(
            projected,
            json!([
                {"name": "Forest Hiker", "price": 497.0},
                {"name": "Sea Explorer", "price": 397.0}
            ])
        );
    }

    proptest::proptest! {
        #[test]
        fn prop_numeric_filters_build_bound_clauses(value in 0.0f64..100000.0) {
            let options = schema()
                .parse(&raw(&[("price[lte]", &value.to_string())]))
                .unwrap();
            let mut builder = SqlQueryBuilder::new("*", "tours");
            builder.apply(&options);
            let (query, params) = builder.build();
            // Value travels through the bound params, never the SQL text
            proptest::prop_assert!(query.contains("price <= CAST($1 AS DOUBLE PRECISION)"));
            proptest::prop_assert_eq!(params, vec![value.to_string()]);
        }

        #[test]
        fn prop_unknown_keys_never_parse(key in "[a-z_]{1,12}") {
            let known: Vec<&str> = FILTERABLE.iter().map(|c| c.name).collect();
            proptest::prop_assume!(!known.contains(&key.as_str()));
            proptest::prop_assume!(!RESERVED_KEYS.contains(&key.as_str()));
            proptest::prop_assert!(schema().parse(&raw(&[(&key, "1")])).is_err());
        }
    }
}
