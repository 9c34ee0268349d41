//! Query state: the single path from live UI state to the descriptor
//! handed to the pagination manager, plus the client-side evaluation
//! used by legacy mode.
//!
//! Search, filtering, sorting and the bookmark toggle all flow through
//! [`build_query`]; there is no separate "search mode" code path for
//! server-backed loading.

use crate::config::ListSettings;
use crate::record::Record;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Sort direction for a sortable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    None,
    Asc,
    Desc,
}

impl SortOrder {
    /// Next state for a repeated click on the same sort header.
    pub fn cycled(self) -> Self {
        match self {
            SortOrder::None => SortOrder::Asc,
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::None,
        }
    }

    pub fn is_active(self) -> bool {
        self != SortOrder::None
    }
}

/// Free-text search over a set of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub value: String,
    pub fields: Vec<String>,
}

/// Active filter selections grouped by field.
///
/// Ordered collections keep the serialized form stable no matter the
/// order the controls were toggled in, so two functionally identical
/// selections always produce the same cache key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FilterQuery {
    pub filters: BTreeMap<String, BTreeSet<String>>,
}

impl FilterQuery {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Add one selected value for a field.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.filters
            .entry(field.into())
            .or_default()
            .insert(value.into());
    }
}

/// Sort by a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortQuery {
    pub field: String,
    pub order: SortOrder,
}

/// Everything that determines result membership and order for one load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct QueryDescriptor {
    pub search: Option<SearchQuery>,
    pub filter: Option<FilterQuery>,
    pub sort: Option<SortQuery>,
    pub show_bookmarks: bool,
}

impl QueryDescriptor {
    /// Whether the descriptor narrows or reorders the result set at all.
    pub fn is_unfiltered(&self) -> bool {
        self.search.is_none() && self.filter.is_none() && self.sort.is_none() && !self.show_bookmarks
    }
}

/// Snapshot of the live UI state a list is showing.
///
/// A plain value object: every mutating user action produces a new view,
/// and [`build_query`] is a pure function over it, so state transitions
/// can be tested without any UI plumbing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub search_text: String,
    pub active_filters: BTreeMap<String, BTreeSet<String>>,
    pub sort_field: Option<String>,
    pub sort_order: SortOrder,
    pub show_bookmarks: bool,
}

impl ViewState {
    /// Activate one filter value for a field.
    pub fn insert_filter(&mut self, field: &str, value: &str) {
        self.active_filters
            .entry(field.to_string())
            .or_default()
            .insert(value.to_string());
    }

    /// Deactivate one filter value; empty fields are dropped entirely.
    pub fn remove_filter(&mut self, field: &str, value: &str) {
        if let Some(values) = self.active_filters.get_mut(field) {
            values.remove(value);
            if values.is_empty() {
                self.active_filters.remove(field);
            }
        }
    }
}

/// Build the query descriptor for the current view.
///
/// Search text is trimmed and only included when non-empty and search
/// fields are configured; sort is only included while an order is
/// active.
pub fn build_query(view: &ViewState, settings: &ListSettings) -> QueryDescriptor {
    let trimmed = view.search_text.trim();
    let search = if !trimmed.is_empty() && !settings.search_fields.is_empty() {
        Some(SearchQuery {
            value: trimmed.to_string(),
            fields: settings.search_fields.clone(),
        })
    } else {
        None
    };

    let filter = if view.active_filters.is_empty() {
        None
    } else {
        Some(FilterQuery {
            filters: view.active_filters.clone(),
        })
    };

    let sort = match (&view.sort_field, view.sort_order) {
        (Some(field), order) if order.is_active() => Some(SortQuery {
            field: field.clone(),
            order,
        }),
        _ => None,
    };

    QueryDescriptor {
        search,
        filter,
        sort,
        show_bookmarks: view.show_bookmarks,
    }
}

/// Canonical cache key for one page under one query.
pub fn cache_key(page: usize, query: &QueryDescriptor) -> String {
    #[derive(Serialize)]
    struct Key<'a> {
        page: usize,
        query: &'a QueryDescriptor,
    }

    serde_json::to_string(&Key { page, query }).unwrap_or_else(|_| format!("page:{page}"))
}

/// Case-insensitive substring match across the configured search fields.
pub fn matches_search(record: &Record, search: &SearchQuery) -> bool {
    let needle = search.value.to_lowercase();
    search
        .fields
        .iter()
        .any(|field| record.field_text(field).to_lowercase().contains(&needle))
}

/// A record passes when, for every filtered field, at least one of its
/// values is among the selected ones. Distinct fields AND together.
pub fn matches_filters(record: &Record, filter: &FilterQuery) -> bool {
    filter.filters.iter().all(|(field, selected)| {
        record_values(record, field)
            .iter()
            .any(|value| selected.contains(value))
    })
}

fn record_values(record: &Record, field: &str) -> Vec<String> {
    match record.field(field) {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(_) => vec![record.field_text(field)],
        None => Vec::new(),
    }
}

/// Apply the full descriptor to an in-memory dataset.
///
/// Source order is preserved except under an active sort.
pub fn apply_query(records: &[Record], query: &QueryDescriptor) -> Vec<Record> {
    let mut matching: Vec<Record> = records
        .iter()
        .filter(|record| !query.show_bookmarks || record.bookmarked)
        .filter(|record| {
            query
                .search
                .as_ref()
                .map_or(true, |search| matches_search(record, search))
        })
        .filter(|record| {
            query
                .filter
                .as_ref()
                .map_or(true, |filter| matches_filters(record, filter))
        })
        .cloned()
        .collect();

    if let Some(sort) = &query.sort {
        sort_records(&mut matching, sort);
    }

    matching
}

/// Order records by a field. Numeric values compare numerically, text
/// compares case-insensitively.
pub fn sort_records(records: &mut [Record], sort: &SortQuery) {
    if !sort.order.is_active() {
        return;
    }

    records.sort_by(|a, b| {
        let ordering = compare_fields(&a.field_text(&sort.field), &b.field_text(&sort.field));
        match sort.order {
            SortOrder::Desc => ordering.reverse(),
            _ => ordering,
        }
    });
}

fn compare_fields(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(left), Ok(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
        _ => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldMap;
    use serde_json::json;

    fn settings() -> ListSettings {
        ListSettings::new().with_search_fields(["Name", "Title"])
    }

    fn record(id: i64, name: &str) -> Record {
        Record::new(id, FieldMap::new()).with_field("Name", json!(name))
    }

    #[test]
    fn search_is_trimmed_and_gated_on_fields() {
        let mut view = ViewState::default();
        view.search_text = "  angel  ".to_string();

        let query = build_query(&view, &settings());
        let search = query.search.expect("search should be included");
        assert_eq!(search.value, "angel");
        assert_eq!(search.fields, vec!["Name", "Title"]);

        // No search fields configured: the term is ignored.
        let query = build_query(&view, &ListSettings::default());
        assert!(query.search.is_none());

        view.search_text = "   ".to_string();
        let query = build_query(&view, &settings());
        assert!(query.search.is_none());
    }

    #[test]
    fn sort_requires_an_active_order() {
        let mut view = ViewState::default();
        view.sort_field = Some("Name".to_string());
        view.sort_order = SortOrder::None;
        assert!(build_query(&view, &settings()).sort.is_none());

        view.sort_order = SortOrder::Desc;
        let sort = build_query(&view, &settings()).sort.expect("sort");
        assert_eq!(sort.field, "Name");
        assert_eq!(sort.order, SortOrder::Desc);
    }

    #[test]
    fn sort_order_cycles() {
        assert_eq!(SortOrder::None.cycled(), SortOrder::Asc);
        assert_eq!(SortOrder::Asc.cycled(), SortOrder::Desc);
        assert_eq!(SortOrder::Desc.cycled(), SortOrder::None);
    }

    #[test]
    fn cache_key_is_insertion_order_independent() {
        let mut view_a = ViewState::default();
        view_a.insert_filter("Office", "Paris");
        view_a.insert_filter("Office", "London");
        view_a.insert_filter("Team", "Design");

        let mut view_b = ViewState::default();
        view_b.insert_filter("Team", "Design");
        view_b.insert_filter("Office", "London");
        view_b.insert_filter("Office", "Paris");

        let key_a = cache_key(2, &build_query(&view_a, &settings()));
        let key_b = cache_key(2, &build_query(&view_b, &settings()));
        assert_eq!(key_a, key_b);
    }

    #[test]
    fn cache_key_distinguishes_pages_and_queries() {
        let query = QueryDescriptor::default();
        assert_ne!(cache_key(0, &query), cache_key(1, &query));

        let mut view = ViewState::default();
        view.insert_filter("Office", "Paris");
        let filtered = build_query(&view, &settings());
        assert_ne!(cache_key(0, &query), cache_key(0, &filtered));
    }

    #[test]
    fn filter_matching_intersects_array_values() {
        let record = Record::new(1, FieldMap::new())
            .with_field("Tags", json!(["red", "blue"]))
            .with_field("Office", json!("Paris"));

        let mut filter = FilterQuery::default();
        filter.insert("Tags", "blue");
        assert!(matches_filters(&record, &filter));

        filter.insert("Office", "London");
        // Office=Paris is not selected, fields AND together.
        assert!(!matches_filters(&record, &filter));
    }

    #[test]
    fn apply_query_filters_searches_and_sorts() {
        let mut records = vec![
            record(1, "Charlie"),
            record(2, "alice"),
            record(3, "Bob"),
            record(4, "Dave"),
        ];
        records[3].bookmarked = true;

        let mut view = ViewState::default();
        view.search_text = "a".to_string();
        view.sort_field = Some("Name".to_string());
        view.sort_order = SortOrder::Asc;

        let query = build_query(&view, &settings());
        let result = apply_query(&records, &query);
        let names: Vec<String> = result.iter().map(|r| r.field_text("Name")).collect();
        // "a" matches alice, Charlie and Dave; case-insensitive sort.
        assert_eq!(names, vec!["alice", "Charlie", "Dave"]);

        view.show_bookmarks = true;
        let query = build_query(&view, &settings());
        let result = apply_query(&records, &query);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, 4);
    }

    #[test]
    fn numeric_fields_sort_numerically() {
        let mut records = vec![
            Record::new(1, FieldMap::new()).with_field("Age", json!(9)),
            Record::new(2, FieldMap::new()).with_field("Age", json!(100)),
            Record::new(3, FieldMap::new()).with_field("Age", json!(21)),
        ];

        sort_records(
            &mut records,
            &SortQuery {
                field: "Age".to_string(),
                order: SortOrder::Asc,
            },
        );
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn removing_the_last_filter_value_drops_the_field() {
        let mut view = ViewState::default();
        view.insert_filter("Office", "Paris");
        view.remove_filter("Office", "Paris");
        assert!(view.active_filters.is_empty());
    }
}
