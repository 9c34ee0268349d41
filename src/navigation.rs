//! Deep-link navigation queries.
//!
//! Hosts can open a list pre-searched, pre-filtered and pre-sorted by
//! passing key/value parameters on navigation. This module parses them
//! into an initial [`ViewState`]; values arrive as plain strings, so
//! every flag and list is validated here rather than trusted.

use crate::config::ListSettings;
use crate::query::{SortOrder, ViewState};
use std::collections::BTreeMap;
use tracing::warn;

pub const PARAM_SEARCH_VALUE: &str = "listSearchValue";
pub const PARAM_FILTER_COLUMN: &str = "listFilterColumn";
pub const PARAM_FILTER_VALUE: &str = "listFilterValue";
pub const PARAM_SORT_COLUMN: &str = "listSortColumn";
pub const PARAM_SORT_ORDER: &str = "listSortOrder";

/// Split a comma-separated parameter into trimmed, non-empty parts.
pub fn split_by_commas(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse navigation parameters into an initial view.
///
/// Returns `None` when no applicable parameter is present. Search is
/// honored only when search fields are configured, filters only when
/// filter controls are; a filter column list whose length differs from
/// its value list is rejected wholesale, and sorting is accepted for a
/// single column with an `asc`/`desc` order only.
pub fn parse_navigation_query(
    params: &BTreeMap<String, String>,
    settings: &ListSettings,
) -> Option<ViewState> {
    let mut view = ViewState::default();
    let mut any = false;

    if let Some(value) = params.get(PARAM_SEARCH_VALUE) {
        if settings.search_fields.is_empty() {
            warn!("navigation search ignored, no search fields configured");
        } else if !value.trim().is_empty() {
            view.search_text = value.trim().to_string();
            any = true;
        }
    }

    let columns = params.get(PARAM_FILTER_COLUMN).map(|v| split_by_commas(v));
    let values = params.get(PARAM_FILTER_VALUE).map(|v| split_by_commas(v));
    if let (Some(columns), Some(values)) = (columns, values) {
        if settings.filter_fields.is_empty() {
            warn!("navigation filters ignored, no filter fields configured");
        } else if columns.len() != values.len() {
            warn!(
                "navigation filters ignored, {} columns but {} values",
                columns.len(),
                values.len()
            );
        } else {
            for (column, value) in columns.iter().zip(values.iter()) {
                view.insert_filter(column, value);
            }
            any = !view.active_filters.is_empty();
        }
    }

    if let (Some(column), Some(order)) =
        (params.get(PARAM_SORT_COLUMN), params.get(PARAM_SORT_ORDER))
    {
        let column = column.trim();
        let order = match order.trim().to_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            other => {
                warn!("navigation sort ignored, unknown order {other:?}");
                None
            }
        };
        if let Some(order) = order {
            if column.is_empty() {
                warn!("navigation sort ignored, no column given");
            } else {
                view.sort_field = Some(column.to_string());
                view.sort_order = order;
                any = true;
            }
        }
    }

    any.then_some(view)
}
