// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process evaluation of list queries.
//!
//! Stages run in a fixed order: substring filters, then sort, then the
//! `[offset, offset + limit - 1]` range. Null sort keys behave like SQL
//! `NULLS LAST` ascending and `NULLS FIRST` descending.

use crate::models::{Adventure, AdventureQuery, SortColumn, SortOrder};
use std::cmp::Ordering;

/// Apply all query stages to an unordered set of records.
pub fn apply_query<I>(adventures: I, query: &AdventureQuery) -> Vec<Adventure>
where
    I: IntoIterator<Item = Adventure>,
{
    let mut matched: Vec<Adventure> = adventures
        .into_iter()
        .filter(|a| matches_filters(a, query))
        .collect();

    if let Some((column, order)) = query.sort {
        // Stable sort so equal keys keep their store order
        matched.sort_by(|a, b| compare_by(column, order, a, b));
    }

    paginate(matched, query.offset, query.limit)
}

/// Case-insensitive substring match on every filter present.
pub fn matches_filters(adventure: &Adventure, query: &AdventureQuery) -> bool {
    contains_ci(adventure.activity_type.as_deref(), query.activity_type.as_deref())
        && contains_ci(adventure.location.as_deref(), query.location.as_deref())
}

/// Filters are already lower-cased by [`AdventureQuery`].
fn contains_ci(value: Option<&str>, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => value.is_some_and(|v| v.to_lowercase().contains(needle)),
    }
}

/// Slice out `limit` records starting at `offset`.
pub fn paginate<T>(items: Vec<T>, offset: u32, limit: u32) -> Vec<T> {
    items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

/// Compare two records on a sort column.
pub fn compare_by(column: SortColumn, order: SortOrder, a: &Adventure, b: &Adventure) -> Ordering {
    let ordering = match column {
        SortColumn::Price => nulls_last(a.price, b.price, f64::total_cmp),
        SortColumn::Duration => nulls_last(a.duration, b.duration, |x, y| x.cmp(y)),
        SortColumn::DepartureDate => a.departure_date.cmp(&b.departure_date),
    };

    match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    }
}

fn nulls_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(&x, &y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
