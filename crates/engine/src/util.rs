//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use sea_orm::{
    Condition,
    prelude::*,
    sea_query::{LikeExpr, SimpleExpr},
};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Largest page a list operation will return.
pub(crate) const MAX_PAGE_SIZE: u64 = 100;

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Trim a required name and reject it when empty.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Reject `page`/`page_size` outside `1..` and `1..=MAX_PAGE_SIZE`.
///
/// Returns the row offset of the requested page.
pub(crate) fn validate_page(page: u64, page_size: u64) -> ResultEngine<u64> {
    if page == 0 {
        return Err(EngineError::InvalidFilter(
            "page must be >= 1".to_string(),
        ));
    }
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(EngineError::InvalidFilter(format!(
            "page size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok((page - 1).saturating_mul(page_size))
}

/// Escape character for `LIKE` patterns built by [`contains_literal`].
const LIKE_ESCAPE: char = '!';

/// `column LIKE %value%`, with `%` and `_` in `value` matched literally.
pub(crate) fn contains_literal<C>(column: &C, value: &str) -> SimpleExpr
where
    C: ColumnTrait,
{
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_') || ch == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    column.like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

/// Build `col1 LIKE %t% OR col2 LIKE %t% ...` for every whitespace-separated
/// token of `keywords`. Returns `None` when there is nothing to search for.
pub(crate) fn keyword_condition<C>(keywords: Option<&str>, columns: &[C]) -> Option<Condition>
where
    C: ColumnTrait,
{
    let keywords = keywords?;
    let mut any = Condition::any();
    let mut seen = false;
    for token in keywords.split_whitespace() {
        for column in columns {
            any = any.add(contains_literal(column, token));
            seen = true;
        }
    }
    seen.then_some(any)
}
