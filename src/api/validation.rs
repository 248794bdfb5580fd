use super::ApiError;
use crate::models::movie::{DEFAULT_PAGE_SIZE, MovieFilters, Sort};

pub fn validate_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::not_found("Record", id));
    }
    Ok(id)
}

pub fn parse_sort(sort: Option<&str>) -> Result<Sort, ApiError> {
    sort.map_or_else(|| Ok(Sort::default()), |s| s.parse().map_err(ApiError::validation))
}

/// Comma-separated genre list. Blank entries are dropped.
#[must_use]
pub fn parse_genres(genres: Option<&str>) -> Vec<String> {
    genres
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn build_filters(
    title: Option<String>,
    genres: Option<&str>,
    page: Option<u64>,
    page_size: Option<u64>,
    sort: Option<&str>,
) -> Result<MovieFilters, ApiError> {
    Ok(MovieFilters {
        title: title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        genres: parse_genres(genres),
        page: page.unwrap_or(1),
        page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        sort: parse_sort(sort)?,
    })
}
