use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::entities::{movies, ratings};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Movie {
    pub id: i32,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub year: i32,
    pub runtime: i32,
    pub genres: Vec<String>,
    pub version: i32,
}

impl From<movies::Model> for Movie {
    fn from(model: movies::Model) -> Self {
        Self {
            id: model.id,
            created_at: model.created_at,
            title: model.title,
            year: model.year,
            runtime: model.runtime,
            genres: model.genres.0,
            version: model.version,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMovie {
    pub title: String,
    pub year: i32,
    pub runtime: i32,
    pub genres: Vec<String>,
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieChanges {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<i32>,
    pub genres: Option<Vec<String>>,
    /// When present, the update is rejected unless it matches the stored version.
    pub version: Option<i32>,
}

impl MovieChanges {
    pub fn apply(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(year) = self.year {
            movie.year = year;
        }
        if let Some(runtime) = self.runtime {
            movie.runtime = runtime;
        }
        if let Some(genres) = self.genres {
            movie.genres = genres;
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Rating {
    pub user_id: i32,
    pub movie_id: i32,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub version: i32,
}

impl From<ratings::Model> for Rating {
    fn from(model: ratings::Model) -> Self {
        Self {
            user_id: model.user_id,
            movie_id: model.movie_id,
            rating: model.rating,
            created_at: model.created_at,
            version: model.version,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct AverageRating {
    pub average_rating: f64,
    pub rating_count: i64,
}

// ============================================================================
// Listing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Id,
    Title,
    Year,
    Runtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub column: SortColumn,
    pub descending: bool,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            column: SortColumn::Id,
            descending: false,
        }
    }
}

impl FromStr for Sort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = s.strip_prefix('-').map_or((false, s), |rest| (true, rest));

        let column = match name {
            "id" => SortColumn::Id,
            "title" => SortColumn::Title,
            "year" => SortColumn::Year,
            "runtime" => SortColumn::Runtime,
            _ => {
                return Err(format!(
                    "Invalid sort value: {s}. Expected one of id, title, year, runtime (optionally prefixed with -)"
                ));
            }
        };

        Ok(Self { column, descending })
    }
}

pub const MAX_PAGE: u64 = 10_000;
pub const MAX_PAGE_SIZE: u64 = 100;
pub const DEFAULT_PAGE_SIZE: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieFilters {
    pub title: Option<String>,
    pub genres: Vec<String>,
    pub page: u64,
    pub page_size: u64,
    pub sort: Sort,
}

impl Default for MovieFilters {
    fn default() -> Self {
        Self {
            title: None,
            genres: Vec::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: Sort::default(),
        }
    }
}

impl MovieFilters {
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page.saturating_sub(1)) * self.page_size
    }
}

/// Pagination metadata. Every field is omitted when there are no records.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
}

impl Metadata {
    #[must_use]
    pub const fn calculate(total_records: u64, page: u64, page_size: u64) -> Self {
        if total_records == 0 || page_size == 0 {
            return Self {
                current_page: None,
                page_size: None,
                first_page: None,
                last_page: None,
                total_records: None,
            };
        }

        Self {
            current_page: Some(page),
            page_size: Some(page_size),
            first_page: Some(1),
            last_page: Some(total_records.div_ceil(page_size)),
            total_records: Some(total_records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parsing() {
        assert_eq!("id".parse::<Sort>().unwrap(), Sort::default());
        assert_eq!(
            "-year".parse::<Sort>().unwrap(),
            Sort {
                column: SortColumn::Year,
                descending: true
            }
        );
        assert!("rating".parse::<Sort>().is_err());
        assert!("--id".parse::<Sort>().is_err());
    }

    #[test]
    fn test_offset() {
        let mut filters = MovieFilters::default();
        assert_eq!(filters.offset(), 0);
        filters.page = 3;
        filters.page_size = 10;
        assert_eq!(filters.offset(), 20);
    }

    #[test]
    fn test_metadata_calculation() {
        let meta = Metadata::calculate(45, 2, 20);
        assert_eq!(meta.current_page, Some(2));
        assert_eq!(meta.last_page, Some(3));
        assert_eq!(meta.total_records, Some(45));

        let exact = Metadata::calculate(40, 1, 20);
        assert_eq!(exact.last_page, Some(2));
    }

    #[test]
    fn test_metadata_empty_when_no_records() {
        let meta = Metadata::calculate(0, 1, 20);
        assert_eq!(meta, Metadata::default());
        assert_eq!(serde_json::to_string(&meta).unwrap(), "{}");
    }

    #[test]
    fn test_changes_apply_only_present_fields() {
        let mut movie = Movie {
            id: 1,
            created_at: Utc::now(),
            title: "Heat".to_string(),
            year: 1995,
            runtime: 170,
            genres: vec!["crime".to_string()],
            version: 1,
        };

        MovieChanges {
            runtime: Some(171),
            ..MovieChanges::default()
        }
        .apply(&mut movie);

        assert_eq!(movie.title, "Heat");
        assert_eq!(movie.runtime, 171);
        assert_eq!(movie.genres, vec!["crime".to_string()]);
    }
}
