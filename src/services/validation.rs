//! Field rules shared by the user and movie services.
//!
//! Each check returns the first violation as a human-readable message.

use chrono::Datelike;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::models::movie::{MAX_PAGE, MAX_PAGE_SIZE, MovieFilters};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_EMAIL_BYTES: usize = 500;
pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_GENRES: usize = 10;
pub const EARLIEST_YEAR: i32 = 1888;
pub const MIN_RUNTIME: i32 = 20;
pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 10.0;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("Invalid regex")
    })
}

pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name must be provided".to_string());
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(format!("Name must not be more than {MAX_NAME_CHARS} characters long"));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email must be provided".to_string());
    }
    if email.len() > MAX_EMAIL_BYTES {
        return Err(format!("Email must not be more than {MAX_EMAIL_BYTES} bytes long"));
    }
    if !email_regex().is_match(email) {
        return Err("Email must be a valid email address".to_string());
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title must be provided".to_string());
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(format!("Title must not be more than {MAX_TITLE_CHARS} characters long"));
    }
    Ok(())
}

pub fn validate_year(year: i32) -> Result<(), String> {
    let current = chrono::Utc::now().year();
    if !(EARLIEST_YEAR..=current).contains(&year) {
        return Err(format!("Year must be between {EARLIEST_YEAR} and {current}"));
    }
    Ok(())
}

pub fn validate_runtime(runtime: i32) -> Result<(), String> {
    if runtime < MIN_RUNTIME {
        return Err(format!("Runtime must be at least {MIN_RUNTIME} minutes"));
    }
    Ok(())
}

pub fn validate_genres(genres: &[String]) -> Result<(), String> {
    if genres.is_empty() {
        return Err("At least one genre must be provided".to_string());
    }
    if genres.len() > MAX_GENRES {
        return Err(format!("Must not contain more than {MAX_GENRES} genres"));
    }
    if genres.iter().any(|g| g.trim().is_empty()) {
        return Err("Genres must not be empty".to_string());
    }
    let unique: HashSet<&str> = genres.iter().map(String::as_str).collect();
    if unique.len() != genres.len() {
        return Err("Genres must not contain duplicate values".to_string());
    }
    Ok(())
}

pub fn validate_rating(rating: f64) -> Result<(), String> {
    if !rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(format!("Rating must be between {MIN_RATING:.1} and {MAX_RATING:.1}"));
    }
    Ok(())
}

pub fn validate_filters(filters: &MovieFilters) -> Result<(), String> {
    if !(1..=MAX_PAGE).contains(&filters.page) {
        return Err(format!("Page must be between 1 and {MAX_PAGE}"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&filters.page_size) {
        return Err(format!("Page size must be between 1 and {MAX_PAGE_SIZE}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a.b+c@sub.example.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@example.com").is_err());
        assert!(validate_email(&format!("{}@example.com", "a".repeat(500))).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Alice").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(101)).is_err());
        assert!(validate_name(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn test_validate_movie_fields() {
        assert!(validate_title("Heat").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_year(1888).is_ok());
        assert!(validate_year(1887).is_err());
        assert!(validate_year(chrono::Utc::now().year() + 1).is_err());
        assert!(validate_runtime(20).is_ok());
        assert!(validate_runtime(19).is_err());
    }

    #[test]
    fn test_validate_genres() {
        let g = |v: &[&str]| v.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        assert!(validate_genres(&g(&["crime", "drama"])).is_ok());
        assert!(validate_genres(&[]).is_err());
        assert!(validate_genres(&g(&["crime", "crime"])).is_err());
        assert!(validate_genres(&g(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"])).is_err());
    }

    #[test]
    fn test_validate_rating_bounds() {
        assert!(validate_rating(1.0).is_ok());
        assert!(validate_rating(10.0).is_ok());
        assert!(validate_rating(7.5).is_ok());
        assert!(validate_rating(0.99).is_err());
        assert!(validate_rating(10.01).is_err());
        assert!(validate_rating(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_filters() {
        let mut filters = MovieFilters::default();
        assert!(validate_filters(&filters).is_ok());
        filters.page = 0;
        assert!(validate_filters(&filters).is_err());
        filters.page = 1;
        filters.page_size = 101;
        assert!(validate_filters(&filters).is_err());
    }
}
