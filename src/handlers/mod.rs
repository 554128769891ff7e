//! HTTP handlers, grouped by resource.
//!
//! Handlers validate input, make one or two repository/storage calls and shape the
//! JSON response. Authorization is enforced twice: by the router layer and by the
//! `AuthUser` / `AdminUser` extractor each protected handler takes.

pub mod blogs;
pub mod categories;
pub mod images;
pub mod users;

use serde::Deserialize;

/// SearchFilter
///
/// The optional `?search=` query parameter shared by blog and user listings.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchFilter {
    /// Case-insensitive substring to match.
    pub search: Option<String>,
}

/// Trims the value and treats an empty result as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed, non-empty category names, first occurrence wins.
pub(crate) fn clean_category_names(names: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !cleaned.iter().any(|n| n == name) {
            cleaned.push(name.to_string());
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_blank_drops_whitespace() {
        assert_eq!(non_blank(Some("  hi ".into())), Some("hi".to_string()));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn category_names_are_trimmed_and_deduplicated() {
        let names = vec![
            " Rust ".to_string(),
            "".to_string(),
            "Rust".to_string(),
            "Web".to_string(),
        ];
        assert_eq!(clean_category_names(names), vec!["Rust", "Web"]);
    }
}
