//! Plain-text rendering of session views and book records.

use std::fmt::Write as _;

use gutenscroll_core::catalogue::{Book, BookSummary, Person};
use gutenscroll_core::session::ViewSnapshot;

/// Formats one author as `Name (1812-1870)`, or just the name when no
/// years are known.
pub(crate) fn person_line(person: &Person) -> String {
    let span = person.life_span();
    if span.is_empty() {
        person.name.clone()
    } else {
        format!("{} ({span})", person.name)
    }
}

fn authors_line(authors: &[Person]) -> String {
    if authors.is_empty() {
        return "Unknown author".to_string();
    }
    authors
        .iter()
        .map(person_line)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One result row.
pub(crate) fn summary_line(book: &BookSummary, visited: bool) -> String {
    let marker = if visited { "*" } else { " " };
    format!(
        "{marker}{:>6}  {}  by {}  [{} downloads]",
        book.id,
        book.title,
        authors_line(&book.authors),
        book.download_count
    )
}

/// The result list, with totals and the query that reproduces it.
pub(crate) fn render_view(view: &ViewSnapshot, is_visited: impl Fn(u64) -> bool) -> String {
    let mut out = String::new();
    for book in &view.items {
        let _ = writeln!(out, "{}", summary_line(book, is_visited(book.id)));
    }
    if view.items.is_empty() && view.last_error.is_none() {
        let _ = writeln!(out, "No books found.");
    }

    let total = view
        .total_count
        .map_or_else(|| "?".to_string(), |count| count.to_string());
    let _ = writeln!(
        out,
        "\nShowing {} of {total} books{}",
        view.items.len(),
        if view.has_next { " (more available)" } else { "" }
    );
    let _ = writeln!(out, "Query: ?{}", view.query);
    if let Some(error) = &view.last_error {
        let _ = writeln!(out, "Error: {error}");
    }
    out
}

/// The detail view of one book.
pub(crate) fn render_book(book: &Book, back_path: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", book.title);
    let _ = writeln!(out, "  Id:         {}", book.id);
    let _ = writeln!(out, "  Authors:    {}", authors_line(&book.authors));
    if !book.translators.is_empty() {
        let _ = writeln!(out, "  Translators: {}", authors_line(&book.translators));
    }
    if !book.languages.is_empty() {
        let _ = writeln!(out, "  Languages:  {}", book.languages.join(", "));
    }
    if !book.subjects.is_empty() {
        let _ = writeln!(out, "  Subjects:   {}", book.subjects.join("; "));
    }
    if !book.bookshelves.is_empty() {
        let _ = writeln!(out, "  Bookshelves: {}", book.bookshelves.join("; "));
    }
    let copyright = match book.copyright {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unknown",
    };
    let _ = writeln!(out, "  Copyright:  {copyright}");
    let _ = writeln!(out, "  Downloads:  {}", book.download_count);
    if let Some(cover) = book.cover_url() {
        let _ = writeln!(out, "  Cover:      {cover}");
    }
    for (format, link) in &book.formats {
        let _ = writeln!(out, "  [{format}] {link}");
    }
    let _ = writeln!(out, "Back: {back_path}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gutenscroll_core::filter::FilterSnapshot;

    fn dickens() -> Person {
        Person {
            name: "Dickens, Charles".to_string(),
            birth_year: Some(1812),
            death_year: Some(1870),
        }
    }

    fn summary(id: u64) -> BookSummary {
        BookSummary {
            id,
            title: "A Tale of Two Cities".to_string(),
            authors: vec![dickens()],
            cover_url: None,
            download_count: 21733,
        }
    }

    #[test]
    fn test_person_line_with_and_without_years() {
        assert_eq!(person_line(&dickens()), "Dickens, Charles (1812-1870)");
        let anonymous = Person {
            name: "Anonymous".to_string(),
            birth_year: None,
            death_year: None,
        };
        assert_eq!(person_line(&anonymous), "Anonymous");
    }

    #[test]
    fn test_summary_line_marks_visited() {
        let line = summary_line(&summary(98), true);
        assert!(line.starts_with('*'));
        assert!(line.contains("A Tale of Two Cities"));
        assert!(line.contains("Dickens, Charles (1812-1870)"));
        assert!(line.contains("21733 downloads"));
        assert!(summary_line(&summary(98), false).starts_with(' '));
    }

    #[test]
    fn test_render_view_reports_query_and_error() {
        let view = ViewSnapshot {
            filter: FilterSnapshot::default(),
            title_input: "dickens".to_string(),
            author_input: String::new(),
            items: vec![summary(98)],
            total_count: Some(45),
            has_next: true,
            loading: false,
            last_error: Some(gutenscroll_core::catalogue::FetchError::http_status(
                "https://gutendex.test/books/?page=2",
                503,
            )),
            revision: 3,
            query: "title=dickens&page=1".to_string(),
        };
        let rendered = render_view(&view, |_| false);
        assert!(rendered.contains("Showing 1 of 45 books (more available)"));
        assert!(rendered.contains("Query: ?title=dickens"));
        assert!(rendered.contains("Error: network failure"));
    }

    #[test]
    fn test_render_empty_view() {
        let view = ViewSnapshot {
            filter: FilterSnapshot::default(),
            title_input: String::new(),
            author_input: String::new(),
            items: Vec::new(),
            total_count: Some(0),
            has_next: false,
            loading: false,
            last_error: None,
            revision: 1,
            query: String::new(),
        };
        assert!(render_view(&view, |_| false).contains("No books found."));
    }
}
