#![allow(dead_code)]

pub mod socket_guard;

use serde_json::{Value, json};

/// A catalogue book record as the listing and detail endpoints return it.
pub fn book_json(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "authors": [{"name": "Dickens, Charles", "birth_year": 1812, "death_year": 1870}],
        "translators": [],
        "subjects": ["Fiction"],
        "bookshelves": [],
        "languages": ["en"],
        "copyright": false,
        "media_type": "Text",
        "formats": {
            "image/jpeg": format!("https://www.gutenberg.org/cache/epub/{id}/pg{id}.cover.medium.jpg"),
            "text/html": format!("https://www.gutenberg.org/ebooks/{id}.html.images")
        },
        "download_count": 1000 + id
    })
}

/// A listing page with `count` results starting at `first_id`.
pub fn listing_json(first_id: u64, count: u64, total: u64, next: Option<String>) -> Value {
    let results: Vec<Value> = (first_id..first_id + count)
        .map(|id| book_json(id, &format!("Book {id}")))
        .collect();
    json!({
        "count": total,
        "next": next,
        "previous": null,
        "results": results
    })
}
