//! Search-box helpers derived from loaded state

use library_client::{Book, User};

/// Shortest query that is sent to the backend or completed locally
pub const MIN_SEARCH_LEN: usize = 2;

/// Most suggestions offered for one query
pub const MAX_SUGGESTIONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Title,
    Author,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    pub kind: SuggestionKind,
}

impl Suggestion {
    fn new(text: &str, kind: SuggestionKind) -> Self {
        Self {
            text: text.to_string(),
            kind,
        }
    }
}

/// Autocomplete candidates for `query` from the books and users in memory
///
/// Matching is a case-insensitive substring test on book titles, book
/// authors and user names, in that order per book. Each text is offered
/// once, under the kind it first matched as.
pub fn suggestions(books: &[Book], users: &[User], query: &str) -> Vec<Suggestion> {
    let needle = query.trim().to_lowercase();
    if needle.chars().count() < MIN_SEARCH_LEN {
        return Vec::new();
    }
    let matches = |text: &str| text.to_lowercase().contains(&needle);

    let from_books = books.iter().flat_map(|book| {
        [
            (book.title.as_str(), SuggestionKind::Title),
            (book.author.as_str(), SuggestionKind::Author),
        ]
    });
    let from_users = users
        .iter()
        .map(|user| (user.name.as_str(), SuggestionKind::User));

    let mut found: Vec<Suggestion> = Vec::new();
    for (text, kind) in from_books.chain(from_users) {
        if found.len() == MAX_SUGGESTIONS {
            break;
        }
        if matches(text) && !found.iter().any(|s| s.text == text) {
            found.push(Suggestion::new(text, kind));
        }
    }
    found
}
