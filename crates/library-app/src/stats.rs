//! Dashboard statistics derived from loaded collections

use chrono::NaiveDateTime;
use library_client::{Book, Loan, Stats, User};

/// Count books, users and loans for the dashboard
///
/// A loan is active until it has a return timestamp and overdue when it is
/// active and due before `now`. Loans without a readable due date are never
/// overdue.
pub fn calculate_stats(books: &[Book], users: &[User], loans: &[Loan], now: NaiveDateTime) -> Stats {
    Stats {
        total_books: books.len() as u64,
        available_books: books.iter().filter(|b| b.available).count() as u64,
        total_users: users.len() as u64,
        active_loans: loans.iter().filter(|l| l.is_active()).count() as u64,
        overdue_loans: loans.iter().filter(|l| l.is_overdue(now)).count() as u64,
    }
}
