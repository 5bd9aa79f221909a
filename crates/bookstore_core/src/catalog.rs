//! Book catalog query
//!
//! Builds the list view of the catalog: free-text search over name and author,
//! exact price filter, ordering over any exposed field, and the per-book
//! derived columns (like count, aggregate rating, owner name). The readers of
//! a book are resolved through an explicit join over the relation rows rather
//! than a live object graph.

use crate::database::Db;
use crate::database::types::{Decimal2, StoreError};
use core::fmt;
use core::str::FromStr;
use serde::Serialize;

/// Projection returned by the list query. `annotated_likes` is the count of
/// relation rows with `liked` set; `owner_name` is empty for unowned books.
#[non_exhaustive]
#[derive(Serialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BookListing {
    pub id: i64,
    pub name: String,
    pub price: Decimal2,
    pub author_name: String,
    pub annotated_likes: i64,
    pub rating: Option<Decimal2>,
    pub owner_name: String,
}

/// A user having any relation with a book, reduced to their name.
#[non_exhaustive]
#[derive(Serialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Reader {
    pub first_name: String,
    pub last_name: String,
}

/// Fields the list endpoint can order by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKey {
    Id,
    Name,
    Price,
    AuthorName,
    Rating,
    AnnotatedLikes,
}

impl OrderKey {
    const fn column(self) -> &'static str {
        match self {
            Self::Id => "b.id",
            Self::Name => "b.name",
            Self::Price => "b.price",
            Self::AuthorName => "b.author_name",
            Self::Rating => "b.rating",
            Self::AnnotatedLikes => "annotated_likes",
        }
    }
}

/// Ordering key with optional `-` prefix for descending, e.g. "price" or
/// "-annotated_likes". Ties always fall back to insertion (id) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub key: OrderKey,
    pub descending: bool,
}

impl OrderBy {
    fn sql(self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!("{} {direction}, b.id ASC", self.key.column())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ordering key: {0:?}")]
pub struct ParseOrderingError(pub String);

impl FromStr for OrderBy {
    type Err = ParseOrderingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, key) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let key = match key {
            "id" => OrderKey::Id,
            "name" => OrderKey::Name,
            "price" => OrderKey::Price,
            "author_name" => OrderKey::AuthorName,
            "rating" => OrderKey::Rating,
            "annotated_likes" => OrderKey::AnnotatedLikes,
            _ => return Err(ParseOrderingError(s.to_owned())),
        };
        Ok(Self { key, descending })
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            f.write_str("-")?;
        }
        let name = match self.key {
            OrderKey::Id => "id",
            OrderKey::Name => "name",
            OrderKey::Price => "price",
            OrderKey::AuthorName => "author_name",
            OrderKey::Rating => "rating",
            OrderKey::AnnotatedLikes => "annotated_likes",
        };
        f.write_str(name)
    }
}

/// Named parameters of the list query; all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    /// Case-insensitive substring matched against name OR author name.
    pub search: Option<String>,
    /// Exact price match.
    pub price: Option<Decimal2>,
    /// Defaults to insertion order when absent.
    pub order_by: Option<OrderBy>,
}

const LISTING_SQL: &str = r"
    SELECT
        b.id,
        b.name,
        b.price,
        b.author_name,
        b.rating,
        COALESCE(o.username, '') AS owner_name,
        COALESCE(l.like_count, 0) AS annotated_likes
    FROM books b
    LEFT JOIN users o ON o.id = b.owner
    LEFT JOIN (
        SELECT book, COUNT(*) AS like_count
        FROM user_book_relations
        WHERE liked = 1
        GROUP BY book
    ) l ON l.book = b.id
";

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl Db {
    /// Runs the catalog list query. Ordering is stable: books with equal keys
    /// keep their insertion order.
    pub async fn list_books(&self, query: &BookQuery) -> Result<Vec<BookListing>, StoreError> {
        let order = query
            .order_by
            .map_or_else(|| "b.id ASC".to_owned(), OrderBy::sql);
        let sql = format!(
            r"{LISTING_SQL}
            WHERE (?1 IS NULL OR b.name LIKE ?1 ESCAPE '\' OR b.author_name LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR b.price = ?2)
            ORDER BY {order};
        "
        );

        let listings = sqlx::query_as(&sql)
            .bind(query.search.as_deref().map(like_pattern))
            .bind(query.price)
            .fetch_all(&self.pool)
            .await?;

        Ok(listings)
    }

    /// Single-book variant of the list projection, for the detail view.
    pub async fn fetch_listing(&self, book_id: i64) -> Result<BookListing, StoreError> {
        let sql = format!("{LISTING_SQL} WHERE b.id = ?1;");
        let listing = sqlx::query_as(&sql)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;

        listing.ok_or(StoreError::NotFound)
    }

    /// The distinct users having any relation with the book, in the order the
    /// relations were created.
    pub async fn fetch_readers(&self, book_id: i64) -> Result<Vec<Reader>, StoreError> {
        let readers = sqlx::query_as(
            r"
            SELECT u.first_name, u.last_name
            FROM user_book_relations r
            JOIN users u ON u.id = r.user
            WHERE r.book = ?1
            ORDER BY r.id ASC;
        ",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(readers)
    }
}
