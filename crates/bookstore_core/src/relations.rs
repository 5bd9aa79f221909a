//! Relation store
//!
//! Upserts the per-(user, book) like/bookmark/rate row. Each user has at most
//! one relation row per book: the first interaction creates it, every later
//! one mutates it in place. A write that touches `rate` triggers the rating
//! aggregator before the transaction commits, so the relation row and the
//! book's aggregate never diverge.

use crate::database::Db;
use crate::database::types::{RelationRecord, StoreError};
use crate::rating::refresh_rating;
use serde::{Deserialize, Serialize};

const RATE_RANGE: core::ops::RangeInclusive<i64> = 1..=5;

/// Partial update of a relation; absent fields are left untouched.
#[derive(Serialize, Debug, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct RelationPatch {
    pub like: Option<bool>,
    pub in_bookmarks: Option<bool>,
    pub rate: Option<i64>,
}

impl Db {
    /// Finds or creates the (user, book) relation row and applies `patch`.
    ///
    /// Rejects `rate` outside 1..=5 before any write. When the patch carries a
    /// rate (even an unchanged one) the aggregate rating is recomputed inside
    /// the same transaction; if that recompute fails the relation write is
    /// rolled back with it.
    pub async fn upsert_relation(
        &self,
        user_id: i64,
        book_id: i64,
        patch: &RelationPatch,
    ) -> Result<RelationRecord, StoreError> {
        if let Some(rate) = patch.rate {
            if !RATE_RANGE.contains(&rate) {
                return Err(StoreError::InvalidRating(rate));
            }
        }

        let mut tx = self.pool.begin().await?;

        // Surface a missing book as NotFound instead of a foreign key error.
        let book: Option<i64> = sqlx::query_scalar("SELECT id FROM books WHERE id = ?1")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?;
        if book.is_none() {
            return Err(StoreError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO user_book_relations (user, book)
            VALUES (?1, ?2)
            ON CONFLICT (user, book) DO NOTHING;
        ",
        )
        .bind(user_id)
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if let Some(like) = patch.like {
            sqlx::query("UPDATE user_book_relations SET liked = ?1 WHERE user = ?2 AND book = ?3")
                .bind(like)
                .bind(user_id)
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
        }
        if let Some(in_bookmarks) = patch.in_bookmarks {
            sqlx::query(
                "UPDATE user_book_relations SET in_bookmarks = ?1 WHERE user = ?2 AND book = ?3",
            )
            .bind(in_bookmarks)
            .bind(user_id)
            .bind(book_id)
            .execute(&mut *tx)
            .await?;
        }
        if let Some(rate) = patch.rate {
            sqlx::query("UPDATE user_book_relations SET rate = ?1 WHERE user = ?2 AND book = ?3")
                .bind(rate)
                .bind(user_id)
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
            refresh_rating(&mut tx, book_id).await?;
        }

        let relation: RelationRecord = sqlx::query_as(
            r"
            SELECT id, user, book, liked, in_bookmarks, rate, created_at
            FROM user_book_relations
            WHERE user = ?1 AND book = ?2;
        ",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(relation)
    }
}
