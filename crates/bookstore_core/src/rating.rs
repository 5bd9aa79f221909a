//! Rating aggregator
//!
//! Recomputes a book's aggregate rating from its per-user relation rows. The
//! recompute runs inside the caller's transaction so that a relation write and
//! the derived aggregate commit or roll back together. It is deliberately not
//! wired to relation deletion; only the relation write path calls it.

use sqlx::{Sqlite, Transaction};

/// Recomputes `books.rating` for `book_id` as the mean of all non-null
/// `rate` values, rounded to two decimal places, or NULL when no rate exists.
/// Idempotent: unchanged inputs produce the same stored value.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    reason = "Sums of ratings in 1..=5 are far below the f64 integer range"
)]
pub async fn refresh_rating(
    tx: &mut Transaction<'_, Sqlite>,
    book_id: i64,
) -> Result<(), sqlx::Error> {
    let (sum, count): (Option<i64>, i64) =
        sqlx::query_as("SELECT SUM(rate), COUNT(rate) FROM user_book_relations WHERE book = ?1")
            .bind(book_id)
            .fetch_one(&mut **tx)
            .await?;

    let rating: Option<i64> = match sum {
        Some(total) if count > 0 => Some((total as f64 * 100.0 / count as f64).round() as i64),
        _ => None,
    };
    log::debug!("Refreshing rating of book {book_id} to {rating:?} ({count} rates)");

    sqlx::query("UPDATE books SET rating = ?1 WHERE id = ?2")
        .bind(rating)
        .bind(book_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Db;
    use crate::database::types::{Decimal2, NewBook, NewUser};
    use crate::policy::Identity;
    use pretty_assertions::assert_eq;

    async fn book_with_rates(rates: &[i64]) -> (Db, i64) {
        let db = Db::in_memory().await.unwrap();
        let owner = db
            .create_user(&NewUser::new("owner".into(), String::new(), String::new()))
            .await
            .unwrap();
        let book = db
            .create_book(
                &NewBook::new("Alice".into(), Decimal2::from_units(1000), "Author 1".into()),
                &Identity::new(owner.id, false),
            )
            .await
            .unwrap();

        for (index, rate) in rates.iter().enumerate() {
            let user = db
                .create_user(&NewUser::new(
                    format!("reader{index}"),
                    String::new(),
                    String::new(),
                ))
                .await
                .unwrap();
            sqlx::query("INSERT INTO user_book_relations (user, book, rate) VALUES (?1, ?2, ?3)")
                .bind(user.id)
                .bind(book.id)
                .bind(rate)
                .execute(&db.pool)
                .await
                .unwrap();
        }
        (db, book.id)
    }

    async fn refreshed_rating(db: &Db, book_id: i64) -> Option<String> {
        let mut tx = db.pool.begin().await.unwrap();
        refresh_rating(&mut tx, book_id).await.unwrap();
        tx.commit().await.unwrap();

        let book = db.fetch_book(book_id).await.unwrap();
        book.rating.map(|rating| rating.to_string())
    }

    #[tokio::test]
    async fn test_mean_rounds_to_two_decimals() {
        let (db, book_id) = book_with_rates(&[5, 5, 4]).await;
        assert_eq!(Some("4.67".to_owned()), refreshed_rating(&db, book_id).await);

        let (db, book_id) = book_with_rates(&[4, 3, 4]).await;
        assert_eq!(Some("3.67".to_owned()), refreshed_rating(&db, book_id).await);
    }

    #[tokio::test]
    async fn test_no_rates_means_no_rating() {
        let (db, book_id) = book_with_rates(&[]).await;
        assert_eq!(None, refreshed_rating(&db, book_id).await);
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent() {
        let (db, book_id) = book_with_rates(&[2, 5]).await;
        let first = refreshed_rating(&db, book_id).await;
        let second = refreshed_rating(&db, book_id).await;
        assert_eq!(Some("3.50".to_owned()), first);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rollback_discards_the_aggregate() {
        let (db, book_id) = book_with_rates(&[5]).await;

        let mut tx = db.pool.begin().await.unwrap();
        refresh_rating(&mut tx, book_id).await.unwrap();
        tx.rollback().await.unwrap();

        let book = db.fetch_book(book_id).await.unwrap();
        assert_eq!(None, book.rating);
    }
}
