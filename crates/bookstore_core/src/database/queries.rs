use crate::database::types::{BookPatch, BookRecord, NewBook, NewUser, StoreError, UserRecord};
use crate::policy::{Identity, can_modify};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr as _;

pub struct Db {
    pub(crate) pool: SqlitePool,
}

impl Db {
    /// Opens (creating if missing) the catalog database at `path` and runs the
    /// embedded migrations.
    pub async fn init(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .foreign_keys(true)
            .create_if_missing(true)
            .filename(path);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!().run(&pool).await.map_err(sqlx::Error::from)?;
        log::info!("Opened catalog database at {}", path.display());

        Ok(Self { pool })
    }

    /// In-memory database with a single pooled connection, for tests and
    /// ephemeral runs. Multiple connections would each see their own empty
    /// `:memory:` database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!().run(&pool).await.map_err(sqlx::Error::from)?;

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
        log::info!("Closed catalog database");
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StoreError> {
        let record = sqlx::query_as(
            r"
            INSERT INTO users (username, first_name, last_name, is_staff)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, username, first_name, last_name, is_staff;
        ",
        )
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_staff)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn fetch_user(&self, user_id: i64) -> Result<Option<UserRecord>, StoreError> {
        let user = sqlx::query_as(
            "SELECT id, username, first_name, last_name, is_staff FROM users WHERE id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Creates a book owned by the requesting identity. Any authenticated
    /// identity may create; the policy only guards mutation of existing books.
    pub async fn create_book(
        &self,
        book: &NewBook,
        owner: &Identity,
    ) -> Result<BookRecord, StoreError> {
        let record = sqlx::query_as(
            r"
            INSERT INTO books (name, price, author_name, owner)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, name, price, author_name, owner, rating;
        ",
        )
        .bind(&book.name)
        .bind(book.price)
        .bind(&book.author_name)
        .bind(owner.user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn fetch_book(&self, book_id: i64) -> Result<BookRecord, StoreError> {
        let book = sqlx::query_as(
            "SELECT id, name, price, author_name, owner, rating FROM books WHERE id = ?1",
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        book.ok_or(StoreError::NotFound)
    }

    /// Applies `changes` to a book. Absent fields are left untouched, so a full
    /// update is a patch with every field present. Rejected with `Forbidden`
    /// unless the identity owns the book or is staff; nothing is written on
    /// rejection.
    pub async fn update_book(
        &self,
        book_id: i64,
        changes: &BookPatch,
        identity: &Identity,
    ) -> Result<BookRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let book: Option<BookRecord> = sqlx::query_as(
            "SELECT id, name, price, author_name, owner, rating FROM books WHERE id = ?1",
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(book) = book else {
            return Err(StoreError::NotFound);
        };
        if !can_modify(identity, book.owner) {
            return Err(StoreError::Forbidden);
        }

        let name = changes.name.clone().unwrap_or_else(|| book.name.clone());
        let price = changes.price.unwrap_or(book.price);
        let author_name = changes
            .author_name
            .clone()
            .unwrap_or_else(|| book.author_name.clone());
        sqlx::query("UPDATE books SET name = ?1, price = ?2, author_name = ?3 WHERE id = ?4")
            .bind(&name)
            .bind(price)
            .bind(&author_name)
            .bind(book_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let mut updated = book;
        updated.name = name;
        updated.price = price;
        updated.author_name = author_name;
        Ok(updated)
    }

    /// Deletes a book under the same policy as `update_book`. Relation rows go
    /// with it via the cascading foreign key.
    pub async fn delete_book(&self, book_id: i64, identity: &Identity) -> Result<(), StoreError> {
        let owner: Option<Option<i64>> = sqlx::query_scalar("SELECT owner FROM books WHERE id = ?1")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(owner) = owner else {
            return Err(StoreError::NotFound);
        };
        if !can_modify(identity, owner) {
            return Err(StoreError::Forbidden);
        }

        sqlx::query("DELETE FROM books WHERE id = ?1")
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
