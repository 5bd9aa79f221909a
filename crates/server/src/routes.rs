use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use bookstore_core::catalog::{BookListing, BookQuery, Reader};
use bookstore_core::database::types::{BookPatch, BookRecord, Decimal2, NewBook};
use bookstore_core::relations::RelationPatch;
use serde::{Deserialize, Serialize};

use crate::{auth::CurrentUser, error::AppError, state::AppState};

#[derive(Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub price: Option<Decimal2>,
    pub ordering: Option<String>,
}

pub async fn list_books_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<BookListing>>, AppError> {
    let order_by = params.ordering.as_deref().map(str::parse).transpose()?;
    let query = BookQuery {
        search: params.search,
        price: params.price,
        order_by,
    };
    let listings = state.db.list_books(&query).await?;

    Ok(Json(listings))
}

/// Extended representation: list projection plus the readers of the book.
#[derive(Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: BookListing,
    pub readers: Vec<Reader>,
}

pub async fn get_book_handler(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<i64>,
) -> Result<Json<BookDetail>, AppError> {
    let book = state.db.fetch_listing(book_id).await?;
    let readers = state.db.fetch_readers(book_id).await?;

    Ok(Json(BookDetail { book, readers }))
}

pub async fn create_book_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Json(body): Json<NewBook>,
) -> Result<(StatusCode, Json<BookRecord>), AppError> {
    let book = state.db.create_book(&body, &identity).await?;

    Ok((StatusCode::CREATED, Json(book)))
}

/// Full update payload; every field is required, unlike `BookPatch`.
#[derive(Deserialize)]
pub struct BookUpdate {
    pub name: String,
    pub price: Decimal2,
    pub author_name: String,
}

pub async fn put_book_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(book_id): Path<i64>,
    Json(body): Json<BookUpdate>,
) -> Result<Json<BookRecord>, AppError> {
    let changes = BookPatch {
        name: Some(body.name),
        price: Some(body.price),
        author_name: Some(body.author_name),
    };
    let book = state.db.update_book(book_id, &changes, &identity).await?;

    Ok(Json(book))
}

pub async fn patch_book_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(book_id): Path<i64>,
    Json(changes): Json<BookPatch>,
) -> Result<Json<BookRecord>, AppError> {
    let book = state.db.update_book(book_id, &changes, &identity).await?;

    Ok(Json(book))
}

pub async fn delete_book_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(book_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.db.delete_book(book_id, &identity).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Wire shape of a relation, mirroring the fields a caller may patch.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RelationResponse {
    pub book: i64,
    pub like: bool,
    pub in_bookmarks: bool,
    pub rate: Option<i64>,
}

pub async fn patch_relation_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    Path(book_id): Path<i64>,
    Json(patch): Json<RelationPatch>,
) -> Result<Json<RelationResponse>, AppError> {
    let relation = state
        .db
        .upsert_relation(identity.user_id, book_id, &patch)
        .await?;

    Ok(Json(RelationResponse {
        book: relation.book,
        like: relation.like,
        in_bookmarks: relation.in_bookmarks,
        rate: relation.rate,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use bookstore_core::database::Db;
    use bookstore_core::database::types::NewUser;
    use pretty_assertions::assert_eq;

    async fn state_with_user() -> (Arc<AppState>, CurrentUser) {
        let db = Db::in_memory().await.unwrap();
        let user = db
            .create_user(&NewUser::new(
                "test_user1".into(),
                "Ivan".into(),
                "Petrov".into(),
            ))
            .await
            .unwrap();
        let state = Arc::new(AppState {
            config: Config::load(),
            db,
        });
        let current = CurrentUser(bookstore_core::policy::Identity::new(user.id, false));
        (state, current)
    }

    #[tokio::test]
    async fn test_create_list_and_rate_flow() {
        let (state, current) = state_with_user().await;

        let body = NewBook::new(
            "Alice".into(),
            Decimal2::from_units(1000),
            "Author 1".into(),
        );
        let (status, Json(book)) =
            create_book_handler(State(state.clone()), current, Json(body.clone()))
                .await
                .unwrap();
        assert_eq!(StatusCode::CREATED, status);
        assert_eq!("Alice", book.name);

        let Json(relation) = patch_relation_handler(
            State(state.clone()),
            current,
            Path(book.id),
            Json(RelationPatch {
                like: Some(true),
                rate: Some(4),
                ..RelationPatch::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(
            RelationResponse {
                book: book.id,
                like: true,
                in_bookmarks: false,
                rate: Some(4),
            },
            relation
        );

        let Json(listings) = list_books_handler(
            State(state.clone()),
            Query(ListParams {
                search: None,
                price: None,
                ordering: Some("price".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(1, listings.len());
        assert_eq!(1, listings[0].annotated_likes);
        assert_eq!("4.00", listings[0].rating.unwrap().to_string());
        assert_eq!("test_user1", listings[0].owner_name);
    }

    #[tokio::test]
    async fn test_invalid_rating_is_a_bad_request() {
        let (state, current) = state_with_user().await;
        let body = NewBook::new(
            "Alice".into(),
            Decimal2::from_units(1000),
            "Author 1".into(),
        );
        let (_, Json(book)) = create_book_handler(State(state.clone()), current, Json(body))
            .await
            .unwrap();

        let result = patch_relation_handler(
            State(state),
            current,
            Path(book.id),
            Json(RelationPatch {
                rate: Some(6),
                ..RelationPatch::default()
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidRating(6))));
    }

    #[tokio::test]
    async fn test_detail_serializes_flat_with_readers() {
        let (state, current) = state_with_user().await;
        let body = NewBook::new(
            "Alice".into(),
            Decimal2::from_units(1000),
            "Author 1".into(),
        );
        let (_, Json(book)) =
            create_book_handler(State(state.clone()), current, Json(body))
                .await
                .unwrap();
        let _ = patch_relation_handler(
            State(state.clone()),
            current,
            Path(book.id),
            Json(RelationPatch {
                in_bookmarks: Some(true),
                ..RelationPatch::default()
            }),
        )
        .await
        .unwrap();

        let Json(detail) = get_book_handler(State(state), Path(book.id)).await.unwrap();
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(
            serde_json::json!({
                "id": book.id,
                "name": "Alice",
                "price": "1000.00",
                "author_name": "Author 1",
                "annotated_likes": 0,
                "rating": null,
                "owner_name": "test_user1",
                "readers": [{ "first_name": "Ivan", "last_name": "Petrov" }],
            }),
            value
        );
    }
}
