use axum::{
    Form, Json,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::entity::{Author, Book, Entity, Language, Quote, Topic};
use crate::server::AppState;
use crate::Error;

const ROUTES: &[&str] = &[
    "GET /api",
    "GET|POST|PATCH /api/topics",
    "GET /api/topics/{id}",
    "GET /api/topics/{id}/books",
    "GET /api/topics/{id}/quotes",
    "GET|POST|PATCH /api/authors",
    "GET /api/authors/{id}",
    "GET /api/authors/{id}/books",
    "GET /api/authors/{id}/quotes",
    "GET|POST|PATCH /api/languages",
    "GET /api/languages/{id}",
    "GET /api/languages/{id}/books",
    "GET /api/languages/{id}/quotes",
    "GET|POST|PATCH /api/books",
    "GET /api/books/{id}",
    "GET /api/books/{id}/quotes",
    "GET|POST|PATCH /api/quotes",
    "GET /api/quotes/{id}",
];

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

impl SearchParams {
    /// Space-separated search tokens, `None` when there is nothing to look for
    fn tokens(&self) -> Option<Vec<&str>> {
        let tokens: Vec<&str> = self
            .q
            .as_deref()?
            .split(' ')
            .filter(|token| !token.is_empty())
            .collect();
        (!tokens.is_empty()).then_some(tokens)
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct IdResponse {
    #[serde(rename = "Id")]
    pub id: i64,
}

/// Error half of every handler result, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Constraint(_) => StatusCode::CONFLICT,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        } else {
            tracing::debug!(error = %err, %status, "Request rejected");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Numeric `{id}` path segment; anything else is a JSON 400.
pub struct EntityId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for EntityId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Self(id))
    }
}

fn found<T: Serialize>(entity: Option<T>) -> Response {
    match entity {
        Some(entity) => Json(entity).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn created(id: i64) -> Response {
    (StatusCode::CREATED, Json(IdResponse { id })).into_response()
}

fn updated(id: i64) -> Response {
    Json(IdResponse { id }).into_response()
}

fn parse_id(field: &str, value: &str) -> ApiResult<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("{field}: expected an integer, got '{value}'")))
}

fn parse_page(value: &str) -> ApiResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Page: expected a non-negative integer, got '{value}'")))
}

fn parse_date(value: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("ReleaseDate: expected YYYY-MM-DD, got '{value}'")))
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// List everything, or search each token and concatenate the hits keeping the
/// first occurrence of every id.
fn list_or_search<T: Entity>(
    params: &SearchParams,
    all: impl FnOnce() -> crate::Result<Vec<T>>,
    search: impl Fn(&str) -> crate::Result<Vec<T>>,
) -> ApiResult<Json<Vec<T>>> {
    let Some(tokens) = params.tokens() else {
        return Ok(Json(all()?));
    };

    let mut seen = HashSet::new();
    let mut hits = Vec::new();
    for token in tokens {
        for entity in search(token)? {
            if seen.insert(entity.id()) {
                hits.push(entity);
            }
        }
    }
    Ok(Json(hits))
}

/// Keep the items matching any token; no tokens keeps everything.
fn filter_related<T>(items: Vec<T>, params: &SearchParams, matches: fn(&T, &str) -> bool) -> Json<Vec<T>> {
    match params.tokens() {
        Some(tokens) => Json(
            items
                .into_iter()
                .filter(|item| tokens.iter().any(|token| matches(item, token)))
                .collect(),
        ),
        None => Json(items),
    }
}

fn book_matches(book: &Book, token: &str) -> bool {
    book.title.contains(token) || book.isbn.as_deref().is_some_and(|isbn| isbn.contains(token))
}

fn quote_matches(quote: &Quote, token: &str) -> bool {
    quote.text.contains(token)
}

pub async fn help() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "routes": ROUTES,
    }))
}

// ========== Topics ==========

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TopicForm {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Topic")]
    pub topic: String,
}

pub async fn list_topics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Topic>>> {
    list_or_search(&params, || state.store.get_topics(), |t| state.store.search_topics(t))
}

pub async fn get_topic(State(state): State<Arc<AppState>>, EntityId(id): EntityId) -> ApiResult<Response> {
    Ok(found(state.store.get_topic(id)?))
}

pub async fn create_topic(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TopicForm>,
) -> ApiResult<Response> {
    let mut topic = state.store.new_topic(form.topic);
    Ok(created(topic.commit()?))
}

pub async fn update_topic(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TopicForm>,
) -> ApiResult<Response> {
    let id = parse_id("Id", &form.id)?;
    let Some(mut topic) = state.store.get_topic(id)? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    topic.label = form.topic;
    Ok(updated(topic.commit()?))
}

pub async fn books_of_topic(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Book>>> {
    let books = state.store.related_books_of_topic(id)?;
    Ok(filter_related(books, &params, book_matches))
}

pub async fn quotes_of_topic(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Quote>>> {
    let quotes = state.store.related_quotes_of_topic(id)?;
    Ok(filter_related(quotes, &params, quote_matches))
}

// ========== Authors ==========

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthorForm {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

pub async fn list_authors(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Author>>> {
    list_or_search(&params, || state.store.get_authors(), |t| state.store.search_authors(t))
}

pub async fn get_author(State(state): State<Arc<AppState>>, EntityId(id): EntityId) -> ApiResult<Response> {
    Ok(found(state.store.get_author(id)?))
}

pub async fn create_author(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AuthorForm>,
) -> ApiResult<Response> {
    let mut author = state.store.new_author(form.name);
    Ok(created(author.commit()?))
}

pub async fn update_author(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AuthorForm>,
) -> ApiResult<Response> {
    let id = parse_id("Id", &form.id)?;
    let Some(mut author) = state.store.get_author(id)? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    author.name = form.name;
    Ok(updated(author.commit()?))
}

pub async fn books_of_author(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Book>>> {
    let books = state.store.related_books_of_author(id)?;
    Ok(filter_related(books, &params, book_matches))
}

pub async fn quotes_of_author(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Quote>>> {
    let quotes = state.store.related_quotes_of_author(id)?;
    Ok(filter_related(quotes, &params, quote_matches))
}

// ========== Languages ==========

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LanguageForm {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Language")]
    pub language: String,
}

pub async fn list_languages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Language>>> {
    list_or_search(&params, || state.store.get_languages(), |t| state.store.search_languages(t))
}

pub async fn get_language(State(state): State<Arc<AppState>>, EntityId(id): EntityId) -> ApiResult<Response> {
    Ok(found(state.store.get_language(id)?))
}

pub async fn create_language(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LanguageForm>,
) -> ApiResult<Response> {
    let mut language = state.store.new_language(form.language);
    Ok(created(language.commit()?))
}

pub async fn update_language(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LanguageForm>,
) -> ApiResult<Response> {
    let id = parse_id("Id", &form.id)?;
    let Some(mut language) = state.store.get_language(id)? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    language.label = form.language;
    Ok(updated(language.commit()?))
}

pub async fn books_of_language(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Book>>> {
    let books = state.store.related_books_of_language(id)?;
    Ok(filter_related(books, &params, book_matches))
}

pub async fn quotes_of_language(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Quote>>> {
    let quotes = state.store.related_quotes_of_language(id)?;
    Ok(filter_related(quotes, &params, quote_matches))
}

// ========== Books ==========

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookForm {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "AuthorId")]
    pub author_id: String,
    #[serde(rename = "TopicId")]
    pub topic_id: String,
    #[serde(rename = "LanguageId")]
    pub language_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "ISBN")]
    pub isbn: String,
    #[serde(rename = "ReleaseDate")]
    pub release_date: String,
}

pub async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Book>>> {
    list_or_search(&params, || state.store.get_books(), |t| state.store.search_books(t))
}

pub async fn get_book(State(state): State<Arc<AppState>>, EntityId(id): EntityId) -> ApiResult<Response> {
    Ok(found(state.store.get_book(id)?))
}

pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Form(form): Form<BookForm>,
) -> ApiResult<Response> {
    let author_id = parse_id("AuthorId", &form.author_id)?;
    let topic_id = parse_id("TopicId", &form.topic_id)?;
    let language_id = parse_id("LanguageId", &form.language_id)?;

    let store = &state.store;
    let (Some(author), Some(topic), Some(language)) = (
        store.get_author(author_id)?,
        store.get_topic(topic_id)?,
        store.get_language(language_id)?,
    ) else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let mut book = store.new_book(author, topic, language, form.title);
    book.set_isbn(form.isbn);
    if !is_blank(&form.release_date) {
        book.release_date = parse_date(&form.release_date)?;
    }
    Ok(created(book.commit()?))
}

pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Form(form): Form<BookForm>,
) -> ApiResult<Response> {
    let id = parse_id("Id", &form.id)?;
    let Some(mut book) = state.store.get_book(id)? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    if !is_blank(&form.title) {
        book.title = form.title;
    }
    if !is_blank(&form.isbn) {
        book.set_isbn(form.isbn);
    }
    if !is_blank(&form.release_date) {
        book.release_date = parse_date(&form.release_date)?;
    }
    Ok(updated(book.commit()?))
}

pub async fn quotes_of_book(
    State(state): State<Arc<AppState>>,
    EntityId(id): EntityId,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Quote>>> {
    let quotes = state.store.related_quotes_of_book(id)?;
    Ok(filter_related(quotes, &params, quote_matches))
}

// ========== Quotes ==========

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuoteForm {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "BookId")]
    pub book_id: String,
    #[serde(rename = "Quote")]
    pub quote: String,
    #[serde(rename = "Page")]
    pub page: String,
}

pub async fn list_quotes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Quote>>> {
    list_or_search(&params, || state.store.get_quotes(), |t| state.store.search_quotes(t))
}

pub async fn get_quote(State(state): State<Arc<AppState>>, EntityId(id): EntityId) -> ApiResult<Response> {
    Ok(found(state.store.get_quote(id)?))
}

pub async fn create_quote(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QuoteForm>,
) -> ApiResult<Response> {
    let book_id = parse_id("BookId", &form.book_id)?;
    let Some(book) = state.store.get_book(book_id)? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let mut quote = state.store.new_quote(book, form.quote);
    if !is_blank(&form.page) {
        quote.page = parse_page(&form.page)?;
    }
    Ok(created(quote.commit()?))
}

pub async fn update_quote(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QuoteForm>,
) -> ApiResult<Response> {
    let id = parse_id("Id", &form.id)?;
    let Some(mut quote) = state.store.get_quote(id)? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    if !is_blank(&form.quote) {
        quote.text = form.quote;
    }
    if !is_blank(&form.page) {
        quote.page = parse_page(&form.page)?;
    }
    Ok(updated(quote.commit()?))
}
