//! Web Interface Routes
//!
//! Server-rendered pages over the same item service the JSON API uses.
//! Authentication is a session cookie instead of a bearer token, and every
//! successful POST answers with a redirect.
//!
//! Pages are small escaped string templates. One-shot notices travel in the
//! `stockroom_flash` cookie and are consumed by the next page render.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use stockroom_core::{Item, ItemFields, RegisterFields, StockroomError, StorageError};
use stockroom_storage::UserStore;

use crate::{
    error::{ApiError, ErrorCode},
    extractors::PathId,
    middleware::{session_middleware, AuthExtractor, SIGNIN_PATH},
    routes::auth::{check_credentials, register_user},
    service::ItemOperations,
    sessions::{SessionStore, SESSION_COOKIE_NAME},
    state::AppState,
};

pub const FLASH_COOKIE_NAME: &str = "stockroom_flash";

const DASHBOARD_PATH: &str = "/";
const CREATE_ITEM_PATH: &str = "/items/create/";

// ============================================================================
// FLASH MESSAGES
// ============================================================================

/// A notice shown once on the next rendered page.
///
/// The cookie carries only the code; the text is looked up at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    ItemExists,
    ItemUpdated,
    ItemDeleted,
}

impl Flash {
    pub fn code(self) -> &'static str {
        match self {
            Flash::ItemExists => "item_exists",
            Flash::ItemUpdated => "item_updated",
            Flash::ItemDeleted => "item_deleted",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "item_exists" => Some(Flash::ItemExists),
            "item_updated" => Some(Flash::ItemUpdated),
            "item_deleted" => Some(Flash::ItemDeleted),
            _ => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Flash::ItemExists => "Item already exists.",
            Flash::ItemUpdated => "Item updated successfully.",
            Flash::ItemDeleted => "Item deleted successfully.",
        }
    }

    fn level(self) -> &'static str {
        match self {
            Flash::ItemExists => "error",
            Flash::ItemUpdated | Flash::ItemDeleted => "success",
        }
    }
}

fn flash_cookie(flash: Flash) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE_NAME, flash.code()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn flash_removal() -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE_NAME, "")).path("/").build()
}

/// Read and clear the pending flash, if any.
fn take_flash(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    match jar.get(FLASH_COOKIE_NAME).map(|c| Flash::from_code(c.value())) {
        Some(flash) => (jar.remove(flash_removal()), flash),
        None => (jar, None),
    }
}

fn redirect_with_flash(jar: CookieJar, to: &str, flash: Flash) -> Response {
    (jar.add(flash_cookie(flash)), Redirect::to(to)).into_response()
}

// ============================================================================
// HTML TEMPLATES
// ============================================================================

/// Escape text for HTML element content and quoted attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

fn page(title: &str, username: Option<&str>, flash: Option<Flash>, body: &str) -> Html<String> {
    let nav = match username {
        Some(name) => format!(
            r#"<nav><a href="/">Dashboard</a> | <a href="/items/create/">New item</a> | {} <a href="/signout/">Sign out</a></nav>"#,
            escape(name)
        ),
        None => r#"<nav><a href="/signin/">Sign in</a> | <a href="/signup/">Sign up</a></nav>"#
            .to_string(),
    };
    let notice = flash
        .map(|f| format!(r#"<p class="flash {}">{}</p>"#, f.level(), escape(f.message())))
        .unwrap_or_default();

    Html(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title} - Stockroom</title></head>\
         <body>{nav}{notice}<h1>{title}</h1>{body}</body></html>",
        title = escape(title),
        nav = nav,
        notice = notice,
        body = body,
    ))
}

fn error_list(error: Option<&str>) -> String {
    error
        .map(|e| format!(r#"<ul class="errors"><li>{}</li></ul>"#, escape(e)))
        .unwrap_or_default()
}

fn account_form(action: &str, submit: &str, username: &str, confirm: bool, error: Option<&str>) -> String {
    let (password_field, confirm_field) = if confirm {
        (
            r#"<label>Password <input type="password" name="password1"></label>"#,
            r#"<label>Password confirmation <input type="password" name="password2"></label>"#,
        )
    } else {
        (r#"<label>Password <input type="password" name="password"></label>"#, "")
    };
    format!(
        r#"{errors}<form method="post" action="{action}"><label>Username <input type="text" name="username" value="{username}"></label>{password_field}{confirm_field}<button type="submit">{submit}</button></form>"#,
        errors = error_list(error),
        action = action,
        username = escape(username),
        password_field = password_field,
        confirm_field = confirm_field,
        submit = escape(submit),
    )
}

fn item_form(action: &str, submit: &str, form: &ItemForm, error: Option<&str>) -> String {
    format!(
        r#"{errors}<form method="post" action="{action}"><label>Name <input type="text" name="name" value="{name}"></label><label>Description <textarea name="description">{description}</textarea></label><label>Quantity <input type="number" min="0" name="quantity" value="{quantity}"></label><label>Price <input type="number" min="0" name="price" value="{price}"></label><button type="submit">{submit}</button></form>"#,
        errors = error_list(error),
        action = escape(action),
        name = escape(&form.name),
        description = escape(&form.description),
        quantity = escape(&form.quantity),
        price = escape(&form.price),
        submit = escape(submit),
    )
}

fn item_rows(items: &[Item]) -> String {
    if items.is_empty() {
        return "<p>No items yet.</p>".to_string();
    }
    let rows: String = items
        .iter()
        .map(|item| {
            format!(
                r#"<tr><td>{name}</td><td>{description}</td><td>{quantity}</td><td>{price}</td><td><a href="/items/{id}/edit/">Edit</a> <a href="/items/{id}/delete/">Delete</a></td></tr>"#,
                id = item.id,
                name = escape(&item.name),
                description = escape(&item.description),
                quantity = item.quantity,
                price = item.price,
            )
        })
        .collect();
    format!(
        "<table><thead><tr><th>Name</th><th>Description</th><th>Quantity</th><th>Price</th><th></th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

// ============================================================================
// ERRORS
// ============================================================================

/// An error rendered as an HTML page instead of a JSON body.
#[derive(Debug)]
pub struct WebError(pub ApiError);

impl From<ApiError> for WebError {
    fn from(err: ApiError) -> Self {
        WebError(err)
    }
}

impl From<StockroomError> for WebError {
    fn from(err: StockroomError) -> Self {
        WebError(err.into())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let message = match self.0.code {
            ErrorCode::EntityNotFound => "The requested item does not exist.",
            ErrorCode::ValidationFailed | ErrorCode::InvalidInput | ErrorCode::MissingField => {
                "The request was not valid."
            }
            _ => "Something went wrong. Please try again later.",
        };
        let title = status.canonical_reason().unwrap_or("Error");
        let body = format!(r#"<p>{}</p><p><a href="/">Back to dashboard</a></p>"#, escape(message));
        (status, page(title, None, None, &body)).into_response()
    }
}

type WebResult<T> = Result<T, WebError>;

// ============================================================================
// FORMS
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Raw item form values, kept as text so a bad number can be re-displayed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub price: String,
}

fn parse_count(raw: &str, field: &str) -> Result<i64, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<i64>()
        .map_err(|_| format!("{}: enter a whole number.", field))
}

impl ItemForm {
    fn from_item(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            description: item.description.clone(),
            quantity: item.quantity.to_string(),
            price: item.price.to_string(),
        }
    }

    /// Parse into item fields. Blank numbers default to zero.
    fn to_fields(&self) -> Result<ItemFields, String> {
        let fields = ItemFields {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            quantity: parse_count(&self.quantity, "Quantity")?,
            price: parse_count(&self.price, "Price")?,
        };
        fields.validate().map_err(|e| e.to_string())?;
        Ok(fields)
    }
}

fn start_session(sessions: &SessionStore, jar: CookieJar, user: &stockroom_core::User) -> Response {
    let id = sessions.create(user);
    (jar.add(sessions.session_cookie(id)), Redirect::to(DASHBOARD_PATH)).into_response()
}

// ============================================================================
// ACCOUNT PAGES
// ============================================================================

pub async fn signup_page() -> Html<String> {
    page("Sign up", None, None, &account_form("/signup/", "Sign up", "", true, None))
}

pub async fn signup(
    State(users): State<Arc<dyn UserStore>>,
    State(sessions): State<Arc<SessionStore>>,
    jar: CookieJar,
    Form(form): Form<SignUpForm>,
) -> WebResult<Response> {
    let fields = RegisterFields {
        username: form.username.clone(),
        password: form.password1,
        password2: form.password2,
        ..RegisterFields::default()
    };

    match register_user(users.as_ref(), fields).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "New user registered via frontend");
            Ok(start_session(&sessions, jar, &user))
        }
        Err(e) if e.status_code() == StatusCode::BAD_REQUEST => {
            let body = account_form("/signup/", "Sign up", &form.username, true, Some(&e.message));
            Ok(page("Sign up", None, None, &body).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn signin_page() -> Html<String> {
    page("Sign in", None, None, &account_form("/signin/", "Sign in", "", false, None))
}

pub async fn signin(
    State(users): State<Arc<dyn UserStore>>,
    State(sessions): State<Arc<SessionStore>>,
    jar: CookieJar,
    Form(form): Form<SignInForm>,
) -> WebResult<Response> {
    match check_credentials(users.as_ref(), &form.username, &form.password).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "User logged in via frontend");
            Ok(start_session(&sessions, jar, &user))
        }
        Err(e) if e.code == ErrorCode::InvalidCredentials => {
            let body = account_form(
                "/signin/",
                "Sign in",
                &form.username,
                false,
                Some("Please enter a correct username and password. Note that both fields may be case-sensitive."),
            );
            Ok(page("Sign in", None, None, &body).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn signout(State(sessions): State<Arc<SessionStore>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        sessions.destroy(cookie.value());
        tracing::info!("User logged out via frontend");
    }
    (jar.remove(sessions.removal_cookie()), Redirect::to(SIGNIN_PATH)).into_response()
}

// ============================================================================
// ITEM PAGES (session required)
// ============================================================================

pub async fn dashboard(
    State(items): State<Arc<dyn ItemOperations>>,
    AuthExtractor(auth): AuthExtractor,
    jar: CookieJar,
) -> WebResult<Response> {
    let all = items.list(&auth).await?;
    let (jar, flash) = take_flash(jar);
    let body = item_rows(&all);
    Ok((jar, page("Inventory", Some(&auth.username), flash, &body)).into_response())
}

pub async fn create_item_page(AuthExtractor(auth): AuthExtractor, jar: CookieJar) -> Response {
    let (jar, flash) = take_flash(jar);
    let body = item_form(CREATE_ITEM_PATH, "Create", &ItemForm::default(), None);
    (jar, page("New item", Some(&auth.username), flash, &body)).into_response()
}

pub async fn create_item(
    State(items): State<Arc<dyn ItemOperations>>,
    AuthExtractor(auth): AuthExtractor,
    jar: CookieJar,
    Form(form): Form<ItemForm>,
) -> WebResult<Response> {
    let fields = match form.to_fields() {
        Ok(fields) => fields,
        Err(message) => {
            let body = item_form(CREATE_ITEM_PATH, "Create", &form, Some(&message));
            return Ok(page("New item", Some(&auth.username), None, &body).into_response());
        }
    };

    match items.create(&auth, fields).await {
        Ok(item) => {
            tracing::info!(item_id = %item.id, "Item created via frontend");
            Ok(Redirect::to(DASHBOARD_PATH).into_response())
        }
        Err(StockroomError::Storage(StorageError::Conflict { .. })) => {
            Ok(redirect_with_flash(jar, CREATE_ITEM_PATH, Flash::ItemExists))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn edit_item_page(
    State(items): State<Arc<dyn ItemOperations>>,
    AuthExtractor(auth): AuthExtractor,
    path: Result<PathId, ApiError>,
    jar: CookieJar,
) -> WebResult<Response> {
    let PathId(id) = path?;
    let item = items.get(&auth, id).await?.into_value();
    let (jar, flash) = take_flash(jar);
    let action = format!("/items/{}/edit/", id);
    let body = item_form(&action, "Save", &ItemForm::from_item(&item), None);
    Ok((jar, page("Edit item", Some(&auth.username), flash, &body)).into_response())
}

pub async fn edit_item(
    State(items): State<Arc<dyn ItemOperations>>,
    AuthExtractor(auth): AuthExtractor,
    path: Result<PathId, ApiError>,
    jar: CookieJar,
    Form(form): Form<ItemForm>,
) -> WebResult<Response> {
    let PathId(id) = path?;
    let action = format!("/items/{}/edit/", id);

    let fields = match form.to_fields() {
        Ok(fields) => fields,
        Err(message) => {
            let body = item_form(&action, "Save", &form, Some(&message));
            return Ok(page("Edit item", Some(&auth.username), None, &body).into_response());
        }
    };

    match items.update(&auth, id, fields).await {
        Ok(item) => {
            tracing::info!(item_id = %item.id, "Item updated via frontend");
            Ok(redirect_with_flash(jar, DASHBOARD_PATH, Flash::ItemUpdated))
        }
        Err(StockroomError::Storage(StorageError::Conflict { .. })) => {
            Ok(redirect_with_flash(jar, &action, Flash::ItemExists))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_item_page(
    State(items): State<Arc<dyn ItemOperations>>,
    AuthExtractor(auth): AuthExtractor,
    path: Result<PathId, ApiError>,
) -> WebResult<Html<String>> {
    let PathId(id) = path?;
    let item = items.get(&auth, id).await?.into_value();
    let body = format!(
        r#"<p>Are you sure you want to delete "{name}"?</p><form method="post" action="/items/{id}/delete/"><button type="submit">Delete</button> <a href="/">Cancel</a></form>"#,
        name = escape(&item.name),
        id = id,
    );
    Ok(page("Delete item", Some(&auth.username), None, &body))
}

pub async fn delete_item(
    State(items): State<Arc<dyn ItemOperations>>,
    AuthExtractor(auth): AuthExtractor,
    path: Result<PathId, ApiError>,
    jar: CookieJar,
) -> WebResult<Response> {
    let PathId(id) = path?;
    items.delete(&auth, id).await?;
    tracing::info!(item_id = %id, "Item deleted via frontend");
    Ok(redirect_with_flash(jar, DASHBOARD_PATH, Flash::ItemDeleted))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the web routes. Item pages require a session; account pages don't.
pub fn create_router(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/", get(dashboard))
        .route("/items/create/", get(create_item_page).post(create_item))
        .route("/items/:id/edit/", get(edit_item_page).post(edit_item))
        .route("/items/:id/delete/", get(delete_item_page).post(delete_item))
        .route_layer(from_fn_with_state(state.sessions.clone(), session_middleware));

    Router::new()
        .route("/signup/", get(signup_page).post(signup))
        .route("/signin/", get(signin_page).post(signin))
        .route("/signout/", get(signout))
        .merge(protected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape("O'Brien"), "O&#x27;Brien");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_flash_codes() {
        for flash in [Flash::ItemExists, Flash::ItemUpdated, Flash::ItemDeleted] {
            assert_eq!(Flash::from_code(flash.code()), Some(flash));
        }
        assert_eq!(Flash::from_code("bogus"), None);
        assert_eq!(Flash::ItemExists.message(), "Item already exists.");
    }

    #[test]
    fn test_item_form_parsing() {
        let form = ItemForm {
            name: " Bolt ".to_string(),
            description: String::new(),
            quantity: String::new(),
            price: "250".to_string(),
        };
        assert_eq!(form.to_fields(), Ok(ItemFields::new("Bolt").with_price(250)));

        let bad = ItemForm {
            quantity: "lots".to_string(),
            ..form.clone()
        };
        assert!(bad.to_fields().is_err_and(|e| e.contains("Quantity")));

        let negative = ItemForm {
            price: "-1".to_string(),
            ..form
        };
        assert!(negative.to_fields().is_err());
    }

    #[test]
    fn test_page_escapes_item_names() {
        let now = chrono::Utc::now();
        let item = Item::from_fields(stockroom_core::ItemId(1), ItemFields::new("<b>Bolt</b>"), now);
        let html = item_rows(&[item]);
        assert!(html.contains("&lt;b&gt;Bolt&lt;/b&gt;"));
        assert!(html.contains("/items/1/edit/"));
    }

    #[test]
    fn test_take_flash_consumes_cookie() {
        let jar = CookieJar::new().add(flash_cookie(Flash::ItemDeleted));
        let (jar, flash) = take_flash(jar);
        assert_eq!(flash, Some(Flash::ItemDeleted));
        assert!(jar.get(FLASH_COOKIE_NAME).is_none());
    }
}
