use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "Admin12345";
pub const OPERATOR_EMAIL: &str = "operario@example.com";
pub const OPERATOR_PASSWORD: &str = "Operario123";

const ROLE_ADMIN: u32 = 1;
const ROLE_USER: u32 = 2;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub nombre: String,
    pub email: String,
    pub rol_id: u32,
    pub created_at: String,
    #[serde(skip)]
    password: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub nombre: String,
    pub precio_cents: i64,
    pub stock: i64,
    pub categoria_id: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Category {
    pub id: u64,
    pub nombre: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: u64,
    pub producto_id: u64,
    pub usuario_id: u64,
    pub cantidad: i64,
    pub fecha: String,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct RegisterInput {
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub nombre: Option<String>,
    pub precio_cents: Option<i64>,
    pub stock: Option<i64>,
    pub categoria_id: Option<u64>,
}

#[derive(Deserialize)]
pub struct CategoryInput {
    pub nombre: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub rol_id: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub order_by: Option<String>,
    pub order_dir: Option<String>,
}

#[derive(Default)]
struct Store {
    users: BTreeMap<u64, User>,
    products: BTreeMap<u64, Product>,
    categories: BTreeMap<u64, Category>,
    movements: Vec<Movement>,
    /// access token -> user id
    sessions: HashMap<String, u64>,
    /// refresh token -> user id
    refresh_tokens: HashMap<String, u64>,
    next_id: u64,
}

impl Store {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: &str, except: Option<u64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// In-memory backend state plus the knobs tests use to force token expiry.
pub struct Backend {
    store: RwLock<Store>,
    refresh_calls: AtomicUsize,
    refresh_delay_ms: AtomicU64,
}

pub type Db = Arc<Backend>;

impl Backend {
    pub fn empty() -> Db {
        Self::with_store(Store::default())
    }

    fn with_store(store: Store) -> Db {
        Arc::new(Backend {
            store: RwLock::new(store),
            refresh_calls: AtomicUsize::new(0),
            refresh_delay_ms: AtomicU64::new(0),
        })
    }

    /// Two users (admin and operator), a category, products and movements.
    pub fn seeded() -> Db {
        let mut store = Store::default();
        for (nombre, email, password, rol_id) in [
            ("Administrador", ADMIN_EMAIL, ADMIN_PASSWORD, ROLE_ADMIN),
            ("Operario", OPERATOR_EMAIL, OPERATOR_PASSWORD, ROLE_USER),
        ] {
            let id = store.next_id();
            store.users.insert(
                id,
                User {
                    id,
                    nombre: nombre.to_string(),
                    email: email.to_string(),
                    rol_id,
                    created_at: "2024-01-01T00:00:00Z".to_string(),
                    password: password.to_string(),
                },
            );
        }
        let category_id = store.next_id();
        store.categories.insert(
            category_id,
            Category {
                id: category_id,
                nombre: "Herramientas".to_string(),
            },
        );
        for (nombre, precio_cents, stock) in [("Martillo", 1250, 10), ("Destornillador", 480, 25), ("Alicate", 990, 7)] {
            let id = store.next_id();
            store.products.insert(
                id,
                Product {
                    id,
                    nombre: nombre.to_string(),
                    precio_cents,
                    stock,
                    categoria_id: category_id,
                },
            );
        }
        let first_product = store.products.keys().next().copied().unwrap_or_default();
        let movement_id = store.next_id();
        store.movements.push(Movement {
            id: movement_id,
            producto_id: first_product,
            usuario_id: 1,
            cantidad: 5,
            fecha: "2024-02-01T09:30:00Z".to_string(),
        });
        Self::with_store(store)
    }

    /// Forget every access token, as if they had all expired.
    pub async fn expire_access_tokens(&self) {
        self.store.write().await.sessions.clear();
    }

    /// Forget every refresh token too; the next refresh gets a 401.
    pub async fn revoke_refresh_tokens(&self) {
        let mut store = self.store.write().await;
        store.sessions.clear();
        store.refresh_tokens.clear();
    }

    /// Make `/auth/refresh` wait before answering.
    pub fn set_refresh_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.refresh_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of `/auth/refresh` calls received so far.
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

/// `{ok: false, error}` with a status.
#[derive(Debug)]
pub struct ApiFailure(pub StatusCode, pub &'static str);

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.0, Json(json!({"ok": false, "error": self.1}))).into_response()
    }
}

type ApiResult = Result<Response, ApiFailure>;

const UNAUTHORIZED: ApiFailure = ApiFailure(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
const REFRESH_INVALID: ApiFailure = ApiFailure(StatusCode::UNAUTHORIZED, "REFRESH_INVALID");

pub fn app() -> Router {
    app_with_backend(Backend::seeded())
}

pub fn app_with_backend(db: Db) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
        .route("/auth/profile", get(profile))
        .route("/auth/logout", post(logout))
        .route("/productos", get(list_products).post(create_product))
        .route("/productos/{id}", patch(update_product).delete(delete_product))
        .route("/categorias", get(list_categories).post(create_category))
        .route("/categorias/{id}", patch(update_category).delete(delete_category))
        .route("/movimientos", get(list_movements))
        .route("/movimientos/export", get(export_movements))
        .route("/usuarios/public", get(list_users_public))
        .route("/usuarios/admin", get(list_users_admin).post(create_user))
        .route("/usuarios/admin/{id}", patch(update_user).delete(delete_user))
        .route("/usuarios/me/avatar", post(upload_avatar))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_backend(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_backend(db)).await
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn set_cookie(name: &str, value: &str) -> String {
    format!("{name}={value}; HttpOnly; Path=/; SameSite=Lax")
}

fn clear_cookie(name: &str) -> String {
    format!("{name}=; HttpOnly; Path=/; Max-Age=0")
}

/// User behind the request's access cookie.
async fn session_user(db: &Db, headers: &HeaderMap) -> Result<User, ApiFailure> {
    let token = cookie(headers, ACCESS_COOKIE).ok_or(UNAUTHORIZED)?;
    let store = db.store.read().await;
    store
        .sessions
        .get(&token)
        .and_then(|id| store.users.get(id))
        .cloned()
        .ok_or(UNAUTHORIZED)
}

async fn admin_user(db: &Db, headers: &HeaderMap) -> Result<User, ApiFailure> {
    let user = session_user(db, headers).await?;
    if user.rol_id != ROLE_ADMIN {
        return Err(ApiFailure(StatusCode::FORBIDDEN, "FORBIDDEN"));
    }
    Ok(user)
}

/// New cookie pair for `user_id`, as `Set-Cookie` values.
fn open_session(store: &mut Store, user_id: u64) -> [(header::HeaderName, String); 2] {
    let access = Uuid::new_v4().to_string();
    let refresh = Uuid::new_v4().to_string();
    store.sessions.insert(access.clone(), user_id);
    store.refresh_tokens.insert(refresh.clone(), user_id);
    [
        (header::SET_COOKIE, set_cookie(ACCESS_COOKIE, &access)),
        (header::SET_COOKIE, set_cookie(REFRESH_COOKIE, &refresh)),
    ]
}

fn page<T: Serialize>(rows: Vec<T>, params: &ListParams, default_order: &str) -> Value {
    let total = rows.len();
    let limit = params.limit.unwrap_or(10);
    let offset = params.offset.unwrap_or(0);
    let descending = params
        .order_dir
        .as_deref()
        .map_or(true, |dir| dir.eq_ignore_ascii_case("DESC"));

    let mut rows = rows;
    if descending {
        rows.reverse();
    }
    let items: Vec<T> = rows.into_iter().skip(offset).take(limit).collect();
    json!({
        "ok": true,
        "items": items,
        "meta": {
            "total": total,
            "limit": limit,
            "offset": offset,
            "orderBy": params.order_by.as_deref().unwrap_or(default_order),
            "orderDir": if descending { "DESC" } else { "ASC" },
        }
    })
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// --- auth ---

async fn login(State(db): State<Db>, Json(input): Json<LoginInput>) -> ApiResult {
    let (Some(email), Some(password)) = (required(input.email), input.password) else {
        return Err(ApiFailure(StatusCode::BAD_REQUEST, "LOGIN_BAD_REQUEST"));
    };
    let email = email.to_lowercase();

    let mut store = db.store.write().await;
    let user = store
        .users
        .values()
        .find(|u| u.email == email && u.password == password)
        .cloned()
        .ok_or(ApiFailure(StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"))?;
    let cookies = open_session(&mut store, user.id);
    info!(user = user.id, "login");
    Ok((AppendHeaders(cookies), Json(json!({"ok": true, "user": user}))).into_response())
}

async fn register(State(db): State<Db>, Json(input): Json<RegisterInput>) -> ApiResult {
    let (Some(nombre), Some(email), Some(password)) = (required(input.nombre), required(input.email), input.password)
    else {
        return Err(ApiFailure(StatusCode::BAD_REQUEST, "REGISTER_BAD_REQUEST"));
    };
    let email = email.to_lowercase();
    if !email.contains('@') {
        return Err(ApiFailure(StatusCode::BAD_REQUEST, "EMAIL_INVALID"));
    }
    if password.len() < 10 {
        return Err(ApiFailure(StatusCode::BAD_REQUEST, "PASSWORD_WEAK"));
    }

    let mut store = db.store.write().await;
    if store.email_taken(&email, None) {
        return Err(ApiFailure(StatusCode::CONFLICT, "EMAIL_TAKEN"));
    }
    let id = store.next_id();
    let user = User {
        id,
        nombre,
        email,
        rol_id: ROLE_USER,
        created_at: "2024-06-01T00:00:00Z".to_string(),
        password,
    };
    store.users.insert(id, user.clone());
    let cookies = open_session(&mut store, id);
    Ok((StatusCode::CREATED, AppendHeaders(cookies), Json(json!({"ok": true, "user": user}))).into_response())
}

async fn refresh(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let call = db.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let delay = db.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let token = cookie(&headers, REFRESH_COOKIE).ok_or(REFRESH_INVALID)?;
    let mut store = db.store.write().await;
    let user_id = *store.refresh_tokens.get(&token).ok_or(REFRESH_INVALID)?;
    let user = store.users.get(&user_id).cloned().ok_or(UNAUTHORIZED)?;

    let access = Uuid::new_v4().to_string();
    store.sessions.insert(access.clone(), user_id);
    debug!(call, user = user_id, "access token refreshed");
    Ok((
        [(header::SET_COOKIE, set_cookie(ACCESS_COOKIE, &access))],
        Json(json!({"ok": true, "user": user})),
    )
        .into_response())
}

async fn profile(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let user = session_user(&db, &headers).await?;
    Ok(Json(json!({"ok": true, "user": user})).into_response())
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Response {
    let mut store = db.store.write().await;
    if let Some(token) = cookie(&headers, ACCESS_COOKIE) {
        store.sessions.remove(&token);
    }
    if let Some(token) = cookie(&headers, REFRESH_COOKIE) {
        store.refresh_tokens.remove(&token);
    }
    (
        AppendHeaders([
            (header::SET_COOKIE, clear_cookie(ACCESS_COOKIE)),
            (header::SET_COOKIE, clear_cookie(REFRESH_COOKIE)),
        ]),
        Json(json!({"ok": true})),
    )
        .into_response()
}

// --- productos ---

async fn list_products(State(db): State<Db>, headers: HeaderMap, Query(params): Query<ListParams>) -> ApiResult {
    session_user(&db, &headers).await?;
    let rows: Vec<Product> = db.store.read().await.products.values().cloned().collect();
    Ok(Json(page(rows, &params, "createdAt")).into_response())
}

async fn create_product(State(db): State<Db>, headers: HeaderMap, Json(input): Json<ProductInput>) -> ApiResult {
    session_user(&db, &headers).await?;
    let nombre = required(input.nombre).ok_or(ApiFailure(StatusCode::BAD_REQUEST, "PRODUCT_BAD_REQUEST"))?;
    if nombre.chars().count() < 3 {
        return Err(ApiFailure(StatusCode::BAD_REQUEST, "PRODUCT_NAME_TOO_SHORT"));
    }
    let mut store = db.store.write().await;
    let categoria_id = input
        .categoria_id
        .filter(|id| store.categories.contains_key(id))
        .ok_or(ApiFailure(StatusCode::BAD_REQUEST, "CATEGORY_NOT_FOUND"))?;
    let id = store.next_id();
    let product = Product {
        id,
        nombre,
        precio_cents: input.precio_cents.unwrap_or(0),
        stock: input.stock.unwrap_or(0),
        categoria_id,
    };
    store.products.insert(id, product.clone());
    Ok((StatusCode::CREATED, Json(json!({"ok": true, "item": product}))).into_response())
}

async fn update_product(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(input): Json<ProductInput>,
) -> ApiResult {
    session_user(&db, &headers).await?;
    let mut store = db.store.write().await;
    let product = store
        .products
        .get_mut(&id)
        .ok_or(ApiFailure(StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND"))?;
    if let Some(nombre) = required(input.nombre) {
        product.nombre = nombre;
    }
    if let Some(precio_cents) = input.precio_cents {
        product.precio_cents = precio_cents;
    }
    if let Some(stock) = input.stock {
        product.stock = stock;
    }
    if let Some(categoria_id) = input.categoria_id {
        product.categoria_id = categoria_id;
    }
    Ok(Json(json!({"ok": true, "item": product})).into_response())
}

async fn delete_product(State(db): State<Db>, headers: HeaderMap, Path(id): Path<u64>) -> ApiResult {
    session_user(&db, &headers).await?;
    let mut store = db.store.write().await;
    if store.movements.iter().any(|m| m.producto_id == id) {
        return Err(ApiFailure(StatusCode::CONFLICT, "PRODUCT_IN_USE"));
    }
    store
        .products
        .remove(&id)
        .ok_or(ApiFailure(StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND"))?;
    Ok(Json(json!({"ok": true})).into_response())
}

// --- categorias ---

async fn list_categories(State(db): State<Db>, headers: HeaderMap, Query(params): Query<ListParams>) -> ApiResult {
    session_user(&db, &headers).await?;
    let rows: Vec<Category> = db.store.read().await.categories.values().cloned().collect();
    Ok(Json(page(rows, &params, "createdAt")).into_response())
}

async fn create_category(State(db): State<Db>, headers: HeaderMap, Json(input): Json<CategoryInput>) -> ApiResult {
    session_user(&db, &headers).await?;
    let nombre = required(input.nombre).ok_or(ApiFailure(StatusCode::BAD_REQUEST, "CATEGORY_BAD_REQUEST"))?;
    let mut store = db.store.write().await;
    let id = store.next_id();
    let category = Category { id, nombre };
    store.categories.insert(id, category.clone());
    Ok((StatusCode::CREATED, Json(json!({"ok": true, "item": category}))).into_response())
}

async fn update_category(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(input): Json<CategoryInput>,
) -> ApiResult {
    session_user(&db, &headers).await?;
    let nombre = required(input.nombre).ok_or(ApiFailure(StatusCode::BAD_REQUEST, "CATEGORY_BAD_REQUEST"))?;
    let mut store = db.store.write().await;
    let category = store
        .categories
        .get_mut(&id)
        .ok_or(ApiFailure(StatusCode::NOT_FOUND, "CATEGORY_NOT_FOUND"))?;
    category.nombre = nombre;
    Ok(Json(json!({"ok": true, "item": category})).into_response())
}

async fn delete_category(State(db): State<Db>, headers: HeaderMap, Path(id): Path<u64>) -> ApiResult {
    session_user(&db, &headers).await?;
    let mut store = db.store.write().await;
    if store.products.values().any(|p| p.categoria_id == id) {
        return Err(ApiFailure(StatusCode::CONFLICT, "CATEGORY_IN_USE"));
    }
    store
        .categories
        .remove(&id)
        .ok_or(ApiFailure(StatusCode::NOT_FOUND, "CATEGORY_NOT_FOUND"))?;
    Ok(Json(json!({"ok": true})).into_response())
}

// --- movimientos ---

async fn list_movements(State(db): State<Db>, headers: HeaderMap, Query(params): Query<ListParams>) -> ApiResult {
    session_user(&db, &headers).await?;
    let rows = db.store.read().await.movements.clone();
    Ok(Json(page(rows, &params, "fecha")).into_response())
}

/// All movements as CSV, oldest first.
async fn export_movements(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    session_user(&db, &headers).await?;
    let store = db.store.read().await;
    let mut csv = String::from("id,productoId,usuarioId,cantidad,fecha\n");
    for m in &store.movements {
        csv.push_str(&format!("{},{},{},{},{}\n", m.id, m.producto_id, m.usuario_id, m.cantidad, m.fecha));
    }
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response())
}

// --- usuarios ---

async fn list_users_public(State(db): State<Db>, headers: HeaderMap, Query(params): Query<ListParams>) -> ApiResult {
    session_user(&db, &headers).await?;
    let rows: Vec<Value> = db
        .store
        .read()
        .await
        .users
        .values()
        .map(|u| json!({"id": u.id, "nombre": u.nombre}))
        .collect();
    Ok(Json(page(rows, &params, "createdAt")).into_response())
}

async fn list_users_admin(State(db): State<Db>, headers: HeaderMap, Query(params): Query<ListParams>) -> ApiResult {
    admin_user(&db, &headers).await?;
    let rows: Vec<User> = db.store.read().await.users.values().cloned().collect();
    Ok(Json(page(rows, &params, "createdAt")).into_response())
}

async fn create_user(State(db): State<Db>, headers: HeaderMap, Json(input): Json<UserInput>) -> ApiResult {
    admin_user(&db, &headers).await?;
    let (Some(nombre), Some(email), Some(password)) = (required(input.nombre), required(input.email), input.password)
    else {
        return Err(ApiFailure(StatusCode::BAD_REQUEST, "USER_BAD_REQUEST"));
    };
    let email = email.to_lowercase();
    if !email.contains('@') {
        return Err(ApiFailure(StatusCode::BAD_REQUEST, "EMAIL_INVALID"));
    }
    if password.len() < 10 {
        return Err(ApiFailure(StatusCode::BAD_REQUEST, "PASSWORD_WEAK"));
    }
    let mut store = db.store.write().await;
    if store.email_taken(&email, None) {
        return Err(ApiFailure(StatusCode::CONFLICT, "EMAIL_TAKEN"));
    }
    let id = store.next_id();
    let user = User {
        id,
        nombre,
        email,
        rol_id: input.rol_id.unwrap_or(ROLE_USER),
        created_at: "2024-06-01T00:00:00Z".to_string(),
        password,
    };
    store.users.insert(id, user.clone());
    Ok((StatusCode::CREATED, Json(json!({"ok": true, "user": user}))).into_response())
}

async fn update_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(input): Json<UserInput>,
) -> ApiResult {
    admin_user(&db, &headers).await?;
    let mut store = db.store.write().await;
    let email = required(input.email).map(|e| e.to_lowercase());
    if let Some(email) = &email {
        if store.email_taken(email, Some(id)) {
            return Err(ApiFailure(StatusCode::CONFLICT, "EMAIL_TAKEN"));
        }
    }
    let user = store
        .users
        .get_mut(&id)
        .ok_or(ApiFailure(StatusCode::NOT_FOUND, "USER_NOT_FOUND"))?;
    if let Some(nombre) = required(input.nombre) {
        user.nombre = nombre;
    }
    if let Some(email) = email {
        user.email = email;
    }
    if let Some(rol_id) = input.rol_id {
        user.rol_id = rol_id;
    }
    Ok(Json(json!({"ok": true, "user": user})).into_response())
}

async fn delete_user(State(db): State<Db>, headers: HeaderMap, Path(id): Path<u64>) -> ApiResult {
    admin_user(&db, &headers).await?;
    let mut store = db.store.write().await;
    if store.movements.iter().any(|m| m.usuario_id == id) {
        return Err(ApiFailure(StatusCode::CONFLICT, "USER_IN_USE"));
    }
    store
        .users
        .remove(&id)
        .ok_or(ApiFailure(StatusCode::NOT_FOUND, "USER_NOT_FOUND"))?;
    store.sessions.retain(|_, user| *user != id);
    store.refresh_tokens.retain(|_, user| *user != id);
    Ok(Json(json!({"ok": true})).into_response())
}

async fn upload_avatar(State(db): State<Db>, headers: HeaderMap, body: Bytes) -> ApiResult {
    let user = session_user(&db, &headers).await?;
    let is_multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));
    if !is_multipart || body.is_empty() {
        return Err(ApiFailure(StatusCode::BAD_REQUEST, "FILE_REQUIRED"));
    }
    Ok(Json(json!({"ok": true, "userId": user.id, "bytes": body.len()})).into_response())
}
