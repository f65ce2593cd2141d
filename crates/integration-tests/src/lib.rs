//! Integration tests for Officine.
//!
//! The tests run the real [`ApiClient`] against an in-process fake of the
//! back-office REST API, served by axum on an ephemeral port. No external
//! service is needed:
//!
//! ```bash
//! cargo test -p officine-integration-tests
//! ```
//!
//! The fake keeps its data in memory. Tests seed it, tweak its behavior
//! through [`FakeBackend::with_state`] (page size, failing pages, slow
//! dashboard periods) and inspect the requests it received.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use officine_client::{ApiClient, ApiError, ClientConfig, Session};
use secrecy::SecretString;
use serde_json::{Map, Value, json};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Password of every seeded account.
pub const PASSWORD: &str = "secret";

/// Seeded pharmacist account.
pub const PHARMACIST: &str = "amel";

/// Seeded accountant account.
pub const ACCOUNTANT: &str = "karim";

type Shared = Arc<Mutex<BackendState>>;

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// State
// ============================================================================

/// A registered user.
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub profile: Value,
}

/// A period-scoped dashboard answer, optionally served late.
#[derive(Debug, Clone)]
pub struct PeriodSnapshot {
    pub body: Value,
    pub delay: Duration,
}

/// The entity collections the fake serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Suppliers,
    Invoices,
    CreditNotes,
}

impl Collection {
    const fn segment(self) -> &'static str {
        match self {
            Self::Suppliers => "suppliers",
            Self::Invoices => "invoices",
            Self::CreditNotes => "credit-notes",
        }
    }

    const fn required_field(self) -> &'static str {
        match self {
            Self::Suppliers => "name",
            Self::Invoices => "invoice_number",
            Self::CreditNotes => "credit_note_number",
        }
    }
}

/// Everything the fake backend knows.
#[derive(Debug)]
pub struct BackendState {
    pub base_url: String,
    pub accounts: Vec<Account>,
    /// Live tokens and the username they belong to.
    pub tokens: HashMap<String, String>,
    pub suppliers: Vec<Value>,
    pub invoices: Vec<Value>,
    pub credit_notes: Vec<Value>,
    /// Page size used when the request does not name one.
    pub page_size: usize,
    /// Pages answered with a 500.
    pub failing_pages: HashSet<(Collection, usize)>,
    /// Unfiltered dashboard answer.
    pub dashboard: Value,
    /// Answers for `?month=MM&year=YYYY`, keyed `MM/YYYY`.
    pub period_dashboards: HashMap<String, PeriodSnapshot>,
    pub monthly_report: Value,
    /// `METHOD /path?query` of every request received, in order.
    pub requests: Vec<String>,
    next_id: u64,
}

impl BackendState {
    fn new(base_url: String) -> Self {
        let accounts = vec![
            account(1, PHARMACIST, "Amel", "Benali", "PHARMACIEN"),
            account(2, ACCOUNTANT, "Karim", "Haddad", "COMPTABLE"),
        ];
        Self {
            base_url,
            accounts,
            tokens: HashMap::new(),
            suppliers: Vec::new(),
            invoices: Vec::new(),
            credit_notes: Vec::new(),
            page_size: 20,
            failing_pages: HashSet::new(),
            dashboard: Value::Null,
            period_dashboards: HashMap::new(),
            monthly_report: Value::Null,
            requests: Vec::new(),
            next_id: 100,
        }
    }

    const fn items(&mut self, collection: Collection) -> &mut Vec<Value> {
        match collection {
            Collection::Suppliers => &mut self.suppliers,
            Collection::Invoices => &mut self.invoices,
            Collection::CreditNotes => &mut self.credit_notes,
        }
    }

    /// Store `object` with a fresh id and return that id.
    pub fn insert(&mut self, collection: Collection, mut object: Value) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        if let Value::Object(map) = &mut object {
            map.insert("id".to_owned(), json!(id));
        }
        self.items(collection).push(object);
        id
    }

    fn supplier_name(&self, id: &Value) -> Option<Value> {
        let id = id_text(id)?;
        self.suppliers
            .iter()
            .find(|s| id_text(&s["id"]).as_deref() == Some(id.as_str()))
            .map(|s| s["name"].clone())
    }
}

fn account(id: u64, username: &str, first: &str, last: &str, role: &str) -> Account {
    Account {
        username: username.to_owned(),
        password: PASSWORD.to_owned(),
        profile: json!({
            "id": id,
            "username": username,
            "email": format!("{username}@officine.test"),
            "first_name": first,
            "last_name": last,
            "role": role,
            "pharmacy_name": "Pharmacie Centrale",
        }),
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

// ============================================================================
// Server
// ============================================================================

/// An in-process fake of the back-office REST API.
pub struct FakeBackend {
    base_url: String,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns error if no local port can be bound.
    pub async fn spawn() -> std::io::Result<Self> {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let state: Shared = Arc::new(Mutex::new(BackendState::new(base_url.clone())));

        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Fake backend stopped: {e}");
            }
        });

        Ok(Self {
            base_url,
            state,
            server,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A client on an in-memory session.
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be built.
    pub fn client(&self) -> Result<ApiClient, ApiError> {
        self.client_with(Session::in_memory())
    }

    /// A client on `session`.
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be built.
    pub fn client_with(&self, session: Session) -> Result<ApiClient, ApiError> {
        let config = ClientConfig::for_base_url(&self.base_url)
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        ApiClient::new(&config, session)
    }

    /// A client signed in as `username`.
    ///
    /// # Errors
    ///
    /// Returns error if the sign-in fails.
    pub async fn signed_in(&self, username: &str) -> Result<ApiClient, ApiError> {
        let client = self.client()?;
        client
            .login(username, &SecretString::from(PASSWORD.to_owned()))
            .await?;
        Ok(client)
    }

    /// Read or change the fake's state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut BackendState) -> R) -> R {
        f(&mut lock(&self.state))
    }

    /// Store an entity and return its id.
    pub fn seed(&self, collection: Collection, object: Value) -> u64 {
        self.with_state(|state| state.insert(collection, object))
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }

    /// Requests received so far whose path starts with `prefix`.
    #[must_use]
    pub fn requests_to(&self, prefix: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|line| {
                line.split_once(' ')
                    .is_some_and(|(_, path)| path.starts_with(prefix))
            })
            .collect()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/health/", get(|| async { Json(json!({"status": "ok"})) }))
        .route("/api/auth/login/", post(login))
        .route("/api/auth/register/", post(register))
        .route("/api/auth/refresh/", post(refresh))
        .route("/api/auth/user/", get(current_user))
        .route("/api/auth/change-password/", post(change_password))
        .route("/api/reports/dashboard/", get(dashboard))
        .route("/api/reports/monthly/", get(monthly_report))
        .merge(collection_routes(Collection::Suppliers))
        .merge(collection_routes(Collection::Invoices))
        .merge(collection_routes(Collection::CreditNotes))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), record))
        .with_state(state)
}

fn collection_routes(collection: Collection) -> Router<Shared> {
    let base = format!("/api/{}/", collection.segment());
    let item = format!("/api/{}/{{id}}/", collection.segment());
    Router::new()
        .route(
            &base,
            get(
                move |State(state): State<Shared>,
                      Query(query): Query<HashMap<String, String>>,
                      headers: HeaderMap| list(collection, state, query, headers),
            )
            .post(
                move |State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>| {
                    create(collection, state, headers, body)
                },
            ),
        )
        .route(
            &item,
            get(
                move |State(state): State<Shared>, Path(id): Path<String>, headers: HeaderMap| {
                    retrieve(collection, state, id, headers)
                },
            )
            .put(
                move |State(state): State<Shared>,
                      Path(id): Path<String>,
                      headers: HeaderMap,
                      Json(body): Json<Value>| {
                    update(collection, state, id, headers, body)
                },
            )
            .patch(
                move |State(state): State<Shared>,
                      Path(id): Path<String>,
                      headers: HeaderMap,
                      Json(body): Json<Value>| {
                    update(collection, state, id, headers, body)
                },
            )
            .delete(
                move |State(state): State<Shared>, Path(id): Path<String>, headers: HeaderMap| {
                    remove(collection, state, id, headers)
                },
            ),
        )
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let line = format!("{} {}", request.method(), request.uri());
    lock(&state).requests.push(line);
    next.run(request).await
}

// ============================================================================
// Handlers
// ============================================================================

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Informations d'authentification non fournies."})),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Pas trouvé."}))).into_response()
}

fn bad_request(body: Value) -> Response {
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Username behind the `Authorization: Token ...` header.
fn authenticate(state: &BackendState, headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Token "))
        .and_then(|token| state.tokens.get(token))
        .cloned()
        .ok_or_else(unauthorized)
}

fn issue_token(state: &mut BackendState, username: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    state.tokens.insert(token.clone(), username.to_owned());
    token
}

fn profile_of<'a>(state: &'a BackendState, username: &str) -> Option<&'a Value> {
    state
        .accounts
        .iter()
        .find(|a| a.username == username)
        .map(|a| &a.profile)
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&state);
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let Some(profile) = state
        .accounts
        .iter()
        .find(|a| a.username == username && a.password == password)
        .map(|a| a.profile.clone())
    else {
        return bad_request(json!({"non_field_errors": ["Identifiants invalides."]}));
    };
    let token = issue_token(&mut state, username);
    Json(json!({"token": token, "user": profile})).into_response()
}

async fn register(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&state);
    let username = body["username"].as_str().unwrap_or_default().to_owned();
    if state.accounts.iter().any(|a| a.username == username) {
        return bad_request(json!({"username": ["Ce nom d'utilisateur existe déjà."]}));
    }
    state.next_id += 1;
    let profile = json!({
        "id": state.next_id,
        "username": username,
        "email": body["email"],
        "firstName": body["firstName"],
        "lastName": body["lastName"],
        "role": body["role"],
    });
    state.accounts.push(Account {
        username: username.clone(),
        password: body["password"].as_str().unwrap_or_default().to_owned(),
        profile: profile.clone(),
    });
    let token = issue_token(&mut state, &username);
    (
        StatusCode::CREATED,
        Json(json!({"token": token, "user": profile})),
    )
        .into_response()
}

async fn refresh(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    let username = match authenticate(&state, &headers) {
        Ok(username) => username,
        Err(response) => return response,
    };
    let token = issue_token(&mut state, &username);
    Json(json!({"token": token})).into_response()
}

async fn current_user(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let username = match authenticate(&state, &headers) {
        Ok(username) => username,
        Err(response) => return response,
    };
    match profile_of(&state, &username) {
        Some(profile) => Json(json!({"success": true, "data": profile})).into_response(),
        None => not_found(),
    }
}

async fn change_password(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    let username = match authenticate(&state, &headers) {
        Ok(username) => username,
        Err(response) => return response,
    };
    let Some(account) = state.accounts.iter_mut().find(|a| a.username == username) else {
        return not_found();
    };
    if body["old_password"].as_str() != Some(account.password.as_str()) {
        return bad_request(json!({"old_password": ["Mot de passe incorrect."]}));
    }
    body["new_password"]
        .as_str()
        .unwrap_or_default()
        .clone_into(&mut account.password);
    Json(json!({"success": true})).into_response()
}

async fn list(
    collection: Collection,
    state: Shared,
    query: HashMap<String, String>,
    headers: HeaderMap,
) -> Response {
    let mut state = lock(&state);
    if let Err(response) = authenticate(&state, &headers) {
        return response;
    }
    let page: usize = query
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1)
        .max(1);
    let page_size: usize = query
        .get("page_size")
        .and_then(|p| p.parse().ok())
        .unwrap_or(state.page_size)
        .max(1);
    if state.failing_pages.contains(&(collection, page)) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Erreur serveur"})),
        )
            .into_response();
    }

    let base_url = state.base_url.clone();
    let items = state.items(collection);
    let count = items.len();
    let start = (page - 1).saturating_mul(page_size).min(count);
    let end = start.saturating_add(page_size).min(count);
    let results: Vec<Value> = items.iter().skip(start).take(end - start).cloned().collect();
    let next = (end < count).then(|| {
        format!(
            "{base_url}/api/{}/?page={}&page_size={page_size}",
            collection.segment(),
            page + 1
        )
    });

    Json(json!({
        "count": count,
        "next": next,
        "previous": Value::Null,
        "results": results,
    }))
    .into_response()
}

fn find(items: &[Value], id: &str) -> Option<usize> {
    items
        .iter()
        .position(|item| id_text(&item["id"]).as_deref() == Some(id))
}

/// Detail answers: suppliers and credit notes come wrapped, invoices bare.
fn detail(collection: Collection, object: Value) -> Value {
    match collection {
        Collection::Invoices => object,
        Collection::Suppliers | Collection::CreditNotes => json!({"success": true, "data": object}),
    }
}

async fn create(collection: Collection, state: Shared, headers: HeaderMap, body: Value) -> Response {
    let mut state = lock(&state);
    if let Err(response) = authenticate(&state, &headers) {
        return response;
    }
    let Value::Object(mut object) = body else {
        return bad_request(json!({"detail": "JSON object expected"}));
    };

    let required = collection.required_field();
    let value = object
        .get(required)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_owned();
    if value.is_empty() {
        return bad_request(json!({ required: ["Ce champ est obligatoire."] }));
    }
    let duplicate = state
        .items(collection)
        .iter()
        .any(|item| item[required].as_str() == Some(value.as_str()));
    if duplicate && collection != Collection::Suppliers {
        return bad_request(json!({ required: ["Ce numéro existe déjà."] }));
    }

    enrich(&state, collection, &mut object);
    let id = state.insert(collection, Value::Object(object));
    let stored = state
        .items(collection)
        .last()
        .cloned()
        .unwrap_or_else(|| json!({"id": id}));
    (StatusCode::CREATED, Json(detail(collection, stored))).into_response()
}

/// Fill the denormalized names list endpoints carry.
fn enrich(state: &BackendState, collection: Collection, object: &mut Map<String, Value>) {
    match collection {
        Collection::Invoices => {
            if let Some(name) = object.get("supplier").and_then(|id| state.supplier_name(id)) {
                object.insert("supplier_name".to_owned(), name);
            }
        }
        Collection::CreditNotes => {
            let invoice = object.get("invoice").and_then(id_text).and_then(|id| {
                state
                    .invoices
                    .iter()
                    .find(|i| id_text(&i["id"]).as_deref() == Some(id.as_str()))
                    .cloned()
            });
            if let Some(invoice) = invoice {
                object.insert("invoice_number".to_owned(), invoice["invoice_number"].clone());
                object.insert("supplier_name".to_owned(), invoice["supplier_name"].clone());
            }
            object
                .entry("status")
                .or_insert_with(|| Value::String("PENDING".to_owned()));
        }
        Collection::Suppliers => {}
    }
}

async fn retrieve(collection: Collection, state: Shared, id: String, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    if let Err(response) = authenticate(&state, &headers) {
        return response;
    }
    let items = state.items(collection);
    match find(items, &id).and_then(|index| items.get(index)) {
        Some(object) => Json(detail(collection, object.clone())).into_response(),
        None => not_found(),
    }
}

async fn update(
    collection: Collection,
    state: Shared,
    id: String,
    headers: HeaderMap,
    body: Value,
) -> Response {
    let mut state = lock(&state);
    if let Err(response) = authenticate(&state, &headers) {
        return response;
    }
    let items = state.items(collection);
    let Some(object) = find(items, &id).and_then(|index| items.get_mut(index)) else {
        return not_found();
    };
    if let (Value::Object(target), Value::Object(changes)) = (&mut *object, body) {
        for (key, value) in changes {
            if key != "id" {
                target.insert(key, value);
            }
        }
    }
    Json(detail(collection, object.clone())).into_response()
}

async fn remove(collection: Collection, state: Shared, id: String, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    if let Err(response) = authenticate(&state, &headers) {
        return response;
    }
    let items = state.items(collection);
    match find(items, &id) {
        Some(index) => {
            items.remove(index);
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found(),
    }
}

async fn dashboard(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let month: Option<u32> = query.get("month").and_then(|m| m.parse().ok());
    let year: Option<i32> = query.get("year").and_then(|y| y.parse().ok());

    let snapshot = {
        let state = lock(&state);
        if let Err(response) = authenticate(&state, &headers) {
            return response;
        }
        if month.is_none() && year.is_none() {
            return Json(json!({"success": true, "data": state.dashboard})).into_response();
        }
        let key = format!(
            "{}/{}",
            month.map(|m| format!("{m:02}")).unwrap_or_default(),
            year.map(|y| y.to_string()).unwrap_or_default()
        );
        state.period_dashboards.get(&key).cloned()
    };

    let body = match snapshot {
        Some(PeriodSnapshot { body, delay }) => {
            tokio::time::sleep(delay).await;
            body
        }
        None => json!({
            "period": {"current_month": month, "current_year": year},
            "overview": {"total_suppliers": 0},
            "filter_info": {"month": month, "year": year},
        }),
    };
    Json(json!({"success": true, "data": body})).into_response()
}

async fn monthly_report(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    if let Err(response) = authenticate(&state, &headers) {
        return response;
    }
    Json(state.monthly_report.clone()).into_response()
}
