//! In-memory fake of the automation server endpoints the client talks to.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const CRUMB_FIELD: &str = "Jenkins-Crumb";
pub const DEFAULT_CRUMB: &str = "abc123";

const DOMAIN: &str = "/credentials/store/system/domain/_";

/// A stored credential.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Default)]
pub struct ServerState {
    /// `None` turns CSRF protection off: no issuer, no crumb checks.
    pub crumb: Option<String>,
    pub credentials: Vec<Credential>,
}

pub type Db = Arc<RwLock<ServerState>>;

/// Router with CSRF protection on, using [`DEFAULT_CRUMB`].
pub fn app() -> Router {
    router(Some(DEFAULT_CRUMB.to_string()))
}

pub fn router(crumb: Option<String>) -> Router {
    let db: Db = Arc::new(RwLock::new(ServerState {
        crumb,
        credentials: Vec::new(),
    }));
    Router::new()
        .route("/api/json", get(info))
        .route("/crumbIssuer/api/json", get(crumb_issuer))
        .route("/job/{name}/build", post(build_job))
        .route("/pluginManager/uploadPlugin", post(upload_plugin))
        .route("/error/", get(x_error))
        .route("/redirect/api/json", get(redirect))
        .route("/whoami/api/json", get(whoami))
        .route(&format!("{DOMAIN}/"), get(domain_page))
        .route(&format!("{DOMAIN}/api/xml"), get(list_credentials))
        .route(&format!("{DOMAIN}/api/xml/"), get(list_credentials))
        .route(&format!("{DOMAIN}/createCredentials"), post(create_credential))
        .route(&format!("{DOMAIN}/credential/{{id}}/doDelete"), post(delete_credential))
        .with_state(db)
}

pub async fn run(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

type Rejection = (StatusCode, String);

async fn check_crumb(db: &Db, headers: &HeaderMap) -> Result<(), Rejection> {
    let state = db.read().await;
    let Some(expected) = state.crumb.as_deref() else {
        return Ok(());
    };
    let sent = headers.get(CRUMB_FIELD).and_then(|v| v.to_str().ok());
    if sent == Some(expected) {
        Ok(())
    } else {
        tracing::info!(?sent, "rejecting request without valid crumb");
        Err((
            StatusCode::FORBIDDEN,
            "No valid crumb was included in the request".to_string(),
        ))
    }
}

async fn info(State(db): State<Db>) -> Json<Value> {
    let state = db.read().await;
    Json(json!({
        "mode": "NORMAL",
        "nodeDescription": "the built-in node",
        "numExecutors": 2,
        "useCrumbs": state.crumb.is_some(),
    }))
}

async fn crumb_issuer(State(db): State<Db>) -> Result<Json<Value>, StatusCode> {
    let state = db.read().await;
    let crumb = state.crumb.as_ref().ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({
        "_class": "hudson.security.csrf.DefaultCrumbIssuer",
        "crumb": crumb,
        "crumbRequestField": CRUMB_FIELD,
    })))
}

async fn build_job(
    State(db): State<Db>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), Rejection> {
    check_crumb(&db, &headers).await?;
    let crumb = headers.get(CRUMB_FIELD).and_then(|v| v.to_str().ok());
    Ok((StatusCode::CREATED, Json(json!({ "job": name, "crumb": crumb }))))
}

/// Reports the received parts in arrival order.
async fn upload_plugin(
    State(db): State<Db>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, Rejection> {
    check_crumb(&db, &headers).await?;

    let mut files = Vec::new();
    let mut fields = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        match file_name {
            Some(file_name) => files.push(json!({
                "name": name,
                "fileName": file_name,
                "contents": String::from_utf8_lossy(&data),
            })),
            None => fields.push(json!([name, String::from_utf8_lossy(&data)])),
        }
    }
    Ok(Json(json!({ "files": files, "fields": fields })))
}

async fn x_error() -> impl IntoResponse {
    ([("X-Error", "No such job")], Json(json!({ "ok": true })))
}

async fn redirect() -> Redirect {
    Redirect::to("/whoami/api/json")
}

async fn whoami(headers: HeaderMap) -> Json<Value> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    Json(json!({ "authorization": authorization }))
}

async fn domain_page() -> Html<&'static str> {
    Html("<html><body>Global credentials (unrestricted)</body></html>")
}

async fn list_credentials(State(db): State<Db>) -> Response {
    let state = db.read().await;
    let mut xml = String::from(
        r#"<domainWrapper _class="com.cloudbees.plugins.credentials.CredentialsStoreAction$DomainWrapper">"#,
    );
    xml.push_str("<displayName>Global credentials (unrestricted)</displayName>");
    xml.push_str("<fullName>system/_</fullName><global>true</global><urlName>_</urlName>");
    for cred in &state.credentials {
        xml.push_str(&format!(
            "<credential><description>{}</description><displayName>{}/****</displayName>\
             <fingerprint/><fullName>system/_/{}</fullName><id>{}</id>\
             <typeName>Username with password</typeName></credential>",
            escape(cred.description.as_str()),
            escape(cred.username.as_str()),
            escape(cred.id.as_str()),
            escape(cred.id.as_str()),
        ));
    }
    xml.push_str("</domainWrapper>");
    ([(header::CONTENT_TYPE, "application/xml")], xml).into_response()
}

async fn create_credential(
    State(db): State<Db>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, Rejection> {
    check_crumb(&db, &headers).await?;
    let credential: Credential = quick_xml::de::from_str(&body)
        .map_err(|_| (StatusCode::BAD_REQUEST, "bad xml".to_string()))?;

    let mut state = db.write().await;
    if state.credentials.iter().any(|c| c.id == credential.id) {
        return Err((StatusCode::CONFLICT, format!("duplicate id {}", credential.id)));
    }
    state.credentials.push(credential);
    Ok(StatusCode::OK)
}

async fn delete_credential(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Redirect, Rejection> {
    check_crumb(&db, &headers).await?;
    let mut state = db.write().await;
    let before = state.credentials.len();
    state.credentials.retain(|c| c.id != id);
    if state.credentials.len() == before {
        return Err((StatusCode::NOT_FOUND, format!("no credential {id}")));
    }
    Ok(Redirect::to(&format!("{DOMAIN}/")))
}
