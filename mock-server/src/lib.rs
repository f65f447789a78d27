//! In-memory stand-in for the mobile-operator API.
//!
//! Serves the same paths and response envelope as the real service and
//! walks the same session workflow: open a session, sign up by phone,
//! confirm with [`CONFIRMATION_CODE`], then query account data. Rejections
//! are answered with HTTP 200 and a non-`OK` `resultCode`, as the real
//! service does.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

/// The only SMS code the mock accepts.
pub const CONFIRMATION_CODE: &str = "1234";

pub const API_PREFIX: &str = "/api/mobile-operator";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub result_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    fn ok(payload: Value) -> Json<Envelope> {
        Json(Envelope {
            result_code: "OK".to_string(),
            code: None,
            message: None,
            payload,
        })
    }
}

/// A non-`OK` answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub code: &'static str,
    pub message: &'static str,
}

impl Rejection {
    const INVALID_REQUEST: Rejection = Rejection {
        code: "invalid.request",
        message: "Missing or invalid client parameters",
    };
    const SESSION_NOT_FOUND: Rejection = Rejection {
        code: "session.not.found",
        message: "Session expired",
    };
    const INVALID_MSISDN: Rejection = Rejection {
        code: "invalid.msisdn",
        message: "Invalid phone number",
    };
    const CONFIRMATION_NOT_FOUND: Rejection = Rejection {
        code: "confirmation.not.found",
        message: "Confirmation not found",
    };
    const INVALID_CODE: Rejection = Rejection {
        code: "invalid.code",
        message: "Invalid confirmation code",
    };
    const INSUFFICIENT_PRIVILEGES: Rejection = Rejection {
        code: "insufficient.privileges",
        message: "Confirm the phone number first",
    };
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        debug!(code = self.code, "rejecting request");
        Json(Envelope {
            result_code: "ERROR".to_string(),
            code: Some(self.code.to_string()),
            message: Some(self.message.to_string()),
            payload: Value::Null,
        })
        .into_response()
    }
}

#[derive(Debug, Default)]
struct Session {
    /// Phone number the session was confirmed for.
    msisdn: Option<String>,
}

#[derive(Debug)]
struct Confirmation {
    session_id: String,
    msisdn: String,
}

#[derive(Debug, Default)]
pub struct Accounts {
    sessions: HashMap<String, Session>,
    confirmations: HashMap<String, Confirmation>,
}

pub type Db = Arc<RwLock<Accounts>>;
type Params = HashMap<String, String>;
type Reply = Result<Json<Envelope>, Rejection>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Accounts::default()));
    let api = Router::new()
        .route("/util/session", get(open_session))
        .route("/util/session_status", get(session_status))
        .route("/auth/signup_by_phone_web", get(signup_by_phone))
        .route("/auth/confirm_signup_by_phone_web", get(confirm_signup_by_phone))
        .route("/user/contracts_info", get(contracts_info))
        .route("/user/subscriber_services", get(subscriber_services))
        .route("/user/bundle_accounts", get(bundle_accounts))
        .route("/payment/get_autopayments", get(autopayments));
    Router::new().nest(API_PREFIX, api).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn param<'a>(params: &'a Params, key: &str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or_default()
}

/// Every request must identify the web client.
fn check_client(params: &Params) -> Result<(), Rejection> {
    let valid = param(params, "platform") == "web"
        && param(params, "origin") == "web,ib5,platform"
        && param(params, "appName") == "mvno";
    if valid {
        Ok(())
    } else {
        Err(Rejection::INVALID_REQUEST)
    }
}

fn session<'a>(accounts: &'a Accounts, id: &str) -> Result<&'a Session, Rejection> {
    accounts.sessions.get(id).ok_or(Rejection::SESSION_NOT_FOUND)
}

/// Phone number of a confirmed session.
fn authorised(accounts: &Accounts, params: &Params) -> Result<String, Rejection> {
    check_client(params)?;
    session(accounts, param(params, "moSessionId"))?
        .msisdn
        .clone()
        .ok_or(Rejection::INSUFFICIENT_PRIVILEGES)
}

async fn open_session(State(db): State<Db>, Query(params): Query<Params>) -> Reply {
    check_client(&params)?;
    let id = Uuid::new_v4().to_string();
    db.write().await.sessions.insert(id.clone(), Session::default());
    Ok(Envelope::ok(json!({ "moSessionId": id })))
}

async fn session_status(State(db): State<Db>, Query(params): Query<Params>) -> Reply {
    check_client(&params)?;
    let accounts = db.read().await;
    let level = match session(&accounts, param(&params, "testSessionId"))?.msisdn {
        Some(_) => "CLIENT",
        None => "ANONYMOUS",
    };
    Ok(Envelope::ok(json!({ "accessLevel": level })))
}

async fn signup_by_phone(State(db): State<Db>, Query(params): Query<Params>) -> Reply {
    check_client(&params)?;
    let mut accounts = db.write().await;
    let session_id = param(&params, "moSessionId");
    session(&accounts, session_id)?;
    let msisdn = param(&params, "msisdn");
    if msisdn.is_empty() {
        return Err(Rejection::INVALID_MSISDN);
    }
    let confirmation_id = Uuid::new_v4().to_string();
    accounts.confirmations.insert(
        confirmation_id.clone(),
        Confirmation {
            session_id: session_id.to_string(),
            msisdn: msisdn.to_string(),
        },
    );
    Ok(Envelope::ok(json!({
        "confirmationId": confirmation_id,
        "confirmationType": "SMS",
    })))
}

async fn confirm_signup_by_phone(State(db): State<Db>, Query(params): Query<Params>) -> Reply {
    check_client(&params)?;
    let mut accounts = db.write().await;
    let session_id = param(&params, "moSessionId");
    session(&accounts, session_id)?;
    let confirmation_id = param(&params, "confirmationId");
    let msisdn = match accounts.confirmations.get(confirmation_id) {
        Some(c) if c.session_id == session_id => c.msisdn.clone(),
        _ => return Err(Rejection::CONFIRMATION_NOT_FOUND),
    };
    if param(&params, "code") != CONFIRMATION_CODE {
        return Err(Rejection::INVALID_CODE);
    }
    accounts.confirmations.remove(confirmation_id);
    if let Some(session) = accounts.sessions.get_mut(session_id) {
        session.msisdn = Some(msisdn);
    }
    Ok(Envelope::ok(json!({ "accessLevel": "CLIENT" })))
}

async fn contracts_info(State(db): State<Db>, Query(params): Query<Params>) -> Reply {
    let msisdn = authorised(&*db.read().await, &params)?;
    Ok(Envelope::ok(json!({
        "contracts": [{
            "msisdn": msisdn,
            "status": "ACTIVE",
            "tariff": "Base",
            "balance": { "value": 250.0, "currency": "RUB" },
        }],
    })))
}

async fn subscriber_services(State(db): State<Db>, Query(params): Query<Params>) -> Reply {
    authorised(&*db.read().await, &params)?;
    Ok(Envelope::ok(json!([
        { "code": "unlimited_messengers", "name": "Unlimited messengers", "active": true },
        { "code": "roaming", "name": "Roaming", "active": false },
    ])))
}

async fn bundle_accounts(State(db): State<Db>, Query(params): Query<Params>) -> Reply {
    authorised(&*db.read().await, &params)?;
    Ok(Envelope::ok(json!([
        { "type": "minutes", "rest": 300, "total": 400 },
        { "type": "internet", "rest": 10240, "total": 15360, "unit": "MB" },
    ])))
}

async fn autopayments(State(db): State<Db>, Query(params): Query<Params>) -> Reply {
    authorised(&*db.read().await, &params)?;
    Ok(Envelope::ok(json!([{
        "phoneNumber": param(&params, "phoneNumber"),
        "amount": 300,
        "threshold": 50,
        "enabled": true,
    }])))
}
