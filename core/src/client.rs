//! Request builder, envelope parser and session state for the MVNO API.
//!
//! # Design
//! Every operation is split the same way: a `build_*` method produces an
//! `HttpRequest` from the operation's parameters and the client's current
//! state, the `Transport` executes it, and a `parse_*` method decodes the
//! envelope. `session()` and `signup_by_phone()` additionally store the
//! identifier they receive; all other operations leave the client as it was.
//!
//! The client never checks call order. An identifier that has not been
//! obtained yet is sent as an empty value and the server's rejection comes
//! back as `Error::Api`.
//!
//! Operations that store state take `&mut self`. There is no internal
//! locking; callers sharing one client across threads must serialize access
//! themselves (e.g. behind a `Mutex`) or use one client per session.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::endpoint::{constant_params, Endpoint};
use crate::envelope::{value_text, Envelope};
use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport};

/// Blocking client for the mobile-operator API.
#[derive(Debug, Clone)]
pub struct MobileClient<T = UreqTransport> {
    base_url: String,
    transport: T,
    session_id: Option<String>,
    confirmation_id: Option<String>,
}

impl MobileClient<UreqTransport> {
    /// Client for the production service. Performs no network activity.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl Default for MobileClient<UreqTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> MobileClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            base_url: config.base_url,
            transport,
            session_id: None,
            confirmation_id: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Identifier stored by the last successful `session()` call.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Resume a session obtained earlier, or forget the current one.
    pub fn set_session_id(&mut self, session_id: Option<String>) {
        self.session_id = session_id;
    }

    /// Identifier stored by the last successful `signup_by_phone()` call.
    pub fn confirmation_id(&self) -> Option<&str> {
        self.confirmation_id.as_deref()
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Open a new session and remember its `moSessionId`.
    pub fn session(&mut self) -> Result<Value> {
        let response = self.execute(&self.build_session())?;
        self.parse_session(response)
    }

    pub fn session_status(&self) -> Result<Value> {
        let response = self.execute(&self.build_session_status())?;
        self.parse_payload(response)
    }

    /// Request an SMS code for `phone` and remember the `confirmationId`.
    pub fn signup_by_phone(&mut self, phone: &str) -> Result<Value> {
        let response = self.execute(&self.build_signup_by_phone(phone))?;
        self.parse_signup_by_phone(response)
    }

    /// Confirm the pending signup with the SMS `code`.
    pub fn confirm_signup_by_phone(&self, code: &str) -> Result<Value> {
        let response = self.execute(&self.build_confirm_signup_by_phone(code))?;
        self.parse_payload(response)
    }

    pub fn contracts_info(&self) -> Result<Value> {
        let response = self.execute(&self.build_contracts_info())?;
        self.parse_payload(response)
    }

    pub fn subscriber_services(&self) -> Result<Value> {
        let response = self.execute(&self.build_subscriber_services())?;
        self.parse_payload(response)
    }

    pub fn autopayments(&self, phone: &str) -> Result<Value> {
        let response = self.execute(&self.build_autopayments(phone))?;
        self.parse_payload(response)
    }

    pub fn bundle_accounts(&self) -> Result<Value> {
        let response = self.execute(&self.build_bundle_accounts())?;
        self.parse_payload(response)
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_session(&self) -> HttpRequest {
        self.request(Endpoint::Session, Vec::new())
    }

    pub fn build_session_status(&self) -> HttpRequest {
        self.request(
            Endpoint::SessionStatus,
            vec![("testSessionId", self.session_param())],
        )
    }

    pub fn build_signup_by_phone(&self, phone: &str) -> HttpRequest {
        self.request(
            Endpoint::SignupByPhone,
            vec![
                ("moSessionId", self.session_param()),
                ("onContact", "false".to_string()),
                ("msisdn", phone.to_string()),
            ],
        )
    }

    pub fn build_confirm_signup_by_phone(&self, code: &str) -> HttpRequest {
        self.request(
            Endpoint::ConfirmSignupByPhone,
            vec![
                ("moSessionId", self.session_param()),
                ("code", code.to_string()),
                (
                    "confirmationId",
                    self.confirmation_id.clone().unwrap_or_default(),
                ),
            ],
        )
    }

    pub fn build_contracts_info(&self) -> HttpRequest {
        self.request(
            Endpoint::ContractsInfo,
            vec![("moSessionId", self.session_param())],
        )
    }

    pub fn build_subscriber_services(&self) -> HttpRequest {
        self.request(
            Endpoint::SubscriberServices,
            vec![("moSessionId", self.session_param())],
        )
    }

    pub fn build_autopayments(&self, phone: &str) -> HttpRequest {
        self.request(
            Endpoint::AutoPayments,
            vec![
                ("moSessionId", self.session_param()),
                ("phoneNumber", phone.to_string()),
            ],
        )
    }

    pub fn build_bundle_accounts(&self) -> HttpRequest {
        self.request(
            Endpoint::BundleAccounts,
            vec![("moSessionId", self.session_param())],
        )
    }

    // -----------------------------------------------------------------------
    // Response parsers
    // -----------------------------------------------------------------------

    /// Decode the envelope and return its payload.
    pub fn parse_payload(&self, response: HttpResponse) -> Result<Value> {
        let envelope = Envelope::parse(&response.body)?;
        envelope.into_payload().map_err(|err| {
            warn!(
                status = response.status,
                result_code = err.result_code.as_deref().unwrap_or_default(),
                code = err.code.as_deref().unwrap_or_default(),
                "request rejected"
            );
            Error::Api(err)
        })
    }

    pub fn parse_session(&mut self, response: HttpResponse) -> Result<Value> {
        let payload = self.parse_payload(response)?;
        self.session_id = id_field(&payload, "moSessionId");
        info!(stored = self.session_id.is_some(), "session opened");
        Ok(payload)
    }

    pub fn parse_signup_by_phone(&mut self, response: HttpResponse) -> Result<Value> {
        let payload = self.parse_payload(response)?;
        self.confirmation_id = id_field(&payload, "confirmationId");
        info!(stored = self.confirmation_id.is_some(), "confirmation requested");
        Ok(payload)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        debug!(path = %request.path, params = request.query.len(), "sending request");
        Ok(self.transport.execute(request)?)
    }

    fn request(&self, endpoint: Endpoint, params: Vec<(&str, String)>) -> HttpRequest {
        let mut query: Vec<(String, String)> = params
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        query.extend(
            constant_params()
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        );
        HttpRequest {
            path: format!("{}{}", self.base_url, endpoint.path()),
            query,
        }
    }

    fn session_param(&self) -> String {
        self.session_id.clone().unwrap_or_default()
    }
}

/// Identifier in the text form it is sent back with, so a numeric
/// `moSessionId` is kept as `"12345"`. `None` when the key is missing or
/// `null`, or the payload is not an object.
fn id_field(payload: &Value, key: &str) -> Option<String> {
    payload.get(key).and_then(value_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    const BASE_URL: &str = "http://localhost:3000";
    const SESSION_OK: &str = r#"{"resultCode":"OK","payload":{"moSessionId":"abc123"}}"#;
    const SESSION_EXPIRED: &str = r#"{"resultCode":"ERROR","code":"session.not.found","message":"Session expired"}"#;

    /// Records every request and answers with queued bodies; an empty queue
    /// behaves like a refused connection.
    #[derive(Default)]
    struct RecordingTransport {
        requests: RefCell<Vec<HttpRequest>>,
        bodies: RefCell<VecDeque<String>>,
    }

    impl RecordingTransport {
        fn sent(&self) -> Vec<HttpRequest> {
            self.requests.borrow().clone()
        }

        fn last(&self) -> HttpRequest {
            self.requests.borrow().last().cloned().expect("no request sent")
        }
    }

    impl Transport for RecordingTransport {
        fn execute(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            self.requests.borrow_mut().push(request.clone());
            match self.bodies.borrow_mut().pop_front() {
                Some(body) => Ok(HttpResponse { status: 200, body }),
                None => Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))),
            }
        }
    }

    fn client(bodies: &[&str]) -> MobileClient<RecordingTransport> {
        let transport = RecordingTransport {
            bodies: RefCell::new(bodies.iter().map(|b| b.to_string()).collect()),
            ..Default::default()
        };
        MobileClient::with_transport(ClientConfig::new(BASE_URL), transport)
    }

    fn assert_constants(req: &HttpRequest) {
        assert_eq!(req.param("platform"), Some("web"));
        assert_eq!(req.param("origin"), Some("web,ib5,platform"));
        assert_eq!(req.param("appName"), Some("mvno"));
    }

    #[test]
    fn new_client_has_no_identifiers() {
        let c = MobileClient::new();
        assert_eq!(c.base_url(), "https://www.tinkoff.ru");
        assert!(c.session_id().is_none());
        assert!(c.confirmation_id().is_none());
    }

    #[test]
    fn session_stores_identifier_and_returns_payload() {
        let mut c = client(&[SESSION_OK]);
        let payload = c.session().unwrap();
        assert_eq!(payload, json!({"moSessionId": "abc123"}));
        assert_eq!(c.session_id(), Some("abc123"));

        let req = c.transport().last();
        assert_eq!(req.path, "http://localhost:3000/api/mobile-operator/util/session");
        assert_eq!(req.query.len(), 3);
        assert!(req.param("moSessionId").is_none());
        assert_constants(&req);
    }

    #[test]
    fn session_without_identifier_in_payload_overwrites_with_none() {
        let mut c = client(&[r#"{"resultCode":"OK","payload":{}}"#]);
        c.set_session_id(Some("old".to_string()));
        c.session().unwrap();
        assert!(c.session_id().is_none());
    }

    #[test]
    fn numeric_identifiers_are_kept_as_text() {
        let mut c = client(&[
            r#"{"resultCode":"OK","payload":{"moSessionId":12345}}"#,
            r#"{"resultCode":"OK","payload":{"confirmationId":678}}"#,
            r#"{"resultCode":"OK","payload":{}}"#,
        ]);
        c.session().unwrap();
        assert_eq!(c.session_id(), Some("12345"));
        c.signup_by_phone("+71234567890").unwrap();
        assert_eq!(c.confirmation_id(), Some("678"));

        c.confirm_signup_by_phone("1234").unwrap();
        let req = c.transport().last();
        assert_eq!(req.param("moSessionId"), Some("12345"));
        assert_eq!(req.param("confirmationId"), Some("678"));
    }

    #[test]
    fn session_status_sends_current_session_id() {
        let mut c = client(&[SESSION_OK, r#"{"resultCode":"OK","payload":{"accessLevel":"ANONYMOUS"}}"#]);
        c.session().unwrap();
        let payload = c.session_status().unwrap();
        assert_eq!(payload["accessLevel"], "ANONYMOUS");

        let req = c.transport().last();
        assert_eq!(req.param("testSessionId"), Some("abc123"));
        assert!(req.param("moSessionId").is_none());
        assert_constants(&req);
    }

    #[test]
    fn unset_session_is_sent_as_empty_value() {
        let c = client(&[SESSION_EXPIRED]);
        let err = c.contracts_info().unwrap_err();
        assert!(matches!(err, Error::Api(_)));
        assert_eq!(c.transport().last().param("moSessionId"), Some(""));
        assert_eq!(c.build_session_status().param("testSessionId"), Some(""));
    }

    #[test]
    fn signup_by_phone_stores_confirmation_id() {
        let mut c = client(&[
            SESSION_OK,
            r#"{"resultCode":"OK","payload":{"confirmationId":"conf-1","confirmationType":"SMS"}}"#,
        ]);
        c.session().unwrap();
        let payload = c.signup_by_phone("+71234567890").unwrap();
        assert_eq!(payload["confirmationType"], "SMS");
        assert_eq!(c.confirmation_id(), Some("conf-1"));

        let req = c.transport().last();
        assert_eq!(req.param("moSessionId"), Some("abc123"));
        assert_eq!(req.param("onContact"), Some("false"));
        assert_eq!(req.param("msisdn"), Some("+71234567890"));
        assert_constants(&req);
        assert!(req.url().contains("msisdn=%2B71234567890"));
    }

    #[test]
    fn confirm_sends_code_and_confirmation_id() {
        let mut c = client(&[
            SESSION_OK,
            r#"{"resultCode":"OK","payload":{"confirmationId":"conf-1"}}"#,
            r#"{"resultCode":"OK","payload":{"accessLevel":"CLIENT"}}"#,
        ]);
        c.session().unwrap();
        c.signup_by_phone("+71234567890").unwrap();
        c.confirm_signup_by_phone("1234").unwrap();

        let req = c.transport().last();
        assert_eq!(
            req.path,
            "http://localhost:3000/api/mobile-operator/auth/confirm_signup_by_phone_web"
        );
        assert_eq!(req.param("moSessionId"), Some("abc123"));
        assert_eq!(req.param("code"), Some("1234"));
        assert_eq!(req.param("confirmationId"), Some("conf-1"));
    }

    #[test]
    fn confirm_before_signup_still_issues_request() {
        let c = client(&[r#"{"resultCode":"ERROR","code":"confirmation.not.found"}"#]);
        let err = c.confirm_signup_by_phone("0000").unwrap_err();
        assert_eq!(
            err.as_api().and_then(|e| e.code.as_deref()),
            Some("confirmation.not.found")
        );
        let sent = c.transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].param("confirmationId"), Some(""));
    }

    #[test]
    fn account_queries_carry_session_id() {
        let ok = r#"{"resultCode":"OK","payload":[]}"#;
        let mut c = client(&[ok, ok, ok, ok]);
        c.set_session_id(Some("resumed".to_string()));

        c.contracts_info().unwrap();
        c.subscriber_services().unwrap();
        c.autopayments("+79990000000").unwrap();
        c.bundle_accounts().unwrap();

        let sent = c.transport().sent();
        let suffixes: Vec<&str> = sent
            .iter()
            .map(|r| r.path.trim_start_matches("http://localhost:3000/api/mobile-operator"))
            .collect();
        assert_eq!(
            suffixes,
            vec![
                "/user/contracts_info",
                "/user/subscriber_services",
                "/payment/get_autopayments",
                "/user/bundle_accounts",
            ]
        );
        for req in &sent {
            assert_eq!(req.param("moSessionId"), Some("resumed"));
            assert_constants(req);
        }
        assert_eq!(sent[2].param("phoneNumber"), Some("+79990000000"));
    }

    #[test]
    fn payload_passes_through_unchanged() {
        let c = client(&[r#"{"resultCode":"OK","payload":{"contracts":[{"id":7,"balance":12.5}]}}"#]);
        let payload = c.contracts_info().unwrap();
        assert_eq!(payload, json!({"contracts": [{"id": 7, "balance": 12.5}]}));
    }

    #[test]
    fn rejection_exposes_envelope_and_keeps_state() {
        let mut c = client(&[SESSION_OK, SESSION_EXPIRED, SESSION_EXPIRED]);
        c.session().unwrap();

        let err = c.signup_by_phone("+71234567890").unwrap_err();
        let api = err.as_api().expect("vendor rejection");
        assert_eq!(api.result_code.as_deref(), Some("ERROR"));
        assert_eq!(api.code.as_deref(), Some("session.not.found"));
        assert_eq!(api.message.as_deref(), Some("Session expired"));
        assert_eq!(api.to_string(), "session.not.found (Session expired)");
        assert!(c.confirmation_id().is_none());

        c.session().unwrap_err();
        assert_eq!(c.session_id(), Some("abc123"));
    }

    #[test]
    fn non_json_body_is_decode_error_and_keeps_state() {
        let mut c = client(&["<html>502 Bad Gateway</html>"]);
        let err = c.session().unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert!(err.as_api().is_none());
        assert!(c.session_id().is_none());
    }

    #[test]
    fn transport_failure_is_propagated() {
        let c = client(&[]);
        let err = c.bundle_accounts().unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Io(_))));
    }

    #[test]
    fn repeated_session_status_requests_are_identical() {
        let ok = r#"{"resultCode":"OK","payload":{"accessLevel":"ANONYMOUS"}}"#;
        let mut c = client(&[ok, ok]);
        c.set_session_id(Some("abc123".to_string()));
        c.session_status().unwrap();
        c.session_status().unwrap();

        let sent = c.transport().sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], sent[1]);
        assert_eq!(sent[0].url(), sent[1].url());
    }

    #[test]
    fn build_and_parse_can_be_driven_separately() {
        let mut c = client(&[]);
        let req = c.build_session();
        assert_eq!(
            req.url(),
            "http://localhost:3000/api/mobile-operator/util/session\
             ?platform=web&origin=web%2Cib5%2Cplatform&appName=mvno"
        );
        let response = HttpResponse {
            status: 200,
            body: SESSION_OK.to_string(),
        };
        c.parse_session(response).unwrap();
        assert_eq!(c.session_id(), Some("abc123"));
        assert!(c.transport().sent().is_empty());
    }
}
