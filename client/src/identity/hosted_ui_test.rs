use std::cell::RefCell;
use std::collections::VecDeque;

use appsync::ResponseType;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use super::*;
use crate::identity::storage::MemoryTokenStore;
use crate::net::transport::{HttpResponse, TransportError};

const NOW: i64 = 1_700_000_000;

fn fixed_clock() -> i64 {
    NOW
}

fn token_with(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).expect("claims json"));
    format!("{header}.{payload}.c2ln")
}

fn alice_id_token() -> String {
    token_with(&serde_json::json!({"sub": "u-1", "cognito:username": "alice", "exp": NOW + 3600}))
}

#[derive(Default)]
struct ScriptedHttp {
    responses: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl ScriptedHttp {
    fn push_ok(&self, status: u16, body: &str) {
        self.responses
            .borrow_mut()
            .push_back(Ok(HttpResponse { status, body: body.to_owned() }));
    }

    fn push_err(&self) {
        self.responses.borrow_mut().push_back(Err(TransportError::Request("offline".to_owned())));
    }
}

#[async_trait(?Send)]
impl HttpTransport for ScriptedHttp {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request);
        self.responses.borrow_mut().pop_front().unwrap_or(Err(TransportError::Closed))
    }
}

#[derive(Default)]
struct RecordingNavigator {
    redirects: RefCell<Vec<String>>,
    replaced: RefCell<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, url: &str) -> Result<(), IdentityError> {
        self.redirects.borrow_mut().push(url.to_owned());
        Ok(())
    }

    fn replace_history(&self, url: &str) {
        self.replaced.borrow_mut().push(url.to_owned());
    }
}

struct Fixture {
    ui: HostedUi,
    http: Rc<ScriptedHttp>,
    store: Rc<MemoryTokenStore>,
    navigator: Rc<RecordingNavigator>,
    events: Rc<RefCell<Vec<HubPayload>>>,
    _listener: hub::ListenerHandle,
}

fn config(response_type: ResponseType) -> HostedUiConfig {
    HostedUiConfig {
        user_pool_id: "us-east-1_pool".to_owned(),
        client_id: "client123".to_owned(),
        domain: "demo.auth.us-east-1.amazoncognito.com".to_owned(),
        redirect_sign_in: "http://localhost:3000/".to_owned(),
        redirect_sign_out: "http://localhost:3000/bye".to_owned(),
        scopes: vec!["openid".to_owned(), "email".to_owned()],
        response_type,
    }
}

fn fixture(response_type: ResponseType) -> Fixture {
    let http = Rc::new(ScriptedHttp::default());
    let store = Rc::new(MemoryTokenStore::new());
    let navigator = Rc::new(RecordingNavigator::default());
    let hub = Hub::new();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let listener = hub.listen(AUTH_CHANNEL, move |p| sink.borrow_mut().push(p.clone()));
    let ui = HostedUi::new(
        config(response_type),
        Rc::clone(&http) as Rc<dyn HttpTransport>,
        Rc::clone(&store) as Rc<dyn TokenStore>,
        Rc::clone(&navigator) as Rc<dyn Navigator>,
        hub,
    )
    .with_clock(fixed_clock);
    Fixture { ui, http, store, navigator, events, _listener: listener }
}

fn store_session(store: &MemoryTokenStore, session: &Session) {
    store
        .save(TOKENS_KEY, &serde_json::to_string(session).expect("session json"))
        .expect("save");
}

fn stored_session(store: &MemoryTokenStore) -> Option<Session> {
    store.load(TOKENS_KEY).map(|raw| serde_json::from_str(&raw).expect("session json"))
}

fn token_body(refresh: Option<&str>) -> String {
    let mut body = serde_json::json!({
        "id_token": alice_id_token(),
        "access_token": "access-1",
        "expires_in": 3600,
        "token_type": "Bearer"
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = serde_json::Value::from(refresh);
    }
    body.to_string()
}

fn form(body: &str) -> HashMap<String, String> {
    form_urlencoded::parse(body.as_bytes()).into_owned().collect()
}

// =============================================================
// URLs
// =============================================================

#[test]
fn authorize_url_carries_oauth_parameters() {
    let f = fixture(ResponseType::Code);
    let url = Url::parse(&f.ui.authorize_url("nonce-1")).expect("url");
    assert_eq!(url.host_str(), Some("demo.auth.us-east-1.amazoncognito.com"));
    assert_eq!(url.path(), "/oauth2/authorize");
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(params["identity_provider"], "COGNITO");
    assert_eq!(params["redirect_uri"], "http://localhost:3000/");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["client_id"], "client123");
    assert_eq!(params["scope"], "openid email");
    assert_eq!(params["state"], "nonce-1");
}

#[test]
fn logout_url_targets_sign_out_redirect() {
    let f = fixture(ResponseType::Code);
    let url = Url::parse(&f.ui.logout_url()).expect("url");
    assert_eq!(url.path(), "/logout");
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(params["logout_uri"], "http://localhost:3000/bye");
    assert_eq!(params["client_id"], "client123");
}

#[test]
fn federated_sign_in_saves_state_and_redirects() {
    let f = fixture(ResponseType::Token);
    f.ui.federated_sign_in().expect("sign in");

    let state = f.store.load(STATE_KEY).expect("state saved");
    let redirects = f.navigator.redirects.borrow();
    assert_eq!(redirects.len(), 1);
    let url = Url::parse(&redirects[0]).expect("url");
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    assert_eq!(params["state"], state);
    assert_eq!(params["response_type"], "token");
}

// =============================================================
// Redirect handling
// =============================================================

#[test]
fn redirect_parse_ignores_plain_urls() {
    assert_eq!(Redirect::parse("http://localhost:3000/"), None);
    assert_eq!(Redirect::parse("http://localhost:3000/?tab=news"), None);
    assert_eq!(Redirect::parse("not a url"), None);
}

#[tokio::test]
async fn code_redirect_exchanges_and_broadcasts_sign_in() {
    let f = fixture(ResponseType::Code);
    f.store.save(STATE_KEY, "s1").expect("save");
    f.http.push_ok(200, &token_body(Some("refresh-1")));

    let handled = f
        .ui
        .complete_sign_in("http://localhost:3000/?code=abc&state=s1")
        .await
        .expect("complete");
    assert!(handled);

    let requests = f.http.requests.borrow();
    assert_eq!(requests[0].url, "https://demo.auth.us-east-1.amazoncognito.com/oauth2/token");
    assert_eq!(requests[0].header_value("content-type"), Some(FORM_CONTENT_TYPE));
    let body = form(&requests[0].body);
    assert_eq!(body["grant_type"], "authorization_code");
    assert_eq!(body["code"], "abc");
    assert_eq!(body["redirect_uri"], "http://localhost:3000/");

    let session = stored_session(&f.store).expect("tokens saved");
    assert_eq!(session.access_token, "access-1");
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(session.expires_at, NOW + 3600);
    assert!(f.store.load(STATE_KEY).is_none());

    let events = f.events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, hub::SIGN_IN);
    assert_eq!(events[0].data.as_ref().map(|d| d["username"].clone()), Some("alice".into()));
    assert_eq!(*f.navigator.replaced.borrow(), vec!["http://localhost:3000/".to_owned()]);
}

#[tokio::test]
async fn implicit_redirect_reads_fragment_tokens() {
    let f = fixture(ResponseType::Token);
    f.store.save(STATE_KEY, "s2").expect("save");
    let url = format!(
        "http://localhost:3000/#id_token={}&access_token=access-2&expires_in=600&token_type=Bearer&state=s2",
        alice_id_token()
    );

    assert!(f.ui.complete_sign_in(&url).await.expect("complete"));
    assert!(f.http.requests.borrow().is_empty());
    let session = stored_session(&f.store).expect("tokens saved");
    assert_eq!(session.access_token, "access-2");
    assert_eq!(session.refresh_token, None);
    assert_eq!(session.expires_at, NOW + 600);
    assert_eq!(f.events.borrow()[0].event, hub::SIGN_IN);
}

#[tokio::test]
async fn state_mismatch_fails_without_exchange() {
    let f = fixture(ResponseType::Code);
    f.store.save(STATE_KEY, "expected").expect("save");

    let err = f
        .ui
        .complete_sign_in("http://localhost:3000/?code=abc&state=forged")
        .await
        .expect_err("should fail");
    assert!(matches!(err, IdentityError::StateMismatch));
    assert!(f.http.requests.borrow().is_empty());
    assert!(stored_session(&f.store).is_none());
    assert_eq!(f.events.borrow()[0].event, hub::SIGN_IN_FAILURE);
}

#[tokio::test]
async fn oauth_error_redirect_broadcasts_failure() {
    let f = fixture(ResponseType::Code);
    let err = f
        .ui
        .complete_sign_in("http://localhost:3000/?error=access_denied&error_description=User+cancelled")
        .await
        .expect_err("should fail");
    let IdentityError::OAuth { error, description } = err else {
        panic!("expected oauth error");
    };
    assert_eq!(error, "access_denied");
    assert_eq!(description.as_deref(), Some("User cancelled"));

    let events = f.events.borrow();
    assert_eq!(events[0].event, hub::SIGN_IN_FAILURE);
    assert!(events[0].message.as_deref().is_some_and(|m| m.contains("access_denied")));
}

#[tokio::test]
async fn token_endpoint_rejection_is_reported() {
    let f = fixture(ResponseType::Code);
    f.store.save(STATE_KEY, "s1").expect("save");
    f.http.push_ok(400, r#"{"error":"invalid_grant"}"#);

    let err = f
        .ui
        .complete_sign_in("http://localhost:3000/?code=stale&state=s1")
        .await
        .expect_err("should fail");
    assert!(matches!(err, IdentityError::TokenEndpoint { status: 400, .. }));
    assert!(stored_session(&f.store).is_none());
}

#[tokio::test]
async fn plain_url_is_not_a_sign_in() {
    let f = fixture(ResponseType::Code);
    assert!(!f.ui.complete_sign_in("http://localhost:3000/").await.expect("complete"));
    assert!(f.navigator.replaced.borrow().is_empty());
    assert!(f.events.borrow().is_empty());
}

// =============================================================
// Sessions
// =============================================================

#[tokio::test]
async fn no_tokens_is_not_authenticated() {
    let f = fixture(ResponseType::Code);
    assert!(matches!(f.ui.current_session().await, Err(IdentityError::NotAuthenticated)));
    assert!(matches!(f.ui.current_authenticated_user().await, Err(IdentityError::NotAuthenticated)));
}

#[tokio::test]
async fn valid_session_is_returned_without_refresh() {
    let f = fixture(ResponseType::Code);
    let session = Session {
        id_token: alice_id_token(),
        access_token: "access-1".to_owned(),
        refresh_token: Some("refresh-1".to_owned()),
        expires_at: NOW + 3600,
    };
    store_session(&f.store, &session);

    assert_eq!(f.ui.current_session().await.expect("session"), session);
    assert!(f.http.requests.borrow().is_empty());

    let user = f.ui.current_authenticated_user().await.expect("user").expect("some user");
    assert_eq!(user.username, "alice");
    assert_eq!(user.sub.as_deref(), Some("u-1"));
}

#[tokio::test]
async fn expired_session_refreshes_and_keeps_refresh_token() {
    let f = fixture(ResponseType::Code);
    store_session(
        &f.store,
        &Session {
            id_token: alice_id_token(),
            access_token: "old".to_owned(),
            refresh_token: Some("refresh-1".to_owned()),
            expires_at: NOW + 10,
        },
    );
    f.http.push_ok(200, &token_body(None));

    let fresh = f.ui.current_session().await.expect("refreshed");
    assert_eq!(fresh.access_token, "access-1");
    assert_eq!(fresh.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(stored_session(&f.store), Some(fresh));

    let body = form(&f.http.requests.borrow()[0].body);
    assert_eq!(body["grant_type"], "refresh_token");
    assert_eq!(body["refresh_token"], "refresh-1");
}

#[tokio::test]
async fn rejected_refresh_clears_session() {
    let f = fixture(ResponseType::Code);
    store_session(
        &f.store,
        &Session {
            id_token: alice_id_token(),
            access_token: "old".to_owned(),
            refresh_token: Some("revoked".to_owned()),
            expires_at: NOW - 1,
        },
    );
    f.http.push_ok(400, r#"{"error":"invalid_grant"}"#);

    assert!(matches!(f.ui.current_session().await, Err(IdentityError::NotAuthenticated)));
    assert!(stored_session(&f.store).is_none());
}

#[tokio::test]
async fn refresh_network_failure_keeps_session() {
    let f = fixture(ResponseType::Code);
    store_session(
        &f.store,
        &Session {
            id_token: alice_id_token(),
            access_token: "old".to_owned(),
            refresh_token: Some("refresh-1".to_owned()),
            expires_at: NOW - 1,
        },
    );
    f.http.push_err();

    assert!(matches!(f.ui.current_session().await, Err(IdentityError::Transport(_))));
    assert!(stored_session(&f.store).is_some());
}

#[tokio::test]
async fn expired_session_without_refresh_token_is_cleared() {
    let f = fixture(ResponseType::Token);
    store_session(
        &f.store,
        &Session { id_token: alice_id_token(), access_token: "old".to_owned(), refresh_token: None, expires_at: NOW },
    );

    assert!(matches!(f.ui.current_session().await, Err(IdentityError::NotAuthenticated)));
    assert!(stored_session(&f.store).is_none());
}

#[tokio::test]
async fn corrupt_stored_tokens_are_discarded() {
    let f = fixture(ResponseType::Code);
    f.store.save(TOKENS_KEY, "{not json").expect("save");
    assert!(matches!(f.ui.current_session().await, Err(IdentityError::NotAuthenticated)));
    assert!(f.store.load(TOKENS_KEY).is_none());
}

#[tokio::test]
async fn sign_out_clears_broadcasts_and_redirects() {
    let f = fixture(ResponseType::Code);
    store_session(
        &f.store,
        &Session { id_token: alice_id_token(), access_token: "a".to_owned(), refresh_token: None, expires_at: NOW + 60 },
    );

    f.ui.sign_out().await.expect("sign out");
    assert!(stored_session(&f.store).is_none());
    assert_eq!(f.events.borrow()[0].event, hub::SIGN_OUT);
    assert_eq!(*f.navigator.redirects.borrow(), vec![f.ui.logout_url()]);
}

#[tokio::test]
async fn huge_expires_in_saturates_instead_of_overflowing() {
    let f = fixture(ResponseType::Token);
    f.store.save(STATE_KEY, "s3").expect("save");
    let url = format!(
        "http://localhost:3000/#id_token={}&access_token=access-3&expires_in={}&state=s3",
        alice_id_token(),
        i64::MAX
    );

    assert!(f.ui.complete_sign_in(&url).await.expect("complete"));
    assert_eq!(stored_session(&f.store).expect("tokens saved").expires_at, i64::MAX);
}

#[test]
fn session_expiring_at_the_minimum_is_invalid() {
    let session = Session {
        id_token: String::new(),
        access_token: String::new(),
        refresh_token: None,
        expires_at: i64::MIN,
    };
    assert!(!session.is_valid_at(NOW));
}
