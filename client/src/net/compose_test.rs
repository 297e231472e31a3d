use std::cell::RefCell;

use appsync::GraphqlRequest;
use async_trait::async_trait;

use super::*;
use crate::net::link::{Operation, first_response};
use crate::net::transport::{HttpRequest, HttpResponse, RealtimeSocket, TransportError};

const ENDPOINT: &str = "https://abc.appsync-api.us-east-1.amazonaws.com/graphql";

#[derive(Default)]
struct RecordingHttp {
    requests: RefCell<Vec<HttpRequest>>,
}

#[async_trait(?Send)]
impl HttpTransport for RecordingHttp {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request);
        Ok(HttpResponse { status: 200, body: r#"{"data":{"listEvents":{"items":[]}}}"#.to_owned() })
    }
}

struct NoRealtime;

#[async_trait(?Send)]
impl RealtimeTransport for NoRealtime {
    async fn connect(&self, _url: &str) -> Result<RealtimeSocket, TransportError> {
        Err(TransportError::Socket("unused".to_owned()))
    }
}

struct StaticToken;

#[async_trait(?Send)]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, LinkError> {
        Ok("jwt".to_owned())
    }
}

fn config(auth: AuthMode) -> ClientConfig {
    ClientConfig { graphql_endpoint: ENDPOINT.to_owned(), region: "us-east-1".to_owned(), auth, identity: None }
}

#[tokio::test]
async fn api_key_pipeline_has_two_stages_and_sends_key() {
    let http = Rc::new(RecordingHttp::default());
    let chain = compose(
        &config(AuthMode::ApiKey { api_key: "da2-key".to_owned() }),
        None,
        Rc::clone(&http) as Rc<dyn HttpTransport>,
        Rc::new(NoRealtime),
    )
    .expect("compose");
    assert_eq!(chain.len(), 2);

    let op = Operation::new(GraphqlRequest::new("query ListEvents { listEvents { items { id } } }"));
    first_response(chain.execute(op).await.expect("stream")).await.expect("response");
    assert_eq!(http.requests.borrow()[0].header_value("x-api-key"), Some("da2-key"));
}

#[tokio::test]
async fn user_pool_pipeline_sends_bearer_token() {
    let http = Rc::new(RecordingHttp::default());
    let chain = compose(
        &config(AuthMode::AmazonCognitoUserPools),
        Some(Rc::new(StaticToken)),
        Rc::clone(&http) as Rc<dyn HttpTransport>,
        Rc::new(NoRealtime),
    )
    .expect("compose");

    let op = Operation::new(GraphqlRequest::new("{ listEvents { items { id } } }"));
    first_response(chain.execute(op).await.expect("stream")).await.expect("response");
    assert_eq!(http.requests.borrow()[0].header_value("authorization"), Some("jwt"));
}

#[test]
fn user_pool_without_token_provider_is_rejected() {
    let result = compose(
        &config(AuthMode::AmazonCognitoUserPools),
        None,
        Rc::new(RecordingHttp::default()),
        Rc::new(NoRealtime),
    );
    assert!(matches!(result, Err(LinkError::Auth(_))));
}

#[test]
fn endpoint_without_host_is_rejected() {
    let mut cfg = config(AuthMode::ApiKey { api_key: "k".to_owned() });
    cfg.graphql_endpoint = "not a url".to_owned();
    let result = compose(&cfg, None, Rc::new(RecordingHttp::default()), Rc::new(NoRealtime));
    assert!(matches!(result, Err(LinkError::Protocol(_))));
}
