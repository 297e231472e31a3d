use std::cell::Cell;
use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream;

use super::operations::{EventsData, News, list_events, new_events};
use super::*;
use crate::net::link::{Link, Next, ResponseStream};

/// Terminating link that answers from a script and counts calls.
#[derive(Default)]
struct Scripted {
    replies: RefCell<VecDeque<Result<Vec<GraphqlResponse>, LinkError>>>,
    calls: Cell<u32>,
    last_query: RefCell<Option<String>>,
}

impl Scripted {
    fn reply(&self, responses: Vec<GraphqlResponse>) {
        self.replies.borrow_mut().push_back(Ok(responses));
    }
}

#[async_trait(?Send)]
impl Link for Scripted {
    async fn request(&self, operation: Operation, _next: Next<'_>) -> Result<ResponseStream, LinkError> {
        self.calls.set(self.calls.get() + 1);
        *self.last_query.borrow_mut() = Some(operation.request.query);
        let responses = self.replies.borrow_mut().pop_front().unwrap_or(Err(LinkError::Closed))?;
        Ok(stream::iter(responses.into_iter().map(Ok)).boxed_local())
    }
}

fn client(config: CacheConfig) -> (GraphqlClient, Rc<Scripted>) {
    let link = Rc::new(Scripted::default());
    let chain = LinkChain::from(vec![Rc::clone(&link) as Rc<dyn Link>]);
    (GraphqlClient::new(chain, InMemoryCache::new(config)), link)
}

fn app_cache() -> CacheConfig {
    CacheConfig { add_typename: false, identify: None }
}

fn concert() -> GraphqlResponse {
    GraphqlResponse::from_data(serde_json::json!({"listEvents": {"items": [{"id": "1", "name": "Concert"}]}}))
}

fn news_item(id: &str, name: &str) -> GraphqlResponse {
    GraphqlResponse::from_data(serde_json::json!({"subscribeToEvents": {"id": id, "name": name}}))
}

#[tokio::test]
async fn query_is_served_from_cache_the_second_time() {
    let (client, link) = client(app_cache());
    link.reply(vec![concert()]);

    let first: EventsData = client.query(list_events()).await.expect("first");
    let second: EventsData = client.query(list_events()).await.expect("second");
    assert_eq!(first, second);
    assert_eq!(first.list_events.items[0].name, "Concert");
    assert_eq!(link.calls.get(), 1);
}

#[tokio::test]
async fn reset_cache_forces_refetch() {
    let (client, link) = client(app_cache());
    link.reply(vec![concert()]);
    link.reply(vec![concert()]);

    let _: EventsData = client.query(list_events()).await.expect("first");
    client.with_cache(InMemoryCache::reset);
    let _: EventsData = client.query(list_events()).await.expect("second");
    assert_eq!(link.calls.get(), 2);
}

#[tokio::test]
async fn graphql_errors_reject_and_are_not_cached() {
    let (client, link) = client(app_cache());
    link.reply(vec![GraphqlResponse {
        data: None,
        errors: vec![GraphqlError {
            message: "Not Authorized to access listEvents".to_owned(),
            error_type: Some("Unauthorized".to_owned()),
            path: Vec::new(),
            locations: Vec::new(),
        }],
    }]);

    let err = client.query::<EventsData>(list_events()).await.expect_err("should fail");
    assert!(matches!(&err, ClientError::Graphql(errors) if errors.len() == 1));
    assert_eq!(err.to_string(), "graphql error: Not Authorized to access listEvents");
    assert!(client.with_cache(|cache| cache.read_query(&list_events())).is_none());
}

#[tokio::test]
async fn link_failure_surfaces_as_client_error() {
    let (client, _link) = client(app_cache());
    let err = client.query::<EventsData>(list_events()).await.expect_err("should fail");
    assert!(matches!(err, ClientError::Link(LinkError::Closed)));
}

#[tokio::test]
async fn missing_data_is_empty_response() {
    let (client, link) = client(app_cache());
    link.reply(vec![GraphqlResponse::default()]);
    let err = client.query::<EventsData>(list_events()).await.expect_err("should fail");
    assert!(matches!(err, ClientError::EmptyResponse));
}

#[tokio::test]
async fn unexpected_shape_is_decode_error() {
    let (client, link) = client(app_cache());
    link.reply(vec![GraphqlResponse::from_data(serde_json::json!({"listEvents": 5}))]);
    let err = client.query::<EventsData>(list_events()).await.expect_err("should fail");
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn mutate_always_hits_the_network() {
    let (client, link) = client(app_cache());
    let created = GraphqlResponse::from_data(serde_json::json!({"createEvent": {"id": "3", "name": "New"}}));
    link.reply(vec![created.clone()]);
    link.reply(vec![created]);

    let request = GraphqlRequest::new("mutation CreateEvent { createEvent(name: \"New\") { id name } }");
    let _: serde_json::Value = client.mutate(request.clone()).await.expect("first");
    let _: serde_json::Value = client.mutate(request).await.expect("second");
    assert_eq!(link.calls.get(), 2);
}

#[tokio::test]
async fn subscription_items_decode_and_normalize() {
    let identify: cache::IdentifyFn = Rc::new(|object: &serde_json::Map<String, Value>| {
        object.get("id").and_then(Value::as_str).map(|id| format!("Event:{id}"))
    });
    let (client, link) = client(CacheConfig { add_typename: false, identify: Some(identify) });
    link.reply(vec![news_item("1", "A"), news_item("2", "B")]);

    let items: Vec<News> = client
        .subscribe::<News>(new_events())
        .await
        .expect("subscribe")
        .map(|item| item.expect("item"))
        .collect()
        .await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].subscribe_to_events.name, "B");
    assert_eq!(
        client.with_cache(|cache| cache.read_object("Event:2")),
        Some(serde_json::json!({"id": "2", "name": "B"}))
    );
}

#[tokio::test]
async fn typename_is_added_only_when_configured() {
    let (plain, link) = client(app_cache());
    link.reply(vec![concert()]);
    let _: EventsData = plain.query(list_events()).await.expect("plain");
    assert!(!link.last_query.borrow().as_deref().unwrap_or_default().contains("__typename"));

    let (typed, link) = client(CacheConfig::default());
    link.reply(vec![concert()]);
    let _: EventsData = typed.query(list_events()).await.expect("typed");
    assert!(link.last_query.borrow().as_deref().unwrap_or_default().contains("__typename"));
}
