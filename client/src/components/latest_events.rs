//! The most recent event pushed by the `getNewEvents` subscription.
//!
//! The subscription lives as long as the component. Unmounting aborts the
//! task, which drops the stream and stops the subscription on the socket.

use leptos::prelude::*;

use crate::graphql::GraphqlClient;
use crate::state::events::LatestEventView;

#[component]
pub fn LatestEvents(client: StoredValue<GraphqlClient, LocalStorage>) -> impl IntoView {
    let latest = RwSignal::new(LatestEventView::default());

    #[cfg(feature = "hydrate")]
    {
        use futures::StreamExt;
        use futures::future::abortable;
        use leptos::logging::error;

        use crate::graphql::operations::{News, new_events};

        let client = client.get_value();
        let (task, handle) = abortable(async move {
            let mut news = match client.subscribe::<News>(new_events()).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!("getNewEvents failed: {e}");
                    return;
                }
            };
            while let Some(item) = news.next().await {
                match item {
                    Ok(news) => latest.update(|view| view.apply(news)),
                    Err(e) => error!("getNewEvents error: {e}"),
                }
            }
        });
        leptos::task::spawn_local(async move {
            let _ = task.await;
        });
        on_cleanup(move || handle.abort());
    }
    #[cfg(not(feature = "hydrate"))]
    let _ = client;

    view! {
        <div class="latest-events">
            <h5>"Latest News"</h5>
            <p>{move || latest.with(|view| view.display().to_owned())}</p>
        </div>
    }
}
