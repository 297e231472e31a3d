//! Table of every event, loaded once through the cache-first query.

use leptos::logging::error;
use leptos::prelude::*;

use crate::graphql::GraphqlClient;
use crate::graphql::operations::{EventsData, list_events};
use crate::state::events::{EventListView, LOADING_LIST};

#[component]
pub fn EventList(client: StoredValue<GraphqlClient, LocalStorage>) -> impl IntoView {
    let events = LocalResource::new(move || {
        let client = client.get_value();
        async move {
            client.query::<EventsData>(list_events()).await.map_err(|e| {
                error!("ListEvents failed: {e}");
                e.to_string()
            })
        }
    });

    view! {
        <div class="event-list">
            <h3>"Available Inventory"</h3>
            {move || match EventListView::from_query(events.get().as_ref()) {
                EventListView::Loading => view! { <p>{LOADING_LIST}</p> }.into_any(),
                EventListView::Rows(rows) => {
                    view! {
                        <table>
                            <thead>
                                <tr>
                                    <th>"ID"</th>
                                    <th>"Name"</th>
                                </tr>
                            </thead>
                            <tbody>
                                {rows
                                    .into_iter()
                                    .map(|event| {
                                        view! {
                                            <tr>
                                                <td>{event.id}</td>
                                                <td>{event.name}</td>
                                            </tr>
                                        }
                                    })
                                    .collect::<Vec<_>>()}
                            </tbody>
                        </table>
                    }
                        .into_any()
                }
            }}
        </div>
    }
}
