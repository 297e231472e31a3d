//! Root application component and the SSR shell.

use appsync::ClientConfig;
use leptos::logging::error;
use leptos::prelude::*;
use leptos_meta::{MetaTags, Title, provide_meta_context};

use crate::components::{event_list::EventList, latest_events::LatestEvents};
use crate::services::{self, Services};
use crate::state::auth::AuthState;
use crate::state::session::AuthSession;

/// HTML shell rendered on the server for SSR + hydration.
pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <AutoReload options=options.clone()/>
                <HydrationScripts options/>
                <MetaTags/>
            </head>
            <body>
                <App/>
            </body>
        </html>
    }
}

/// Root application component.
///
/// Loads the client configuration, then hands it to [`Home`]. Nothing is
/// shown until the configuration arrives.
#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    let config = LocalResource::new(services::fetch_config);

    view! {
        <Title text="Event Board"/>

        <Suspense fallback=|| ()>
            {move || {
                config
                    .get()
                    .map(|result| match result {
                        Ok(config) => view! { <Home config/> }.into_any(),
                        Err(e) => {
                            error!("client configuration unavailable: {e}");
                            ().into_any()
                        }
                    })
            }}
        </Suspense>
    }
}

/// Sign-in button while nobody is signed in, otherwise the sign-out button
/// and both event views.
#[component]
fn Home(config: ClientConfig) -> impl IntoView {
    let services = match Services::start(&config) {
        Ok(services) => services,
        Err(e) => {
            error!("could not start services: {e}");
            return ().into_any();
        }
    };

    let auth = RwSignal::new(AuthState::default());
    services.session.with_value(|session| {
        session.on_change(move |state| auth.set(state.clone()));
        session.mount();
    });
    on_cleanup(move || {
        let _ = services.session.try_with_value(AuthSession::teardown);
    });

    // Finish a hosted-UI redirect; success announces `signIn` on the hub.
    #[cfg(feature = "hydrate")]
    {
        if let Some(href) = crate::util::browser::current_href() {
            let identity = services.identity.get_value();
            leptos::task::spawn_local(async move {
                if let Err(e) = identity.complete_sign_in(&href).await {
                    leptos::logging::warn!("sign-in redirect not completed: {e}");
                }
            });
        }
    }

    let on_sign_in = move |_| {
        services.session.with_value(|session| {
            let _ = session.federated_sign_in();
        });
    };
    let on_sign_out = move |_| {
        let session = services.session.get_value();
        leptos::task::spawn_local(async move {
            let _ = session.sign_out().await;
        });
    };
    let sign_in_disabled = !services.sign_in_enabled;

    view! {
        <div class="app">
            <Show
                when=move || auth.with(AuthState::is_signed_in)
                fallback=move || {
                    view! {
                        <button class="app__sign-in" disabled=sign_in_disabled on:click=on_sign_in>
                            "Sign In"
                        </button>
                    }
                }
            >
                <button class="app__sign-out" on:click=on_sign_out>
                    "Sign Out"
                </button>
                <EventList client=services.client/>
                <LatestEvents client=services.client/>
            </Show>
        </div>
    }
    .into_any()
}
