use dioxus::prelude::*;
use store::{NavGraph, Screen};
use views::{AddLink, Home, Login, SignUp};

mod views;

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[layout(Gate)]
        #[route("/")]
        Home {},
        #[route("/links/new")]
        AddLink {},
        #[route("/login")]
        Login {},
        #[route("/signup")]
        SignUp {},
}

impl Route {
    fn screen(&self) -> Screen {
        match self {
            Route::Home {} => Screen::Home,
            Route::AddLink {} => Screen::AddLink,
            Route::Login {} => Screen::Login,
            Route::SignUp {} => Screen::SignUp,
        }
    }
}

impl From<Screen> for Route {
    fn from(screen: Screen) -> Self {
        match screen {
            Screen::Home => Route::Home {},
            Screen::AddLink => Route::AddLink {},
            Screen::Login => Route::Login {},
            Screen::SignUp => Route::SignUp {},
        }
    }
}

fn main() {
    dioxus::launch(App);
}

#[cfg(not(feature = "offline"))]
fn connect() -> Result<ui::BackendHandle, String> {
    let client = api::client().map_err(|err| err.to_string())?;
    let tables = client.tables().clone();
    Ok(ui::BackendHandle::new(client, tables))
}

#[cfg(feature = "offline")]
fn connect() -> Result<ui::BackendHandle, String> {
    tracing::info!("Using the in-memory backend");
    Ok(ui::BackendHandle::new(
        std::sync::Arc::new(store::MemoryBackend::new()),
        Default::default(),
    ))
}

#[component]
fn App() -> Element {
    use_context_provider(|| Signal::new(ui::NoticeBoard::default()));
    let backend = use_hook(|| {
        connect().inspect_err(|err| tracing::error!("Backend unavailable: {err}"))
    });

    rsx! {
        document::Stylesheet { href: ui::LINKSTASH_CSS }
        {
            match backend {
                Ok(backend) => rsx! {
                    ui::AuthProvider { backend, Router::<Route> {} }
                },
                Err(message) => rsx! {
                    ui::views::ConfigErrorView { message }
                },
            }
        }
    }
}

/// Keeps the current route inside the navigation graph of the session.
#[component]
fn Gate() -> Element {
    let auth = ui::use_auth();
    let route = use_route::<Route>();
    let nav = use_navigator();

    let graph = NavGraph::from_state(&auth.read());
    let Some(target) = graph.resolve(route.screen()) else {
        return rsx! { ui::views::LoadingView {} };
    };
    if target != route.screen() {
        nav.replace(Route::from(target));
        return rsx! { ui::views::LoadingView {} };
    }

    rsx! {
        ui::NoticeList {}
        Outlet::<Route> {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use store::{Session, SessionState, UserInfo};

    fn signed_in() -> SessionState {
        SessionState::Ready(Some(Arc::new(Session {
            user: UserInfo {
                id: "u1".into(),
                email: None,
            },
            access_token: "jwt".into(),
            refresh_token: None,
            expires_at: None,
        })))
    }

    #[test]
    fn test_routes_follow_session() {
        let guest = NavGraph::from_state(&SessionState::Ready(None));
        let target = guest.resolve(Route::AddLink {}.screen()).map(Route::from);
        assert_eq!(target, Some(Route::Login {}));

        let member = NavGraph::from_state(&signed_in());
        let target = member.resolve(Route::SignUp {}.screen()).map(Route::from);
        assert_eq!(target, Some(Route::Home {}));
        assert_eq!(
            member.resolve(Route::AddLink {}.screen()).map(Route::from),
            Some(Route::AddLink {})
        );

        assert_eq!(NavGraph::from_state(&SessionState::Loading).resolve(Screen::Home), None);
    }

    #[test]
    fn test_every_screen_has_a_route() {
        for screen in [Screen::Login, Screen::SignUp, Screen::Home, Screen::AddLink] {
            assert_eq!(Route::from(screen).screen(), screen);
        }
    }
}
