use dioxus::prelude::*;
use store::{LinkList, LinkRepository};

use super::LinkCard;
use crate::Icon;
use crate::icons::{FaPlus, FaRightFromBracket, FaRotateRight};
use crate::{post_notice, use_backend, use_notices, NoticeLevel};

/// Fetch the list and store the result. Read failures keep what is shown.
async fn refresh(repo: &LinkRepository, mut list: Signal<LinkList>) {
    list.write().refreshing = true;
    let result = repo.list().await;
    list.write().apply(result);
}

/// The signed-in user's links, newest first.
///
/// The list is fetched on mount, again on every change notification from the
/// links collection, and whenever the refresh button is pressed. The change
/// subscription lives as long as this view.
#[component]
pub fn HomeView(on_add_link: EventHandler<()>) -> Element {
    let backend = use_backend();
    let repo = use_hook(|| backend.links());
    let list = use_signal(LinkList::default);
    let mut notices = use_notices();
    let mut signing_out = use_signal(|| false);

    let watch_repo = repo.clone();
    use_future(move || {
        let repo = watch_repo.clone();
        async move {
            refresh(&repo, list).await;
            let mut watch = match repo.watch_changes().await {
                Ok(watch) => watch,
                Err(err) => {
                    tracing::warn!("Live updates unavailable: {err}");
                    return;
                }
            };
            while watch.changed().await {
                refresh(&repo, list).await;
            }
            tracing::warn!("Live updates stopped; use refresh to reload links");
        }
    });

    let handle_refresh = move |_| {
        let repo = repo.clone();
        spawn(async move {
            refresh(&repo, list).await;
        });
    };

    let handle_sign_out = move |_| {
        if signing_out() {
            return;
        }
        let actions = backend.auth();
        spawn(async move {
            signing_out.set(true);
            if let Err(err) = actions.sign_out().await {
                post_notice(&mut notices, NoticeLevel::Error, "Error", &err.to_string());
            }
            signing_out.set(false);
        });
    };

    let state = list.read().clone();

    rsx! {
        div {
            class: "view-page",
            div {
                class: "view-header",
                h1 { class: "view-title", "Your links" }
                div {
                    class: "view-actions",
                    button {
                        class: "btn btn--primary",
                        onclick: move |_| on_add_link.call(()),
                        Icon { icon: FaPlus, width: 12, height: 12 }
                        " Add link"
                    }
                    button {
                        class: "btn btn--outline",
                        disabled: signing_out(),
                        onclick: handle_sign_out,
                        Icon { icon: FaRightFromBracket, width: 12, height: 12 }
                        " Sign out"
                    }
                }
            }

            button {
                class: "btn btn--ghost refresh-button",
                disabled: state.refreshing,
                onclick: handle_refresh,
                Icon { icon: FaRotateRight, width: 12, height: 12 }
                if state.refreshing { " Refreshing..." } else { " Refresh" }
            }

            if state.links.is_empty() && !state.refreshing {
                p { class: "view-muted", "No links yet." }
            }

            div {
                class: "link-list",
                for link in &state.links {
                    LinkCard { key: "{link.id}", link: link.clone() }
                }
            }
        }
    }
}
