use dioxus::prelude::*;

use ui::views::{AddLinkView, HomeView};

use crate::Route;

#[component]
pub fn Home() -> Element {
    let nav = use_navigator();
    rsx! {
        HomeView {
            on_add_link: move |_| {
                nav.push(Route::AddLink {});
            },
        }
    }
}

#[component]
pub fn AddLink() -> Element {
    let nav = use_navigator();
    rsx! {
        AddLinkView {
            on_saved: move |_| {
                if nav.can_go_back() {
                    nav.go_back();
                } else {
                    nav.replace(Route::Home {});
                }
            },
        }
    }
}
