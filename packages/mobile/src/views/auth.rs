use dioxus::prelude::*;

use ui::views::{LoginView, SignUpView};

use crate::Route;

#[component]
pub fn Login() -> Element {
    let nav = use_navigator();
    rsx! {
        LoginView {
            on_sign_up: move |_| {
                nav.push(Route::SignUp {});
            },
        }
    }
}

#[component]
pub fn SignUp() -> Element {
    let nav = use_navigator();
    rsx! {
        SignUpView {
            on_back: move |_| {
                nav.replace(Route::Login {});
            },
        }
    }
}
