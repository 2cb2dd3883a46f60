use dioxus::prelude::*;

use crate::{post_notice, use_backend, use_notices, NoticeLevel};

/// Email and password sign-in.
///
/// Nothing happens here on success: the session store picks up the new
/// session and the router moves to the signed-in screens.
#[component]
pub fn LoginView(on_sign_up: EventHandler<()>) -> Element {
    let backend = use_backend();
    let mut notices = use_notices();
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut pending = use_signal(|| false);

    let handle_sign_in = move |_| {
        if pending() {
            return;
        }
        let actions = backend.auth();
        spawn(async move {
            pending.set(true);
            if let Err(err) = actions.sign_in(&email(), &password()).await {
                post_notice(&mut notices, NoticeLevel::Error, "Error", &err.to_string());
            }
            pending.set(false);
        });
    };

    rsx! {
        div {
            class: "view-page view-page--centered",
            h1 { class: "view-title", "Sign in" }

            input {
                class: "field",
                r#type: "email",
                placeholder: "Email",
                autocapitalize: "none",
                value: email(),
                oninput: move |evt: FormEvent| email.set(evt.value()),
            }
            input {
                class: "field",
                r#type: "password",
                placeholder: "Password",
                value: password(),
                oninput: move |evt: FormEvent| password.set(evt.value()),
            }

            button {
                class: "btn btn--primary",
                disabled: pending(),
                onclick: handle_sign_in,
                if pending() { "Signing in..." } else { "Sign in" }
            }
            button {
                class: "btn btn--outline",
                disabled: pending(),
                onclick: move |_| on_sign_up.call(()),
                "Create account"
            }
        }
    }
}
