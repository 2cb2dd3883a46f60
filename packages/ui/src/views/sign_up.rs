use dioxus::prelude::*;
use dioxus::core::spawn_forever;
use store::AuthActions;
use tokio::sync::oneshot;

use crate::{post_notice, use_backend, use_notices, NoticeBoard, NoticeLevel};

/// Register and post the outcome to `notices`. Resolves to whether the
/// account was created.
///
/// Runs outside the calling view: when the backend confirms accounts
/// immediately it signs the user in before the profile insert starts, and the
/// router replaces the sign-up view while that insert is still in flight.
fn register_detached(
    actions: AuthActions,
    email: String,
    password: String,
    mut notices: Signal<NoticeBoard>,
) -> oneshot::Receiver<bool> {
    let (done, result) = oneshot::channel();
    spawn_forever(async move {
        let created = match actions.sign_up(&email, &password).await {
            Ok(outcome) => {
                if let Some(err) = outcome.profile_error {
                    post_notice(
                        &mut notices,
                        NoticeLevel::Error,
                        "Could not create profile",
                        &err.message(),
                    );
                }
                post_notice(
                    &mut notices,
                    NoticeLevel::Success,
                    "Account created",
                    "We sent you a verification email. Please check your inbox.",
                );
                true
            }
            Err(err) => {
                post_notice(&mut notices, NoticeLevel::Error, "Error", &err.to_string());
                false
            }
        };
        let _ = done.send(created);
    });
    result
}

/// Account registration.
///
/// After the account is created the view reports the outcome and calls
/// `on_back`. A failed profile insert gets its own notice but does not undo
/// the account.
#[component]
pub fn SignUpView(on_back: EventHandler<()>) -> Element {
    let backend = use_backend();
    let notices = use_notices();
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut pending = use_signal(|| false);

    let handle_sign_up = move |_| {
        if pending() {
            return;
        }
        pending.set(true);
        let result = register_detached(backend.auth(), email(), password(), notices);
        // Dropped along with the view; the registration itself carries on.
        spawn(async move {
            let created = result.await.unwrap_or(false);
            pending.set(false);
            if created {
                on_back.call(());
            }
        });
    };

    rsx! {
        div {
            class: "view-page view-page--centered",
            h1 { class: "view-title", "Create account" }

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
                onclick: handle_sign_up,
                if pending() { "Creating account..." } else { "Register" }
            }
            button {
                class: "btn btn--outline",
                disabled: pending(),
                onclick: move |_| on_back.call(()),
                "Back"
            }
        }
    }
}
