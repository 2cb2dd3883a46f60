use dioxus::prelude::*;

/// Full-screen spinner shown until the first session fetch settles.
#[component]
pub fn LoadingView() -> Element {
    rsx! {
        div {
            class: "view-page view-page--centered",
            div { class: "spinner", role: "progressbar", aria_label: "Loading" }
        }
    }
}

/// Shown instead of the app when no backend could be configured.
#[component]
pub fn ConfigErrorView(message: String) -> Element {
    rsx! {
        div {
            class: "view-page view-page--centered",
            h1 { class: "view-title", "Backend not configured" }
            p { class: "view-muted", "{message}" }
            p {
                class: "view-muted",
                "Set LINKSTASH_URL and LINKSTASH_ANON_KEY, or create linkstash.toml in the config directory."
            }
        }
    }
}
