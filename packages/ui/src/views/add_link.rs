use dioxus::prelude::*;
use store::LinkForm;

use crate::{post_notice, use_backend, use_notices, NoticeLevel};

/// Form for saving a new link.
///
/// A missing URL is reported without contacting the backend. When the save
/// fails the form keeps its contents so the user can retry.
#[component]
pub fn AddLinkView(on_saved: EventHandler<()>) -> Element {
    let backend = use_backend();
    let mut notices = use_notices();
    let mut form = use_signal(LinkForm::default);
    let mut pending = use_signal(|| false);

    let handle_save = move |_| {
        if pending() {
            return;
        }
        let link = match form.read().to_new_link() {
            Ok(link) => link,
            Err(err) => {
                post_notice(&mut notices, NoticeLevel::Error, "Error", &err.to_string());
                return;
            }
        };
        let repo = backend.links();
        spawn(async move {
            pending.set(true);
            match repo.insert(&link).await {
                Ok(()) => {
                    post_notice(&mut notices, NoticeLevel::Success, "Saved", "Link saved");
                    pending.set(false);
                    on_saved.call(());
                }
                Err(err) => {
                    post_notice(&mut notices, NoticeLevel::Error, "Error", &err.message());
                    pending.set(false);
                }
            }
        });
    };

    let current = form.read().clone();

    rsx! {
        div {
            class: "view-page",
            h1 { class: "view-title", "Add link" }

            label { class: "field-label", r#for: "link-url", "URL *" }
            input {
                id: "link-url",
                class: "field",
                r#type: "url",
                autocapitalize: "none",
                value: "{current.url}",
                oninput: move |evt: FormEvent| form.write().url = evt.value(),
            }

            label { class: "field-label", r#for: "link-title", "Title" }
            input {
                id: "link-title",
                class: "field",
                r#type: "text",
                value: "{current.title}",
                oninput: move |evt: FormEvent| form.write().title = evt.value(),
            }

            label { class: "field-label", r#for: "link-description", "Description" }
            textarea {
                id: "link-description",
                class: "field field--multiline",
                value: "{current.description}",
                oninput: move |evt: FormEvent| form.write().description = evt.value(),
            }

            label { class: "field-label", r#for: "link-tags", "Tags (comma separated)" }
            input {
                id: "link-tags",
                class: "field",
                r#type: "text",
                value: "{current.tags}",
                oninput: move |evt: FormEvent| form.write().tags = evt.value(),
            }

            label {
                class: "field-toggle",
                input {
                    r#type: "checkbox",
                    checked: current.favorite,
                    onchange: move |evt: FormEvent| form.write().favorite = evt.checked(),
                }
                " Favorite"
            }

            button {
                class: "btn btn--primary",
                disabled: pending(),
                onclick: handle_save,
                if pending() { "Saving..." } else { "Save" }
            }
        }
    }
}
