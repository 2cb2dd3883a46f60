use dioxus::prelude::*;
use store::Link;

use crate::Icon;
use crate::icons::FaStar;

/// One row of the link list.
#[component]
pub fn LinkCard(link: Link) -> Element {
    rsx! {
        div {
            class: "link-card",
            strong { class: "link-card-title", "{link.display_title()}" }
            if let Some(description) = &link.description {
                p { class: "link-card-description", "{description}" }
            }
            a {
                class: "link-card-url",
                href: "{link.url}",
                "{link.url}"
            }
            if let Some(tags) = link.tag_line() {
                p { class: "link-card-tags", "Tags: {tags}" }
            }
            if link.favorite {
                span {
                    class: "link-card-favorite",
                    Icon { icon: FaStar, width: 12, height: 12 }
                    " Favorite"
                }
            }
        }
    }
}
