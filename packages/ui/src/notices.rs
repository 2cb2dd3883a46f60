//! User-facing notices: validation problems, backend errors, confirmations.

use dioxus::prelude::*;

use crate::Icon;
use crate::icons::{FaCircleCheck, FaCircleExclamation, FaCircleInfo, FaXmark};

#[derive(Clone, Debug, PartialEq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl NoticeLevel {
    fn class(&self) -> &'static str {
        match self {
            Self::Info => "notice--info",
            Self::Success => "notice--success",
            Self::Error => "notice--error",
        }
    }
}

fn level_icon(level: &NoticeLevel) -> Element {
    match level {
        NoticeLevel::Info => rsx! { Icon { icon: FaCircleInfo, width: 14, height: 14 } },
        NoticeLevel::Success => rsx! { Icon { icon: FaCircleCheck, width: 14, height: 14 } },
        NoticeLevel::Error => rsx! { Icon { icon: FaCircleExclamation, width: 14, height: 14 } },
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub id: u64,
    pub timestamp: String,
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct NoticeBoard {
    pub entries: Vec<Notice>,
    next_id: u64,
}

impl NoticeBoard {
    pub fn push(&mut self, level: NoticeLevel, title: &str, message: &str) -> u64 {
        self.next_id += 1;
        self.entries.push(Notice {
            id: self.next_id,
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            level,
            title: title.to_string(),
            message: message.to_string(),
        });
        self.next_id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.entries.retain(|notice| notice.id != id);
    }
}

pub fn use_notices() -> Signal<NoticeBoard> {
    use_context::<Signal<NoticeBoard>>()
}

pub fn post_notice(board: &mut Signal<NoticeBoard>, level: NoticeLevel, title: &str, message: &str) {
    match level {
        NoticeLevel::Error => tracing::warn!("{title}: {message}"),
        _ => tracing::debug!("{title}: {message}"),
    }
    board.write().push(level, title, message);
}

/// Stack of open notices, newest last. Each one stays until dismissed.
#[component]
pub fn NoticeList() -> Element {
    let mut board = use_notices();
    let entries = board.read().entries.clone();

    if entries.is_empty() {
        return rsx! {};
    }

    rsx! {
        div {
            class: "notice-list",
            for notice in entries {
                div {
                    key: "{notice.id}",
                    class: "notice {notice.level.class()}",
                    span {
                        class: "notice-icon",
                        {level_icon(&notice.level)}
                    }
                    div {
                        class: "notice-body",
                        strong { "{notice.title}" }
                        p { "{notice.message}" }
                    }
                    button {
                        class: "notice-dismiss",
                        title: "Dismiss",
                        onclick: move |_| board.write().dismiss(notice.id),
                        Icon { icon: FaXmark, width: 12, height: 12 }
                    }
                }
            }
        }
    }
}
