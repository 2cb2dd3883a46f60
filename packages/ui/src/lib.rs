//! This crate contains all shared UI for the workspace.
//!
//! Views take navigation callbacks instead of routes, so each platform crate
//! owns its router and decides where "back" or "add" leads.

use dioxus::prelude::*;

// Re-export icon library
pub use dioxus_free_icons::Icon;
pub mod icons {
    pub use dioxus_free_icons::icons::fa_solid_icons::*;
}

pub mod views;

pub const LINKSTASH_CSS: Asset = asset!("/assets/linkstash.css");

mod auth;
pub use auth::{use_auth, use_backend, AuthProvider, BackendHandle};

pub mod notices;
pub use notices::{post_notice, use_notices, Notice, NoticeBoard, NoticeLevel, NoticeList};
