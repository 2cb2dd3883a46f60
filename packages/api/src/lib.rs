//! # API crate: hosted backend client for LinkStash
//!
//! Implements the [`store::Backend`] traits against a hosted backend that
//! exposes an auth service, a REST storage service, and a realtime change
//! feed under one base URL. Frontends never talk HTTP themselves: they get a
//! [`BackendClient`] from [`client()`] and hand it to the store's session
//! store, auth actions, and link repository as an `Arc<dyn Backend>`.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | Password sign-in, sign-up, sign-out, token refresh, auth-state events |
//! | [`client`] | The [`BackendClient`] itself and the process-wide instance |
//! | `rest` | Row select and insert through `/rest/v1/<table>` |
//! | `realtime` | One websocket channel per change subscription |
//!
//! ## Endpoints
//!
//! | Call | Request |
//! |------|---------|
//! | sign in | `POST /auth/v1/token?grant_type=password` |
//! | refresh | `POST /auth/v1/token?grant_type=refresh_token` |
//! | sign up | `POST /auth/v1/signup` |
//! | sign out | `POST /auth/v1/logout` |
//! | select | `GET /rest/v1/<table>?select=..&order=<col>.desc` |
//! | insert | `POST /rest/v1/<table>` with `Prefer: return=minimal` |
//! | subscribe | websocket `/realtime/v1/websocket?apikey=..&vsn=1.0.0` |
//!
//! Every request carries the anon key in the `apikey` header. Storage and
//! realtime requests authenticate with the session's access token when one is
//! held, and with the anon key otherwise.

pub mod auth;
pub mod client;
mod error;
mod realtime;
mod rest;

pub use client::{client, init, BackendClient};
