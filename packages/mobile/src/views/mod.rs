mod auth;
pub use auth::{Login, SignUp};

mod links;
pub use links::{AddLink, Home};
