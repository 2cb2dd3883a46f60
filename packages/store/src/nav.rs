//! Which screens are reachable, derived from the session alone.

use crate::session::SessionState;

/// A screen of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Login,
    SignUp,
    Home,
    AddLink,
}

/// The navigation graph currently in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavGraph {
    /// Before the first session fetch resolves. Nothing is reachable.
    #[default]
    Loading,
    Unauthenticated,
    Authenticated,
}

impl NavGraph {
    pub fn from_state(state: &SessionState) -> Self {
        match state {
            SessionState::Loading => Self::Loading,
            SessionState::Ready(Some(_)) => Self::Authenticated,
            SessionState::Ready(None) => Self::Unauthenticated,
        }
    }

    pub fn screens(&self) -> &'static [Screen] {
        match self {
            Self::Loading => &[],
            Self::Unauthenticated => &[Screen::Login, Screen::SignUp],
            Self::Authenticated => &[Screen::Home, Screen::AddLink],
        }
    }

    pub fn is_reachable(&self, screen: Screen) -> bool {
        self.screens().contains(&screen)
    }

    /// First screen of the graph.
    pub fn entry(&self) -> Option<Screen> {
        self.screens().first().copied()
    }

    /// `screen` if reachable, otherwise the graph's entry screen.
    pub fn resolve(&self, screen: Screen) -> Option<Screen> {
        if self.is_reachable(screen) {
            Some(screen)
        } else {
            self.entry()
        }
    }
}
