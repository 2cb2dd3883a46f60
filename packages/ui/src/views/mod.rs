mod loading;
pub use loading::{ConfigErrorView, LoadingView};

mod link_card;
pub use link_card::LinkCard;

mod login;
pub use login::LoginView;

mod sign_up;
pub use sign_up::SignUpView;

mod home;
pub use home::HomeView;

mod add_link;
pub use add_link::AddLinkView;
