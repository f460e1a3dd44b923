pub mod admin_key;
pub mod game;
pub mod owned_game;
pub mod steam_account;
pub mod system_flag;
pub mod user;
