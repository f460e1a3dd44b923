pub mod prelude;

pub mod administrator_keys;
pub mod games;
pub mod owned_games;
pub mod steam_accounts;
pub mod system_flags;
pub mod users;
