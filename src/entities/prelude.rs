pub use super::administrator_keys::Entity as AdministratorKeys;
pub use super::games::Entity as Games;
pub use super::owned_games::Entity as OwnedGames;
pub use super::steam_accounts::Entity as SteamAccounts;
pub use super::system_flags::Entity as SystemFlags;
pub use super::users::Entity as Users;
