pub mod steam;

pub use steam::{OwnedGameSnapshot, PriceOverview, SteamCatalog, SteamClient, SteamError};
