pub mod admin_key_service;
pub mod admin_key_service_impl;
pub use admin_key_service::{
    AdminKeyError, AdminKeyService, IssuedSecret, KeyVerification, ProvisionedKey, VerifiedKey,
};
pub use admin_key_service_impl::SeaOrmAdminKeyService;

pub mod bootstrap;
pub use bootstrap::{BootstrapError, BootstrapManager, BootstrapReport, SetupState};

pub mod compare;
pub use compare::{Comparison, LibrarySide, OwnedItem};

pub mod sync;
pub use sync::{SyncAllResult, SyncError, SyncFailure, SyncService};

pub mod prices;
pub use prices::{MAX_FETCH_ATTEMPTS, PriceBackfillResult, PriceError, PriceService};

pub mod library_service;
pub mod library_service_impl;
pub use library_service::{
    CurrencyTotal, DiscordCompareOutcome, GameComparison, LibraryError, LibraryService,
    LibraryValue, LinkOutcome, UnlinkOutcome, VisibilityOutcome,
};
pub use library_service_impl::SeaOrmLibraryService;

pub mod scheduler;
pub use scheduler::Scheduler;
