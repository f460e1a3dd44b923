//! `SeaORM` implementation of the `LibraryService` trait.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tracing::info;

use crate::db::{Game, OwnedGameWithGame, SteamAccount, SteamProfile, Store, User};
use crate::services::compare::{self, LibrarySide, OwnedItem};
use crate::services::library_service::{
    CurrencyTotal, DiscordCompareOutcome, GameComparison, LibraryError, LibraryService,
    LibraryValue, LinkOutcome, UnlinkOutcome, VisibilityOutcome,
};

pub struct SeaOrmLibraryService {
    store: Store,
}

/// A user's side of a comparison plus the catalog rows needed to render it.
struct LoadedLibrary {
    side: LibrarySide,
    games: HashMap<i32, Game>,
}

impl LoadedLibrary {
    fn resolve(&self, app_ids: &[i32]) -> Vec<Game> {
        app_ids
            .iter()
            .filter_map(|id| self.games.get(id).cloned())
            .collect()
    }

    fn visible_count(&self) -> usize {
        self.games.len()
    }
}

impl SeaOrmLibraryService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn account_ids(&self, user_id: i32) -> Result<Vec<i32>, LibraryError> {
        Ok(self
            .store
            .list_steam_accounts_for_user(user_id)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect())
    }

    async fn load_library(&self, user_id: i32) -> Result<LoadedLibrary, LibraryError> {
        let account_ids = self.account_ids(user_id).await?;
        let rows = self
            .store
            .visible_owned_games_with_games(&account_ids)
            .await?;

        let mut games = HashMap::new();
        let items = rows
            .into_iter()
            .map(|row| {
                if let Some(game) = row.game {
                    games.entry(row.owned.app_id).or_insert(game);
                }
                OwnedItem {
                    account_id: row.owned.steam_account_id,
                    app_id: row.owned.app_id,
                    hidden: row.owned.hidden,
                }
            })
            .collect();

        Ok(LoadedLibrary {
            side: LibrarySide { account_ids, items },
            games,
        })
    }

    async fn compare_loaded(
        &self,
        current_user_id: i32,
        target_user_id: i32,
    ) -> Result<DiscordCompareOutcome, LibraryError> {
        let current = self.load_library(current_user_id).await?;
        let target = self.load_library(target_user_id).await?;

        if current.side.account_ids.is_empty() || target.side.account_ids.is_empty() {
            return Ok(DiscordCompareOutcome::NotFound);
        }

        let result = compare::compare(&current.side, &target.side);
        let shared_games = current.resolve(&result.shared);

        Ok(DiscordCompareOutcome::Found {
            shared_count: result.shared.len(),
            shared_games,
            current_user_game_count: current.visible_count(),
            target_user_game_count: target.visible_count(),
        })
    }
}

fn is_steam_id64(steam_id: &str) -> bool {
    steam_id.len() == 17 && steam_id.bytes().all(|b| b.is_ascii_digit())
}

#[async_trait]
impl LibraryService for SeaOrmLibraryService {
    async fn register_user(
        &self,
        discord_id: &str,
        username: &str,
        avatar: Option<&str>,
    ) -> Result<User, LibraryError> {
        if discord_id.trim().is_empty() || username.trim().is_empty() {
            return Err(LibraryError::Validation(
                "Discord id and username are required".to_string(),
            ));
        }

        Ok(self
            .store
            .upsert_discord_user(discord_id.trim(), username.trim(), avatar)
            .await?)
    }

    async fn link_steam_account(
        &self,
        user_id: i32,
        profile: &SteamProfile,
    ) -> Result<LinkOutcome, LibraryError> {
        if !is_steam_id64(&profile.steam_id) {
            return Err(LibraryError::Validation(format!(
                "Invalid SteamID64: {}",
                profile.steam_id
            )));
        }

        if self.store.get_user(user_id).await?.is_none() {
            return Err(LibraryError::UserNotFound(user_id));
        }

        if let Some(existing) = self
            .store
            .get_steam_account_by_steam_id(&profile.steam_id)
            .await?
        {
            if existing.user_id != user_id {
                return Ok(LinkOutcome::AlreadyLinkedToAnotherUser);
            }

            self.store.update_steam_profile(existing.id, profile).await?;
            let account = self
                .store
                .get_steam_account(existing.id)
                .await?
                .unwrap_or(existing);

            return Ok(LinkOutcome::Linked {
                account,
                is_new: false,
            });
        }

        let account = self.store.insert_steam_account(user_id, profile).await?;

        info!(
            event = "steam_account_linked",
            user_id,
            steam_account_id = account.id,
            "Steam account linked"
        );

        Ok(LinkOutcome::Linked {
            account,
            is_new: true,
        })
    }

    async fn linked_accounts(&self, user_id: i32) -> Result<Vec<SteamAccount>, LibraryError> {
        Ok(self.store.list_steam_accounts_for_user(user_id).await?)
    }

    async fn unlink_steam_account(
        &self,
        user_id: i32,
        steam_account_id: i32,
    ) -> Result<UnlinkOutcome, LibraryError> {
        match self.store.get_steam_account(steam_account_id).await? {
            Some(account) if account.user_id == user_id => {
                self.store.delete_steam_account(steam_account_id).await?;
                info!(
                    event = "steam_account_unlinked",
                    user_id,
                    steam_account_id,
                    "Steam account unlinked"
                );
                Ok(UnlinkOutcome::Unlinked)
            }
            _ => Ok(UnlinkOutcome::NotFoundOrUnauthorized),
        }
    }

    async fn set_game_visibility(
        &self,
        user_id: i32,
        steam_account_id: i32,
        app_id: i32,
        hidden: bool,
    ) -> Result<VisibilityOutcome, LibraryError> {
        match self.store.get_steam_account(steam_account_id).await? {
            Some(account) if account.user_id == user_id => {
                let updated = self
                    .store
                    .set_game_hidden(steam_account_id, app_id, hidden)
                    .await?;
                if updated == 0 {
                    return Ok(VisibilityOutcome::NotFoundOrUnauthorized);
                }
                Ok(VisibilityOutcome::Updated)
            }
            _ => Ok(VisibilityOutcome::NotFoundOrUnauthorized),
        }
    }

    async fn visible_games(&self, user_id: i32) -> Result<Vec<OwnedGameWithGame>, LibraryError> {
        let account_ids = self.account_ids(user_id).await?;
        Ok(self
            .store
            .visible_owned_games_with_games(&account_ids)
            .await?)
    }

    async fn user_visible_games(
        &self,
        user_id: i32,
    ) -> Result<Vec<OwnedGameWithGame>, LibraryError> {
        if self.store.get_user(user_id).await?.is_none() {
            return Ok(Vec::new());
        }

        self.visible_games(user_id).await
    }

    async fn library_value(&self, user_id: i32) -> Result<LibraryValue, LibraryError> {
        let library = self.load_library(user_id).await?;

        let mut totals: BTreeMap<String, CurrencyTotal> = BTreeMap::new();
        let mut unpriced_games = 0;

        for game in library.games.values() {
            let Some(price) = &game.price else {
                unpriced_games += 1;
                continue;
            };

            let entry = totals
                .entry(price.currency.clone())
                .or_insert_with(|| CurrencyTotal {
                    currency: price.currency.clone(),
                    total_initial: 0,
                    total_final: 0,
                    game_count: 0,
                });
            entry.total_initial += i64::from(price.initial);
            entry.total_final += i64::from(price.final_price);
            entry.game_count += 1;
        }

        Ok(LibraryValue {
            totals: totals.into_values().collect(),
            unpriced_games,
        })
    }

    async fn compare_users(
        &self,
        current_user_id: i32,
        target_user_id: i32,
    ) -> Result<GameComparison, LibraryError> {
        let current = self.load_library(current_user_id).await?;
        let target = self.load_library(target_user_id).await?;

        let result = compare::compare(&current.side, &target.side);

        Ok(GameComparison {
            shared: current.resolve(&result.shared),
            only_current_user: current.resolve(&result.only_a),
            only_target_user: target.resolve(&result.only_b),
        })
    }

    async fn compare_by_discord_id(
        &self,
        current_user_id: i32,
        discord_id: &str,
    ) -> Result<DiscordCompareOutcome, LibraryError> {
        let Some(target) = self.store.get_user_by_discord_id(discord_id).await? else {
            return Ok(DiscordCompareOutcome::NotFound);
        };

        if target.id == current_user_id {
            return Ok(DiscordCompareOutcome::IsSelf);
        }

        self.compare_loaded(current_user_id, target.id).await
    }

    async fn compare_discord_users(
        &self,
        invoker_discord_id: &str,
        target_discord_id: &str,
    ) -> Result<DiscordCompareOutcome, LibraryError> {
        let invoker = self.store.get_user_by_discord_id(invoker_discord_id).await?;
        let target = self.store.get_user_by_discord_id(target_discord_id).await?;

        let (Some(invoker), Some(target)) = (invoker, target) else {
            return Ok(DiscordCompareOutcome::NotFound);
        };

        if invoker.id == target.id {
            return Ok(DiscordCompareOutcome::IsSelf);
        }

        self.compare_loaded(invoker.id, target.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::is_steam_id64;

    #[test]
    fn steam_id64_must_be_seventeen_digits() {
        assert!(is_steam_id64("76561197960287930"));
        assert!(!is_steam_id64("7656119796028793"));
        assert!(!is_steam_id64("7656119796028793a"));
        assert!(!is_steam_id64(""));
    }
}
