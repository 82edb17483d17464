// Copyright (c) 2020 the guildwatch contributors
// See the README.md file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The versioned, self-healing configuration store.
//!
//! `ConfigStore` is the exclusive owner of both the in-memory configuration
//! record and its on-disk JSON file. All mutation goes through its guarded
//! methods; command handlers never write fields directly. Every successful
//! mutation is followed by a full rewrite of the file.

use crate::directory::Directory;
use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serenity::prelude::TypeMapKey;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// User ID appended to the authorized-user list whenever it would otherwise
/// be empty, so that the module never becomes unadministrable.
pub const MODULE_CREATOR_ID: u64 = 177939404243992578;

/// Version tag written into new configuration files. A loaded file carrying
/// any other tag is migrated forward to this version.
const CURRENT_CONFIG_VERSION: &str = "1.0.1";

/// Name of the configuration file, relative to the install root.
const CONFIG_FILE: &str = "logger_config.json";

/// The persisted configuration document.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Config {
    /// The logging toggles and the authorized-user list.
    pub options: Options,
    /// Schema version tag of this document.
    pub config_version: String,
    /// ID of the guild being logged; `0` means "unset".
    pub guild: u64,
}

/// The `options` block of the configuration document.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Options {
    /// Master switch for the logger.
    pub enable_logger: bool,
    /// Whether moderator actions (bans and the like) are logged.
    pub log_moderator_actions: bool,
    /// Whether every message in the logged guild is logged.
    pub log_all_messages: bool,
    /// IDs of the users permitted to change logger settings.
    pub authorized_users: Vec<u64>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            options: Options {
                enable_logger: true,
                log_moderator_actions: true,
                log_all_messages: true,
                authorized_users: Vec::new(),
            },
            config_version: CURRENT_CONFIG_VERSION.to_owned(),
            guild: 0,
        }
    }
}

/// Owns the configuration record and the file it is mirrored to.
///
/// The store provides no locking of its own: callers must serialize access
/// themselves. In the bot this is provided by serenity's `TypeMap` lock,
/// which hands out at most one mutable reference at a time.
#[derive(Debug)]
pub struct ConfigStore {
    root: PathBuf,
    path: PathBuf,
    storage_path: PathBuf,
    config: Config,
}

impl TypeMapKey for ConfigStore {
    type Value = ConfigStore;
}

impl ConfigStore {
    /// Loads the configuration from `<root>/logger_config.json`, creating
    /// the file with defaults on a fresh install and migrating it forward
    /// if its version tag is stale.
    ///
    /// Fails if the file exists but cannot be parsed; the process must not
    /// continue with a half-loaded configuration.
    pub fn load(root: impl Into<PathBuf>) -> Result<ConfigStore> {
        let root = root.into();
        let path = root.join(CONFIG_FILE);

        if !path.exists() {
            write_config(&path, &Config::default())?;
            info!("No configuration found; created \"{}\" with defaults", path.display());
        }

        let raw = fs::read_to_string(&path)?;
        let document: Value = serde_json::from_str(&raw)?;

        let version = document.get("config_version").and_then(Value::as_str);
        let mut config = if version == Some(CURRENT_CONFIG_VERSION) {
            serde_json::from_value(document)?
        } else {
            info!(
                "Logger config is outdated; replacing with version {}",
                CURRENT_CONFIG_VERSION,
            );
            let migrated = migrate(&document);
            write_config(&path, &migrated)?;
            info!("Finished replacing config. Please verify your settings.");
            migrated
        };

        let mut dirty = false;

        let users = &mut config.options.authorized_users;
        let before = users.len();
        dedup_preserving_order(users);
        if users.len() != before {
            warn!("Removed {} duplicate authorized-user entries", before - users.len());
            dirty = true;
        }
        if users.is_empty() {
            info!("No authorized users set in config. Defaulting to module creator.");
            users.push(MODULE_CREATOR_ID);
            dirty = true;
        }

        if dirty {
            write_config(&path, &config)?;
        }

        let storage_path = ensure_storage_path(&root, config.guild)?;

        let store = ConfigStore {
            root,
            path,
            storage_path,
            config,
        };
        store.log_summary();

        Ok(store)
    }

    /// Points the logger at a new guild and recomputes the per-guild
    /// storage path.
    ///
    /// The invoking actor must be authorized, and `guild` must resolve to
    /// an existing guild; otherwise no state changes and nothing is written.
    pub async fn set_guild<D>(&mut self, directory: &D, actor: u64, guild: u64) -> Result<()>
    where
        D: Directory,
    {
        self.check_authorized(actor)?;
        if !directory.guild_exists(guild).await {
            return Err(Error::GuildNotFound(guild));
        }

        self.config.guild = guild;
        self.storage_path = ensure_storage_path(&self.root, guild)?;
        info!("Now logging guild {}", guild);

        self.save()
    }

    /// Adds `target` to the authorized-user list.
    ///
    /// If the list currently holds only the bootstrap creator entry, that
    /// entry is dropped before the new one is appended, so that the first
    /// real authorization replaces the fallback instead of piling onto it.
    pub async fn add_authorized_user<D>(&mut self, directory: &D, actor: u64, target: u64) -> Result<()>
    where
        D: Directory,
    {
        self.check_authorized(actor)?;

        let bootstrap_only = self.config.options.authorized_users.as_slice() == [MODULE_CREATOR_ID];
        if !bootstrap_only && self.config.options.authorized_users.contains(&target) {
            return Err(Error::AlreadyAuthorized(target));
        }
        if !directory.user_exists(target).await {
            return Err(Error::UserNotFound(target));
        }

        let users = &mut self.config.options.authorized_users;
        if bootstrap_only {
            users.clear();
        }
        users.push(target);
        info!("Authorized user {}", target);

        self.save()
    }

    /// Removes `target` from the authorized-user list.
    ///
    /// An actor cannot remove their own entry, so the list cannot be locked
    /// out from under the last administrator. Should the list nonetheless
    /// end up empty, the module creator is reinserted.
    pub async fn remove_authorized_user<D>(&mut self, directory: &D, actor: u64, target: u64) -> Result<()>
    where
        D: Directory,
    {
        self.check_authorized(actor)?;

        if !self.config.options.authorized_users.contains(&target) {
            return Err(Error::NotAuthorizedUser(target));
        }
        if target == actor {
            return Err(Error::CannotSelfDeauthorize);
        }
        if !directory.user_exists(target).await {
            return Err(Error::UserNotFound(target));
        }

        let users = &mut self.config.options.authorized_users;
        users.retain(|&id| id != target);
        if users.is_empty() {
            warn!("Authorized-user list is empty. Defaulting to module creator.");
            users.push(MODULE_CREATOR_ID);
        }
        info!("Deauthorized user {}", target);

        self.save()
    }

    /// Returns `true` if the logger is enabled at all.
    pub fn logging_enabled(&self) -> bool {
        self.config.options.enable_logger
    }

    /// Returns `true` if moderator actions should be logged.
    pub fn log_moderator_actions(&self) -> bool {
        self.config.options.log_moderator_actions
    }

    /// Returns `true` if all messages in the logged guild should be logged.
    pub fn log_all_messages(&self) -> bool {
        self.config.options.log_all_messages
    }

    /// The ID of the guild being logged; `0` means no guild is set.
    pub fn guild(&self) -> u64 {
        self.config.guild
    }

    /// The users permitted to change logger settings.
    pub fn authorized_users(&self) -> &[u64] {
        &self.config.options.authorized_users
    }

    /// The per-guild storage directory, `<root>/saves/<guild>`.
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    fn check_authorized(&self, actor: u64) -> Result<()> {
        if self.config.options.authorized_users.contains(&actor) {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    fn save(&self) -> Result<()> {
        write_config(&self.path, &self.config)
    }

    fn log_summary(&self) {
        info!("Current logging state is: {}", self.config.options.enable_logger);
        info!(
            "Current moderator action logging state is: {}",
            self.config.options.log_moderator_actions,
        );
        info!(
            "Current log all messages state is: {}",
            self.config.options.log_all_messages,
        );
        if self.config.guild == 0 {
            warn!("No guild is set. Logger will not run until a guild is provided.");
        } else {
            info!("Logged guild ID is: {}", self.config.guild);
        }
        info!("Authorized user IDs are: {:?}", self.config.options.authorized_users);
        info!("Per-guild storage path is: {}", self.storage_path.display());
    }
}

/// Migrates a stale document forward to the current schema.
///
/// Forward-only and single-step: the result is seeded from the current
/// defaults, and only fields the old document still carries are copied
/// over, field by field. Option keys the new schema no longer knows are
/// dropped with a notice; keys the old document lacks keep their defaults.
fn migrate(old: &Value) -> Config {
    let mut config = Config::default();

    match old.get("guild").and_then(Value::as_u64) {
        Some(guild) => config.guild = guild,
        None => {
            warn!(
                "Could not set 'guild'. Defaulting to 0. \
                 Logger will not run until a guild is provided.",
            );
        },
    }

    if let Some(options) = old.get("options").and_then(Value::as_object) {
        for (key, value) in options {
            match key.as_str() {
                "enable_logger" => {
                    if let Some(v) = value.as_bool() {
                        config.options.enable_logger = v;
                    }
                },
                "log_moderator_actions" => {
                    if let Some(v) = value.as_bool() {
                        config.options.log_moderator_actions = v;
                    }
                },
                "log_all_messages" => {
                    if let Some(v) = value.as_bool() {
                        config.options.log_all_messages = v;
                    }
                },
                "authorized_users" => {
                    if let Some(users) = value.as_array() {
                        config.options.authorized_users =
                            users.iter().filter_map(Value::as_u64).collect();
                    }
                },
                key => warn!("Could not set '{}' as it has been deprecated.", key),
            }
        }
    }

    config
}

/// Serializes the configuration with stable indentation and swaps it into
/// place over the old file.
fn write_config(path: &Path, config: &Config) -> Result<()> {
    let temp = path.with_extension("json.tmp");
    let mut file = File::create(&temp)?;
    file.write_all(serde_json::to_string_pretty(config)?.as_bytes())?;
    fs::rename(&temp, path)?;
    trace!("Saved config to: {}", path.display());

    Ok(())
}

/// Creates `<root>/saves/<guild>` as needed and returns it.
fn ensure_storage_path(root: &Path, guild: u64) -> Result<PathBuf> {
    let path = root.join("saves").join(guild.to_string());
    fs::create_dir_all(&path)?;

    Ok(path)
}

/// Drops repeated IDs, keeping the first occurrence of each.
fn dedup_preserving_order(users: &mut Vec<u64>) {
    let mut seen = Vec::with_capacity(users.len());
    users.retain(|&id| {
        if seen.contains(&id) {
            false
        } else {
            seen.push(id);
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigStore, CONFIG_FILE, CURRENT_CONFIG_VERSION, MODULE_CREATOR_ID};
    use crate::directory::Directory;
    use crate::error::Error;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    struct FakeDirectory {
        guilds: Vec<u64>,
        users: Vec<u64>,
    }

    #[async_trait]
    impl Directory for FakeDirectory {
        async fn guild_exists(&self, id: u64) -> bool {
            self.guilds.contains(&id)
        }

        async fn user_exists(&self, id: u64) -> bool {
            self.users.contains(&id)
        }
    }

    fn directory() -> FakeDirectory {
        FakeDirectory {
            guilds: vec![777],
            users: vec![MODULE_CREATOR_ID, 12345, 99999],
        }
    }

    fn read_document(root: &TempDir) -> Value {
        let raw = fs::read_to_string(root.path().join(CONFIG_FILE)).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    fn write_document(root: &TempDir, document: &Value) {
        let raw = serde_json::to_string_pretty(document).unwrap();
        fs::write(root.path().join(CONFIG_FILE), raw).unwrap();
    }

    /// Seeds a current-version config file with the given authorized users
    /// and loads it.
    fn store_with_users(root: &TempDir, users: &[u64]) -> ConfigStore {
        let mut config = Config::default();
        config.options.authorized_users = users.to_vec();
        write_document(root, &serde_json::to_value(&config).unwrap());
        ConfigStore::load(root.path()).unwrap()
    }

    #[test]
    fn fresh_install_creates_defaults() {
        let root = TempDir::new().unwrap();
        let store = ConfigStore::load(root.path()).unwrap();

        assert!(store.logging_enabled());
        assert!(store.log_moderator_actions());
        assert!(store.log_all_messages());
        assert_eq!(store.guild(), 0);
        // The empty default list is replaced by the creator and persisted.
        assert_eq!(store.authorized_users(), [MODULE_CREATOR_ID]);

        let document = read_document(&root);
        assert_eq!(document["config_version"], CURRENT_CONFIG_VERSION);
        assert_eq!(document["options"]["authorized_users"], json!([MODULE_CREATOR_ID]));
        assert!(root.path().join("saves").join("0").is_dir());
    }

    #[test]
    fn reload_is_idempotent() {
        let root = TempDir::new().unwrap();
        let first = ConfigStore::load(root.path()).unwrap();
        let document = read_document(&root);

        let second = ConfigStore::load(root.path()).unwrap();
        assert_eq!(first.config, second.config);
        assert_eq!(document, read_document(&root));
    }

    #[test]
    fn unparseable_config_is_fatal() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(CONFIG_FILE), "{ not json").unwrap();

        match ConfigStore::load(root.path()) {
            Err(Error::Serde(_)) => {},
            other => panic!("expected a serde error, got {:?}", other),
        }
    }

    #[test]
    fn stale_version_migrates_forward() {
        let root = TempDir::new().unwrap();
        write_document(
            &root,
            &json!({
                "options": {
                    "enable_logger": false,
                    "authorized_users": [12345],
                    "watch_channel": 42,
                },
                "config_version": "0.9.0",
                "guild": 777,
            }),
        );

        let store = ConfigStore::load(root.path()).unwrap();

        // Carried forward.
        assert_eq!(store.guild(), 777);
        assert!(!store.logging_enabled());
        assert_eq!(store.authorized_users(), [12345]);
        // Absent from the old document: defaults apply.
        assert!(store.log_moderator_actions());
        assert!(store.log_all_messages());

        // The file is rewritten at the current version with the
        // deprecated key dropped.
        let document = read_document(&root);
        assert_eq!(document["config_version"], CURRENT_CONFIG_VERSION);
        assert!(document["options"].get("watch_channel").is_none());
    }

    #[test]
    fn migration_without_guild_defaults_to_unset() {
        let root = TempDir::new().unwrap();
        write_document(
            &root,
            &json!({
                "options": { "authorized_users": [12345] },
                "config_version": "0.9.0",
            }),
        );

        let store = ConfigStore::load(root.path()).unwrap();
        assert_eq!(store.guild(), 0);
    }

    #[test]
    fn duplicate_users_are_removed_on_load() {
        let root = TempDir::new().unwrap();
        let store = store_with_users(&root, &[5, 5, 7, 5]);

        assert_eq!(store.authorized_users(), [5, 7]);
        let document = read_document(&root);
        assert_eq!(document["options"]["authorized_users"], json!([5, 7]));
    }

    #[tokio::test]
    async fn set_guild_updates_state_and_storage_path() {
        let root = TempDir::new().unwrap();
        let mut store = store_with_users(&root, &[12345]);

        store.set_guild(&directory(), 12345, 777).await.unwrap();

        assert_eq!(store.guild(), 777);
        assert!(store.storage_path().ends_with("saves/777"));
        assert!(store.storage_path().is_dir());
        assert_eq!(read_document(&root)["guild"], 777);
    }

    #[tokio::test]
    async fn set_guild_rejects_unknown_guild() {
        let root = TempDir::new().unwrap();
        let mut store = store_with_users(&root, &[12345]);
        let before = read_document(&root);
        let path = store.storage_path().to_path_buf();

        match store.set_guild(&directory(), 12345, 31337).await {
            Err(Error::GuildNotFound(31337)) => {},
            other => panic!("expected GuildNotFound, got {:?}", other),
        }
        assert_eq!(store.guild(), 0);
        assert_eq!(store.storage_path(), path);
        assert_eq!(read_document(&root), before);
    }

    #[tokio::test]
    async fn unauthorized_actor_cannot_mutate() {
        let root = TempDir::new().unwrap();
        let mut store = store_with_users(&root, &[12345]);
        let before = read_document(&root);

        let dir = directory();
        assert!(matches!(
            store.set_guild(&dir, 31337, 777).await,
            Err(Error::Unauthorized),
        ));
        assert!(matches!(
            store.add_authorized_user(&dir, 31337, 99999).await,
            Err(Error::Unauthorized),
        ));
        assert!(matches!(
            store.remove_authorized_user(&dir, 31337, 12345).await,
            Err(Error::Unauthorized),
        ));

        // No disk write happened.
        assert_eq!(read_document(&root), before);
        assert_eq!(store.authorized_users(), [12345]);
    }

    #[tokio::test]
    async fn add_appends_to_existing_list() {
        let root = TempDir::new().unwrap();
        let mut store = store_with_users(&root, &[12345]);

        store.add_authorized_user(&directory(), 12345, 99999).await.unwrap();

        assert_eq!(store.authorized_users(), [12345, 99999]);
        let document = read_document(&root);
        assert_eq!(document["options"]["authorized_users"], json!([12345, 99999]));
    }

    #[tokio::test]
    async fn add_replaces_bootstrap_creator_entry() {
        let root = TempDir::new().unwrap();
        // A fresh install bootstraps the list with the creator alone.
        let mut store = ConfigStore::load(root.path()).unwrap();
        assert_eq!(store.authorized_users(), [MODULE_CREATOR_ID]);

        store
            .add_authorized_user(&directory(), MODULE_CREATOR_ID, 99999)
            .await
            .unwrap();

        assert_eq!(store.authorized_users(), [99999]);
    }

    #[tokio::test]
    async fn readding_creator_does_not_duplicate() {
        let root = TempDir::new().unwrap();
        let mut store = ConfigStore::load(root.path()).unwrap();

        store
            .add_authorized_user(&directory(), MODULE_CREATOR_ID, MODULE_CREATOR_ID)
            .await
            .unwrap();

        assert_eq!(store.authorized_users(), [MODULE_CREATOR_ID]);
    }

    #[tokio::test]
    async fn add_rejects_duplicate() {
        let root = TempDir::new().unwrap();
        let mut store = store_with_users(&root, &[12345, 99999]);
        let before = read_document(&root);

        match store.add_authorized_user(&directory(), 12345, 99999).await {
            Err(Error::AlreadyAuthorized(99999)) => {},
            other => panic!("expected AlreadyAuthorized, got {:?}", other),
        }
        assert_eq!(store.authorized_users(), [12345, 99999]);
        assert_eq!(read_document(&root), before);
    }

    #[tokio::test]
    async fn add_rejects_unknown_user() {
        let root = TempDir::new().unwrap();
        let mut store = store_with_users(&root, &[12345]);
        let before = read_document(&root);

        match store.add_authorized_user(&directory(), 12345, 31337).await {
            Err(Error::UserNotFound(31337)) => {},
            other => panic!("expected UserNotFound, got {:?}", other),
        }
        assert_eq!(store.authorized_users(), [12345]);
        assert_eq!(read_document(&root), before);
    }

    #[tokio::test]
    async fn remove_drops_target() {
        let root = TempDir::new().unwrap();
        let mut store = store_with_users(&root, &[12345, 99999]);

        store
            .remove_authorized_user(&directory(), 12345, 99999)
            .await
            .unwrap();

        assert_eq!(store.authorized_users(), [12345]);
        let document = read_document(&root);
        assert_eq!(document["options"]["authorized_users"], json!([12345]));
    }

    #[tokio::test]
    async fn remove_rejects_self_deauthorization() {
        let root = TempDir::new().unwrap();
        let mut store = store_with_users(&root, &[99999]);
        let before = read_document(&root);

        match store.remove_authorized_user(&directory(), 99999, 99999).await {
            Err(Error::CannotSelfDeauthorize) => {},
            other => panic!("expected CannotSelfDeauthorize, got {:?}", other),
        }
        assert_eq!(store.authorized_users(), [99999]);
        assert_eq!(read_document(&root), before);
    }

    #[tokio::test]
    async fn remove_rejects_absent_target() {
        let root = TempDir::new().unwrap();
        let mut store = store_with_users(&root, &[12345]);

        match store.remove_authorized_user(&directory(), 12345, 99999).await {
            Err(Error::NotAuthorizedUser(99999)) => {},
            other => panic!("expected NotAuthorizedUser, got {:?}", other),
        }
        assert_eq!(store.authorized_users(), [12345]);
    }

    #[tokio::test]
    async fn list_is_never_empty_after_any_operation() {
        let root = TempDir::new().unwrap();
        let mut store = store_with_users(&root, &[12345]);
        let dir = directory();

        let _ = store.add_authorized_user(&dir, 12345, 99999).await;
        assert!(!store.authorized_users().is_empty());
        let _ = store.remove_authorized_user(&dir, 12345, 99999).await;
        assert!(!store.authorized_users().is_empty());
        let _ = store.remove_authorized_user(&dir, 12345, 12345).await;
        assert!(!store.authorized_users().is_empty());
        let _ = store.remove_authorized_user(&dir, 99999, 12345).await;
        assert!(!store.authorized_users().is_empty());
    }
}
