// Copyright (c) 2020 the guildwatch contributors
// See the README.md file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![deny(missing_docs)]
#![deny(non_camel_case_types)]

//! Guildwatch is a single-guild logging configuration bot for
//! [Discord](https://discordapp.com/), written in
//! [Rust](https://www.rust-lang.org/). It keeps its settings in a versioned
//! JSON file next to the executable and exposes a handful of guarded chat
//! commands to designate the logged guild and manage the users allowed to
//! change settings.

#[macro_use]
extern crate log;

mod command;
mod config;
mod directory;
mod error;
mod util;

use crate::command::LOGGER_GROUP;
use crate::config::ConfigStore;

use serenity::async_trait;
use serenity::client::{Client, Context, EventHandler};
use serenity::framework::standard::StandardFramework;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::model::user::User;
use serenity::prelude::GatewayIntents;
use std::env;

// The prefix to search for when looking for commands in messages.
const COMMAND_PREFIX: &str = "!";

struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _: Context, ready: Ready) {
        info!(
            "[Ready] {} is serving {} guilds",
            ready.user.name,
            ready.guilds.len(),
        );
    }

    // Diagnostic traces only; nothing is written into the per-guild
    // storage directory.
    async fn message(&self, ctx: Context, message: Message) {
        let data = ctx.data.read().await;
        let store = data
            .get::<ConfigStore>()
            .expect("ConfigStore missing from client data");

        if !store.logging_enabled() || !store.log_all_messages() {
            return;
        }
        if message.guild_id.map(|id| id.0) != Some(store.guild()) {
            return;
        }

        trace!("{} says: {}", message.author.name, message.content);
    }

    async fn guild_ban_addition(&self, ctx: Context, guild_id: GuildId, banned_user: User) {
        let data = ctx.data.read().await;
        let store = data
            .get::<ConfigStore>()
            .expect("ConfigStore missing from client data");

        if !store.logging_enabled() || !store.log_moderator_actions() {
            return;
        }
        if guild_id.0 != store.guild() {
            return;
        }

        info!("{} was banned from guild {}", banned_user.name, guild_id.0);
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    // Initialize the `env_logger` to provide logging output.
    env_logger::init();

    // A configuration which exists but cannot be read is fatal; the bot
    // must not run with half-loaded settings.
    let store = ConfigStore::load(env::current_dir()?)?;

    let token = env::var("DISCORD_BOT_TOKEN").expect("DISCORD_BOT_TOKEN is not set");

    let framework = StandardFramework::new()
        .configure(|c| c.prefix(COMMAND_PREFIX))
        .group(&LOGGER_GROUP);

    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&token, intents)
        .event_handler(Handler)
        .framework(framework)
        .await?;

    {
        let mut data = client.data.write().await;
        data.insert::<ConfigStore>(store);
    }

    client.start().await?;

    Ok(())
}
