// Copyright (c) 2020 the guildwatch contributors
// See the README.md file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Provides functionality for the `authusers` command and its subcommands.

use crate::config::ConfigStore;
use crate::util::check_msg;

use serenity::client::Context;
use serenity::framework::standard::macros::command;
use serenity::framework::standard::{Args, CommandResult};
use serenity::model::channel::Message;

#[command]
#[description = "Displays the users authorized to change logger settings."]
#[sub_commands(add, remove)]
async fn authusers(ctx: &Context, msg: &Message) -> CommandResult {
    let data = ctx.data.read().await;
    let store = data
        .get::<ConfigStore>()
        .expect("ConfigStore missing from client data");

    let users = store
        .authorized_users()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join(", ");
    check_msg(msg.channel_id.say(&ctx.http, format!("Authorized users: {}", users)).await);

    Ok(())
}

#[command]
#[description = "Authorizes a user to change logger settings."]
async fn add(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let target = match args.single::<u64>() {
        Ok(target) => target,
        Err(_) => {
            check_msg(msg.channel_id.say(&ctx.http, "Usage: authusers add <user id>").await);
            return Ok(());
        },
    };

    let mut data = ctx.data.write().await;
    let store = data
        .get_mut::<ConfigStore>()
        .expect("ConfigStore missing from client data");

    let reply = match store.add_authorized_user(&*ctx.http, msg.author.id.0, target).await {
        Ok(()) => format!("User {} is now authorized.", target),
        Err(err) => err.to_string(),
    };
    check_msg(msg.channel_id.say(&ctx.http, reply).await);

    Ok(())
}

#[command]
#[description = "Revokes a user's authorization to change logger settings."]
async fn remove(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let target = match args.single::<u64>() {
        Ok(target) => target,
        Err(_) => {
            check_msg(msg.channel_id.say(&ctx.http, "Usage: authusers remove <user id>").await);
            return Ok(());
        },
    };

    let mut data = ctx.data.write().await;
    let store = data
        .get_mut::<ConfigStore>()
        .expect("ConfigStore missing from client data");

    let reply = match store.remove_authorized_user(&*ctx.http, msg.author.id.0, target).await {
        Ok(()) => format!("User {} is no longer authorized.", target),
        Err(err) => err.to_string(),
    };
    check_msg(msg.channel_id.say(&ctx.http, reply).await);

    Ok(())
}
