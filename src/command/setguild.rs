// Copyright (c) 2020 the guildwatch contributors
// See the README.md file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Provides functionality for the `setguild` command.

use crate::config::ConfigStore;
use crate::util::check_msg;

use serenity::client::Context;
use serenity::framework::standard::macros::command;
use serenity::framework::standard::{Args, CommandResult};
use serenity::model::channel::Message;

#[command]
#[description = "Designates the guild this installation logs."]
async fn setguild(ctx: &Context, msg: &Message, mut args: Args) -> CommandResult {
    let guild = match args.single::<u64>() {
        Ok(guild) => guild,
        Err(_) => {
            check_msg(msg.channel_id.say(&ctx.http, "Usage: setguild <guild id>").await);
            return Ok(());
        },
    };

    let mut data = ctx.data.write().await;
    let store = data
        .get_mut::<ConfigStore>()
        .expect("ConfigStore missing from client data");

    let reply = match store.set_guild(&*ctx.http, msg.author.id.0, guild).await {
        Ok(()) => format!("Now logging guild {}.", guild),
        Err(err) => err.to_string(),
    };
    check_msg(msg.channel_id.say(&ctx.http, reply).await);

    Ok(())
}
