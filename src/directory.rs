// Copyright (c) 2020 the guildwatch contributors
// See the README.md file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The chat-platform lookup boundary used by the configuration store.

use async_trait::async_trait;
use serenity::http::Http;

/// Resolves guild and user IDs against the chat platform.
///
/// The configuration store runs its existence checks through this trait so
/// that the guarded operations can be exercised without a live Discord
/// connection. Lookups are single-attempt; a failed lookup aborts the
/// mutation, there is no retry policy.
#[async_trait]
pub trait Directory {
    /// Returns `true` if a guild with the given ID exists.
    async fn guild_exists(&self, id: u64) -> bool;

    /// Returns `true` if a user with the given ID exists.
    async fn user_exists(&self, id: u64) -> bool;
}

#[async_trait]
impl Directory for Http {
    async fn guild_exists(&self, id: u64) -> bool {
        self.get_guild(id).await.is_ok()
    }

    async fn user_exists(&self, id: u64) -> bool {
        self.get_user(id).await.is_ok()
    }
}
