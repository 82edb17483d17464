// Copyright (c) 2020 the guildwatch contributors
// See the README.md file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result::Result as StdResult;

/// A convenient alias type for results for `guildwatch`.
pub type Result<T> = StdResult<T, Error>;

/// Represents errors which occur while using guildwatch.
///
/// The first three variants wrap infrastructure failures; a `Serde` error
/// raised while loading the configuration at startup means the config file
/// exists but is unreadable, which is fatal. The remaining variants are
/// command rejections: recoverable, and their `Display` text is the reply
/// shown to the invoking user.
#[derive(Debug)]
pub enum Error {
    /// An IO error was encountered.
    Io(io::Error),
    /// A `serde` crate error.
    Serde(serde_json::Error),
    /// A `serenity` crate error.
    Serenity(serenity::Error),
    /// The invoking user is not on the authorized-user list.
    Unauthorized,
    /// The given guild ID did not resolve to an existing guild.
    GuildNotFound(u64),
    /// The given user ID did not resolve to an existing user.
    UserNotFound(u64),
    /// The given user ID is already on the authorized-user list.
    AlreadyAuthorized(u64),
    /// The given user ID is not on the authorized-user list.
    NotAuthorizedUser(u64),
    /// A user attempted to remove their own authorization.
    CannotSelfDeauthorize,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;

        match *self {
            Io(ref e) => e.fmt(f),
            Serde(ref e) => e.fmt(f),
            Serenity(ref e) => e.fmt(f),
            Unauthorized => {
                write!(f, "You are not authorized to change logger settings.")
            },
            GuildNotFound(id) => write!(f, "No guild found with ID {}.", id),
            UserNotFound(id) => write!(f, "No user found with ID {}.", id),
            AlreadyAuthorized(id) => write!(f, "User {} is already authorized.", id),
            NotAuthorizedUser(id) => write!(f, "User {} is not an authorized user.", id),
            CannotSelfDeauthorize => {
                write!(f, "You cannot remove your own authorization.")
            },
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        use self::Error::*;

        match *self {
            Io(ref e) => Some(e),
            Serde(ref e) => Some(e),
            Serenity(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Serde(error)
    }
}

impl From<serenity::Error> for Error {
    fn from(error: serenity::Error) -> Error {
        Error::Serenity(error)
    }
}
