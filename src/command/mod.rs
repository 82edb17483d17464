// Copyright (c) 2020 the guildwatch contributors
// See the README.md file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

pub mod authusers;
pub mod setguild;

use self::authusers::AUTHUSERS_COMMAND;
use self::setguild::SETGUILD_COMMAND;

use serenity::framework::standard::macros::group;

/// The logger configuration commands.
#[group]
#[commands(setguild, authusers)]
pub struct Logger;
