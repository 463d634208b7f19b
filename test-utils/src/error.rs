// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Error helpers for tests.

use std::{error::Error, fmt::Write};

/// An error type which can't be constructed, converting into it panics instead.
///
/// Lets tests return `Result<(), Panic>` and use `?` on any error while still failing with the
/// complete chain of causes in the panic message.
#[derive(Debug)]
pub enum Panic {}

impl<E> From<E> for Panic
where
    E: Error,
{
    fn from(error: E) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            write!(&mut message, "\nCaused by: {cause}").ok(/* writing to a string can't fail */);
            source = cause.source();
        }
        panic!("{message}");
    }
}
