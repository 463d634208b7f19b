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

//! Shared helpers for the tests and benches of the workspace.

#![forbid(unsafe_code)]
#![deny(clippy::pedantic, noop_method_call, rust_2018_idioms, unused_qualifications)]
#![allow(clippy::must_use_candidate, clippy::missing_panics_doc)]

mod approx_eq;
pub mod error;
pub mod synthetic;

#[doc(hidden)]
pub use float_cmp::approx_eq;

pub use crate::approx_eq::ApproxEqIter;
