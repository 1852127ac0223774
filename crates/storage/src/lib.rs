// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! schmux-storage: the canonical state store and its atomic persistence (§4.4).

mod durable;
mod persist;
mod state;

pub use durable::DurableState;
pub use persist::PersistError;
pub use state::{StateError, StateStore};
