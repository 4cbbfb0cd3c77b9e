//! Route guards for Hearth.
//!
//! A guard sits in front of a page and decides, from the current
//! [`AuthState`](hearth_session::AuthState), whether to show a waiting
//! indicator, redirect, or render the page.
//!
//! # Key types
//!
//! - [`GuardInput`]: the four flags a guard looks at
//! - [`RouteGuard`]: signed-in pages, optionally admin-only
//! - [`AdminGuard`]: the back office, signs the user out on denial
//! - [`GuardView`]: what the page should show
//! - [`GuardConfig`]: where the redirects go
//!
//! Both guards are plain state machines: feed them an input, get a view
//! back. Running the side effect the admin guard asks for is left to the
//! caller (see `hearth::guard_driver`).

mod admin;
mod config;
mod input;
mod route;

pub use admin::{AdminDecision, AdminGuard, AdminGuardState, GuardEffect, MountToken};
pub use config::{GuardConfig, GuardView, Redirect};
pub use input::GuardInput;
pub use route::{RouteDecision, RouteGuard, RouteGuardState};
