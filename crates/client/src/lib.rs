//! Client side of Lumen galleries: the optimistic upload flow.
//!
//! Selecting files shows them in the gallery immediately, as pending
//! entries built from local previews. Each file then runs its own chain:
//!
//! 1. [`negotiate`] -- ask the backend for a signed write target.
//! 2. [`transfer`] -- stream the bytes straight to object storage.
//! 3. [`reconcile`] -- re-read the gallery so the durable record replaces
//!    the pending one.
//!
//! [`collection::OptimisticImageCollection`] holds what the user sees;
//! [`session::Session`] owns everything for one signed-in user.

pub mod api;
pub mod collection;
pub mod config;
pub mod error;
pub mod negotiate;
pub mod notify;
pub mod optimistic;
pub mod preview;
pub mod realtime;
pub mod reconcile;
pub mod session;
pub mod transfer;
pub mod uploader;
