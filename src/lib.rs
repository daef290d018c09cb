//! A passively-secure multi-party computation engine over Shamir secret
//! sharing (SPEC_FULL.md §1 Overview).
//!
//! The crate is organised bottom-up: [`field`] and [`shamir`] are pure math
//! with no notion of a network; [`pc`] and [`frame`] define how players
//! stay in lockstep and what goes on the wire; [`transport`] carries framed
//! bytes between players; [`runtime`] is where it all comes together as the
//! actual protocol suite ([`runtime::passive::PassiveRuntime`]).

pub mod cli;
pub mod config;
pub mod error;
pub mod field;
pub mod frame;
pub mod pc;
pub mod player;
pub mod prss;
pub mod runtime;
pub mod shamir;
pub mod share;
pub mod transport;
