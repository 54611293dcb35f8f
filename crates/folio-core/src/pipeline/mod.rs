//! Command pipeline.
//!
//! Every repository operation is a [`folio_proto::Command`] sent through a
//! [`Pipeline`]: an ordered chain of [`Stage`]s, each of which may act on the
//! command, rewrite it, or pass it on. The stage closest to storage sits at
//! the tail of the chain and produces the [`Reply`].

mod chain;
mod reply;
mod stage;

pub use chain::Pipeline;
pub use reply::{QueryResults, Reply};
pub use stage::{ForwardingStage, Next, Stage};
