//! Command tracing.

use std::time::Instant;

use folio_proto::Command;
use tracing::{debug, warn};

use crate::context::InvocationContext;
use crate::error::Error;
use crate::pipeline::{Next, Reply, Stage};

/// Logs every command that passes through it, then forwards.
#[derive(Debug, Clone, Default)]
pub struct TracingStage;

impl TracingStage {
    pub const KIND: &'static str = "tracing";

    pub fn new() -> Self {
        Self
    }
}

impl Stage for TracingStage {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn handle(
        &self,
        ctx: &mut InvocationContext,
        command: &Command,
        next: Next<'_>,
    ) -> Result<Reply, Error> {
        let kind = command.kind();
        let session = ctx.session().id.clone();
        let started = Instant::now();

        let result = next.forward(ctx);
        let duration_us = started.elapsed().as_micros() as u64;

        match &result {
            Ok(reply) => debug!(
                command = %kind,
                session = %session,
                reply = reply.name(),
                duration_us,
                "Command handled"
            ),
            Err(e) if e.is_canceled() => debug!(
                command = %kind,
                session = %session,
                duration_us,
                "Command canceled"
            ),
            Err(e) => warn!(
                command = %kind,
                session = %session,
                duration_us,
                error = %e,
                "Command failed"
            ),
        }
        result
    }
}
