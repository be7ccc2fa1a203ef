//! Related command.

use clap::Args;
use serde::Serialize;

use super::{open_context, output_result};
use crate::Cli;

/// List articles in the same cluster extracted close in time.
#[derive(Args)]
pub struct RelatedCommand {
    /// Article id
    id: u64,

    /// Maximum distance in days between extraction times
    #[arg(long, default_value_t = 2)]
    window_days: u32,
}

#[derive(Debug, Serialize)]
struct RelatedResult {
    article_id: u64,
    cluster_id: Option<u64>,
    related: Vec<u64>,
}

impl RelatedCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = open_context(cli)?;
        let related = ctx.get_related(self.id, self.window_days)?;
        let cluster_id = ctx.article(self.id)?.and_then(|a| a.cluster_id);
        ctx.close();

        output_result(
            &RelatedResult {
                article_id: self.id,
                cluster_id,
                related,
            },
            cli.json,
        )
    }
}
