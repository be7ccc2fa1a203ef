//! Classify command.

use clap::Args;
use newsdup_engine::VoteTally;
use serde::Serialize;

use super::{open_context, output_result, print_verbose};
use crate::Cli;

/// Classify an article by its nearest labeled neighbors.
///
/// The classifier is fitted on every categorized article first.
#[derive(Args)]
pub struct ClassifyCommand {
    /// Article id
    id: u64,
}

#[derive(Debug, Serialize)]
struct ClassifyResult {
    article_id: u64,
    label: String,
    confidence: f32,
    votes: VoteTally,
}

impl ClassifyCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = open_context(cli)?;
        let rows = ctx.fit_classifier()?;
        print_verbose(cli, &format!("Fitted on {} labeled article(s)", rows));

        let p = ctx.classify(self.id)?;
        ctx.close();

        output_result(
            &ClassifyResult {
                article_id: self.id,
                label: p.label,
                confidence: p.confidence,
                votes: p.votes,
            },
            cli.json,
        )
    }
}
