//! Assign command.

use chrono::Utc;
use clap::Args;
use newsdup_engine::Assignment;
use serde::Serialize;

use super::{open_context, output_result, print_success};
use crate::Cli;

/// Assign articles to clusters.
///
/// With no ids, every article that has an embedding but no cluster yet is
/// assigned, in the order the embeddings were imported.
#[derive(Args)]
pub struct AssignCommand {
    /// Article ids to assign
    ids: Vec<u64>,
}

#[derive(Debug, Serialize)]
struct AssignRow {
    article_id: u64,
    cluster_id: u64,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    similarity: Option<f32>,
}

impl AssignRow {
    fn new(article_id: u64, a: Assignment) -> Self {
        let (outcome, similarity) = match a {
            Assignment::Joined { similarity, .. } => ("joined", Some(similarity)),
            Assignment::Founded { .. } => ("founded", None),
            Assignment::Unchanged { .. } => ("unchanged", None),
        };
        Self {
            article_id,
            cluster_id: a.cluster_id(),
            outcome,
            similarity,
        }
    }
}

impl AssignCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = open_context(cli)?;
        let now = Utc::now();

        let done = if self.ids.is_empty() {
            ctx.assign_pending(now)?
        } else {
            let mut done = Vec::with_capacity(self.ids.len());
            for &id in &self.ids {
                done.push((id, ctx.assign_cluster_at(id, now)?));
            }
            done
        };
        let clusters = ctx.clusters().len();
        ctx.close();

        let rows: Vec<AssignRow> = done.into_iter().map(|(id, a)| AssignRow::new(id, a)).collect();
        print_success(&format!("Assigned {} article(s), {} open cluster(s)", rows.len(), clusters));
        output_result(&rows, cli.json)
    }
}
