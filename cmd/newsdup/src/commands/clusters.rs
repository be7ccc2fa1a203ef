//! Clusters command.

use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use serde::Serialize;

use super::{open_context, output_result};
use crate::Cli;

/// List the clusters open in this run with their similarity statistics.
#[derive(Args)]
pub struct ClustersCommand {}

#[derive(Debug, Serialize)]
struct ClusterRow {
    id: u64,
    run_date: NaiveDate,
    centroid_article_id: u64,
    article_count: u64,
    similarity_mean: f64,
    similarity_variance: f64,
    last_assigned_at: DateTime<Utc>,
}

impl ClustersCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = open_context(cli)?;
        let rows: Vec<ClusterRow> = ctx
            .clusters()
            .into_iter()
            .map(|c| ClusterRow {
                id: c.id,
                run_date: c.run_date,
                centroid_article_id: c.centroid_article_id,
                article_count: c.article_count,
                similarity_mean: c.similarity_mean,
                similarity_variance: c.stats().variance(),
                last_assigned_at: c.last_assigned_at,
            })
            .collect();
        ctx.close();

        output_result(&rows, cli.json)
    }
}
