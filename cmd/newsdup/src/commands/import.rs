//! Import command: load articles and their embeddings from JSONL.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::Args;
use newsdup_engine::{Article, Put, RunContext};
use serde::{Deserialize, Serialize};

use super::{open_context, output_result, print_success, print_verbose};
use crate::Cli;

/// Import articles from a JSONL file.
///
/// Each line is an object with `id`, `title`, `source`, `extracted_at`
/// (RFC 3339), an optional `category` and the `embedding` array.
#[derive(Args)]
pub struct ImportCommand {
    /// JSONL input file
    file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ImportRecord {
    id: u64,
    title: String,
    #[serde(default)]
    source: String,
    extracted_at: DateTime<Utc>,
    #[serde(default)]
    category: Option<String>,
    embedding: Vec<f32>,
}

impl ImportRecord {
    fn article(&self) -> Article {
        let mut a = Article::new(self.id, self.title.clone(), self.source.clone(), self.extracted_at);
        a.category = self.category.clone();
        a
    }
}

#[derive(Debug, Default, Serialize, PartialEq)]
struct ImportSummary {
    imported: usize,
    unchanged: usize,
}

impl ImportCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = open_context(cli)?;
        let file = std::fs::File::open(&self.file)
            .with_context(|| format!("open {}", self.file.display()))?;
        print_verbose(cli, &format!("Importing: {}", self.file.display()));

        let summary = import(&ctx, BufReader::new(file))?;
        ctx.close();

        print_success(&format!(
            "Imported {} article(s), {} unchanged",
            summary.imported, summary.unchanged
        ));
        output_result(&summary, cli.json)
    }
}

fn import(ctx: &RunContext, reader: impl BufRead) -> anyhow::Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ImportRecord =
            serde_json::from_str(&line).with_context(|| format!("line {}", n + 1))?;

        // Embedding first: an article is never stored without one.
        let put = ctx
            .put_embedding(record.id, &record.embedding)
            .with_context(|| format!("line {}: article {}", n + 1, record.id))?;
        ctx.put_article(&record.article())?;
        match put {
            Put::Created => summary.imported += 1,
            Put::Unchanged => summary.unchanged += 1,
        }
    }
    Ok(summary)
}
