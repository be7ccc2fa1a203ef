//! Evaluate command.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;

use super::{open_context, output_result, print_success, print_verbose};
use crate::Cli;

/// Evaluate the classifier on held-out articles.
///
/// The ids file lists article ids separated by whitespace; their stored
/// categories are the ground truth. Every other categorized article is used
/// for training.
#[derive(Args)]
pub struct EvaluateCommand {
    /// File of test article ids
    ids_file: PathBuf,
}

fn parse_ids(text: &str) -> anyhow::Result<Vec<u64>> {
    text.split_whitespace()
        .map(|s| s.parse::<u64>().with_context(|| format!("invalid article id {s:?}")))
        .collect()
}

impl EvaluateCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let text = std::fs::read_to_string(&self.ids_file)
            .with_context(|| format!("read {}", self.ids_file.display()))?;
        let test = parse_ids(&text)?;
        anyhow::ensure!(!test.is_empty(), "{} lists no article ids", self.ids_file.display());

        let ctx = open_context(cli)?;
        let held_out: HashSet<u64> = test.iter().copied().collect();
        let train: Vec<u64> = ctx
            .labeled_articles()?
            .into_iter()
            .filter(|id| !held_out.contains(id))
            .collect();
        print_verbose(cli, &format!("Training on {} article(s)", train.len()));

        ctx.fit_classifier_on(&train)?;
        let ev = ctx.evaluate(&test)?;
        ctx.close();

        print_success(&format!(
            "accuracy {:.3}, macro F1 {:.3} over {} article(s)",
            ev.accuracy, ev.f1_macro, ev.support
        ));
        output_result(&ev, cli.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_whitespace_separated() {
        assert_eq!(parse_ids("1\n2 3\n\n 4\n").unwrap(), vec![1, 2, 3, 4]);
        assert!(parse_ids("1\nabc\n").is_err());
    }
}
