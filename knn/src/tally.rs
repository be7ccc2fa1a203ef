use serde::Serialize;

/// Label counts in the order labels were first seen.
///
/// Neighbors are tallied closest first, so on equal counts the label of the
/// nearer neighbor wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VoteTally {
    entries: Vec<(String, usize)>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one vote for `label`.
    pub fn add(&mut self, label: &str) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, n)) => *n += 1,
            None => self.entries.push((label.to_string(), 1)),
        }
    }

    /// The label with the most votes, earliest seen on ties.
    pub fn winner(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (label, n) in &self.entries {
            if best.is_none_or(|(_, b)| *n > b) {
                best = Some((label.as_str(), *n));
            }
        }
        best
    }

    pub fn get(&self, label: &str) -> usize {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map_or(0, |(_, n)| *n)
    }

    /// Total number of votes.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(l, n)| (l.as_str(), *n))
    }
}

impl<'a> FromIterator<&'a str> for VoteTally {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut tally = VoteTally::new();
        for label in iter {
            tally.add(label);
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_wins() {
        let t: VoteTally = ["politica", "economia", "economia"].into_iter().collect();
        assert_eq!(t.winner(), Some(("economia", 2)));
        assert_eq!(t.total(), 3);
    }

    #[test]
    fn tie_goes_to_first_seen() {
        let t: VoteTally = ["esportes", "cultura", "cultura", "esportes"].into_iter().collect();
        assert_eq!(t.winner(), Some(("esportes", 2)));
        let order: Vec<&str> = t.iter().map(|(l, _)| l).collect();
        assert_eq!(order, vec!["esportes", "cultura"]);
    }

    #[test]
    fn empty_has_no_winner() {
        assert_eq!(VoteTally::new().winner(), None);
        assert_eq!(VoteTally::new().get("x"), 0);
    }
}
