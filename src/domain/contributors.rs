use crate::git::AuthorSummary;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Contributor name → free-text summary of their contribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Contributors(pub BTreeMap<String, String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum ContributorsRepr {
    Map(BTreeMap<String, String>),
    List(Vec<String>),
}

// Older descriptors stored a bare list of names.
impl<'de> Deserialize<'de> for Contributors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match ContributorsRepr::deserialize(deserializer)? {
            ContributorsRepr::Map(map) => Contributors(map),
            ContributorsRepr::List(names) => {
                Contributors(names.into_iter().map(|n| (n, String::new())).collect())
            }
        })
    }
}

impl Contributors {
    /// Add every author other than `owner` that is not listed yet, summarised by
    /// their commit subjects. Existing entries are left untouched.
    pub fn merge_authors(&mut self, authors: &[AuthorSummary], owner: &str) -> usize {
        let mut added = 0;
        for author in authors {
            if author.name == owner || self.0.contains_key(&author.name) {
                continue;
            }
            self.0
                .insert(author.name.clone(), author.subjects.join(", "));
            added += 1;
        }
        added
    }

    /// Contributors with a non-empty summary, in name order.
    pub fn described(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter().filter(|(_, summary)| !summary.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
