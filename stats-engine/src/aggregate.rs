use stats_core::{AuthorIdentity, Item, Reply};
use std::collections::HashMap;

/// Author → contributions, in order of each author's first appearance.
#[derive(Debug, Clone)]
pub struct AuthorGroups<'a, T> {
    groups: Vec<(AuthorIdentity, Vec<&'a T>)>,
    index: HashMap<AuthorIdentity, usize>,
}

impl<'a, T> AuthorGroups<'a, T> {
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn push(&mut self, author: &AuthorIdentity, entry: &'a T) {
        match self.index.get(author) {
            Some(&slot) => self.groups[slot].1.push(entry),
            None => {
                self.index.insert(author.clone(), self.groups.len());
                self.groups.push((author.clone(), vec![entry]));
            }
        }
    }

    pub fn get(&self, author: &AuthorIdentity) -> Option<&[&'a T]> {
        self.index
            .get(author)
            .map(|&slot| self.groups[slot].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AuthorIdentity, &[&'a T])> {
        self.groups
            .iter()
            .map(|(author, entries)| (author, entries.as_slice()))
    }

    /// Number of distinct authors.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<'a, T> Default for AuthorGroups<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Aggregates<'a> {
    pub submitters: AuthorGroups<'a, Item>,
    pub commenters: AuthorGroups<'a, Reply>,
}

/// Group items and replies by author. No filtering, no scoring.
pub fn aggregate<'a>(items: &'a [Item], replies: &'a [Reply]) -> Aggregates<'a> {
    let mut submitters = AuthorGroups::new();
    for item in items {
        submitters.push(&item.author, item);
    }

    let mut commenters = AuthorGroups::new();
    for reply in replies {
        commenters.push(&reply.author, reply);
    }

    Aggregates {
        submitters,
        commenters,
    }
}
