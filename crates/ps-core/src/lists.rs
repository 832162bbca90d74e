//! The set of named rule lists shared by every tab.

use std::sync::Arc;

use crate::rules::RuleList;
use crate::types::ListId;

/// One parsed list per [`ListId`]. Lists not loaded are empty.
#[derive(Debug, Clone, Default)]
pub struct Blocklists {
    lists: [Arc<RuleList>; ListId::ALL.len()],
}

impl Blocklists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ListId) -> &RuleList {
        &self.lists[id as usize]
    }

    pub fn set(&mut self, id: ListId, list: RuleList) {
        self.lists[id as usize] = Arc::new(list);
    }

    pub fn with(mut self, id: ListId, list: RuleList) -> Self {
        self.set(id, list);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (ListId, &RuleList)> {
        ListId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }

    pub fn total_rules(&self) -> usize {
        self.lists.iter().map(|l| l.rule_count()).sum()
    }
}
