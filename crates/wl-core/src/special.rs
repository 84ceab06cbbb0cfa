//! Remapping of special branch names onto dedicated issues.
//!
//! Some branches never correspond to a ticket: the `support` branch and
//! release branches named after a version (`2.21.3`). Time spent on them is
//! booked against configured catch-all issues instead.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::block::WorklogBlock;
use crate::types::IssueKey;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)+$").expect("valid version regex"));

/// Target issues for special branches. Unset targets leave keys untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialKeys {
    /// Issue receiving time logged on `support`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_issue: Option<IssueKey>,

    /// Issue receiving time logged on version branches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_management_issue: Option<IssueKey>,
}

impl SpecialKeys {
    /// The replacement for `key`, if it is special and a target is set.
    pub fn replacement_for(&self, key: &IssueKey) -> Option<&IssueKey> {
        if key.as_str().eq_ignore_ascii_case("support") {
            self.support_issue.as_ref()
        } else if VERSION_RE.is_match(key.as_str()) {
            self.run_management_issue.as_ref()
        } else {
            None
        }
    }
}

/// Returns `blocks` with special keys replaced; start and duration are kept.
pub fn remap_special_keys(blocks: &[WorklogBlock], keys: &SpecialKeys) -> Vec<WorklogBlock> {
    blocks
        .iter()
        .map(|block| match keys.replacement_for(&block.issue_key) {
            Some(target) => WorklogBlock {
                issue_key: target.clone(),
                ..block.clone()
            },
            None => block.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> IssueKey {
        IssueKey::new(s).unwrap()
    }

    fn block(k: &str) -> WorklogBlock {
        WorklogBlock::new(key(k), "2025-05-18T09:00:00Z".parse().unwrap(), 900).unwrap()
    }

    fn configured() -> SpecialKeys {
        SpecialKeys {
            support_issue: Some(key("SUP-1")),
            run_management_issue: Some(key("RUN-1")),
        }
    }

    #[test]
    fn replaces_support_and_versions() {
        let blocks: Vec<_> = ["support", "Support", "2.3", "1.0.0", "3.14.159.265"]
            .into_iter()
            .map(block)
            .collect();

        let result = remap_special_keys(&blocks, &configured());
        let keys: Vec<_> = result.iter().map(|b| b.issue_key.as_str()).collect();
        assert_eq!(keys, vec!["SUP-1", "SUP-1", "RUN-1", "RUN-1", "RUN-1"]);
        assert!(result.iter().zip(&blocks).all(|(after, before)| {
            after.start == before.start && after.duration_seconds == before.duration_seconds
        }));
    }

    #[test]
    fn ignores_regular_and_near_miss_keys() {
        let blocks: Vec<_> = ["PRJ-1", "1", "v1.2", "1.2.", "supporting"]
            .into_iter()
            .map(block)
            .collect();

        assert_eq!(remap_special_keys(&blocks, &configured()), blocks);
    }

    #[test]
    fn unset_targets_leave_keys_alone() {
        let blocks = vec![block("support"), block("2.3")];
        assert_eq!(remap_special_keys(&blocks, &SpecialKeys::default()), blocks);
    }
}
