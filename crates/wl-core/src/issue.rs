//! Issue key extraction from branch names and meeting descriptions.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::IssueKey;

/// `[PRJ-123]` anywhere in a description.
static BRACKETED_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Z][A-Z0-9]+-\d+)\]").expect("valid issue key regex"));

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid html tag regex"));

/// Reduces a branch name to its issue key: the segment after the last `/`.
///
/// `feature/PRJ-1` becomes `PRJ-1`; `main` stays `main`. Returns `None` for
/// names that end with a slash or are blank.
pub fn issue_key_from_branch(branch: &str) -> Option<IssueKey> {
    let last = branch.trim().rsplit('/').next()?;
    IssueKey::new(last).ok()
}

/// Finds the first `[KEY-123]` marker in a (possibly HTML) description.
pub fn issue_key_from_description(description: &str) -> Option<IssueKey> {
    let text = strip_html(description);
    let caps = BRACKETED_KEY_RE.captures(&text)?;
    IssueKey::new(&caps[1]).ok()
}

/// Removes tags and decodes the handful of entities calendar clients emit.
pub fn strip_html(input: &str) -> String {
    let without_tags = HTML_TAG_RE.replace_all(input, " ");
    without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_prefix_is_dropped() {
        assert_eq!(issue_key_from_branch("feature/PRJ-1").unwrap().as_str(), "PRJ-1");
        assert_eq!(
            issue_key_from_branch("users/sam/fix/ABC-42").unwrap().as_str(),
            "ABC-42"
        );
        assert_eq!(issue_key_from_branch("main").unwrap().as_str(), "main");
    }

    #[test]
    fn degenerate_branches_have_no_key() {
        assert!(issue_key_from_branch("").is_none());
        assert!(issue_key_from_branch("feature/").is_none());
    }

    #[test]
    fn description_key_is_found_in_plain_text() {
        let key = issue_key_from_description("Sprint review [WEB-311] with the team").unwrap();
        assert_eq!(key.as_str(), "WEB-311");
    }

    #[test]
    fn description_key_is_found_in_html() {
        let html = "<p>Agenda</p><p><b>[OPS-9]</b>&nbsp;rollout</p>";
        assert_eq!(issue_key_from_description(html).unwrap().as_str(), "OPS-9");
    }

    #[test]
    fn first_key_wins() {
        let key = issue_key_from_description("[A1-1] then [B-2]").unwrap();
        assert_eq!(key.as_str(), "A1-1");
    }

    #[test]
    fn unbracketed_or_lowercase_keys_are_ignored() {
        assert!(issue_key_from_description("about WEB-311").is_none());
        assert!(issue_key_from_description("[web-311]").is_none());
        assert!(issue_key_from_description("").is_none());
    }

    #[test]
    fn strip_html_decodes_entities() {
        assert_eq!(strip_html("a&amp;b &lt;x&gt;"), "a&b <x>");
        assert_eq!(strip_html("<br/>x").trim(), "x");
    }
}
