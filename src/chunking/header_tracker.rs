//! Contextual-header state machine run alongside the merge step of the
//! splitter (see [`super::splitter`]). Evaluated once per incoming fragment.

use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

/// One header hook: a start/end pattern pair plus the function that turns a
/// matched start into the header text to prepend.
pub struct HeaderHook {
    pub priority: i32,
    pub start_pattern: Regex,
    pub end_pattern: Regex,
    pub extract: fn(&str) -> String,
}

// Mirrors `splitter::MD_TABLE_HEADER` exactly: the protected-region fragment
// the splitter feeds each hook's `start_pattern` ends right after the
// alignment row, with no trailing newline captured, so the pattern can't
// require one either or it would never match the fragment it's checked
// against.
static MD_TABLE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\|.+\|[ \t]*\r?\n[ \t]*\|(?:\s*:?-{3,}:?\s*\|)+[ \t]*").unwrap()
});

static MD_TABLE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*$|^[ \t]*[^|\s].*$").unwrap()
});

fn extract_table_header(matched: &str) -> String {
    matched.trim_end_matches(['\n', '\r']).to_string()
}

/// Default hook set: a single Markdown table header + alignment row detector,
/// priority 15. (The source carries a second, code-block hook only as
/// commented-out dead code — it was never actually enabled, so it is not
/// reproduced here.)
pub fn default_hooks() -> Vec<HeaderHook> {
    vec![HeaderHook {
        priority: 15,
        start_pattern: MD_TABLE_START.clone(),
        end_pattern: MD_TABLE_END.clone(),
        extract: extract_table_header,
    }]
}

/// Tracks which header hooks are currently "open" while the splitter walks
/// fragments in order.
pub struct HeaderTracker {
    hooks: Vec<HeaderHook>,
    active: BTreeMap<i32, String>,
    ended: HashSet<i32>,
}

impl HeaderTracker {
    pub fn new(hooks: Vec<HeaderHook>) -> Self {
        Self {
            hooks,
            active: BTreeMap::new(),
            ended: HashSet::new(),
        }
    }

    /// Feed the tracker the next fragment's text. Returns the set of newly
    /// opened priorities, mirroring the source's "report what just started"
    /// behavior (unused by the splitter today but kept for symmetry/testing).
    pub fn update(&mut self, fragment: &str) -> Vec<i32> {
        let mut opened = Vec::new();

        // Step 1: anything currently active that this fragment closes.
        let active_priorities: Vec<i32> = self.active.keys().copied().collect();
        for priority in active_priorities {
            let ends = self
                .hooks
                .iter()
                .find(|h| h.priority == priority)
                .map(|h| h.end_pattern.is_match(fragment))
                .unwrap_or(false);
            if ends {
                self.active.remove(&priority);
                self.ended.insert(priority);
            }
        }

        // Step 2: anything not active and not already ended that this fragment opens.
        for hook in &self.hooks {
            if self.active.contains_key(&hook.priority) || self.ended.contains(&hook.priority) {
                continue;
            }
            if let Some(m) = hook.start_pattern.find(fragment) {
                let header = (hook.extract)(m.as_str());
                self.active.insert(hook.priority, header);
                opened.push(hook.priority);
            }
        }

        // Step 3: the ended cache only has meaning while something is still open;
        // once everything closes, clear it so hooks can reopen cleanly later.
        if self.active.is_empty() {
            self.ended.clear();
        }

        opened
    }

    /// Current header text: active hooks joined newline-separated, highest
    /// priority first.
    pub fn current_header(&self) -> String {
        self.active
            .iter()
            .rev()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Default for HeaderTracker {
    fn default() -> Self {
        Self::new(default_hooks())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_header_opens_on_header_and_alignment_rows() {
        let mut tracker = HeaderTracker::default();
        let opened = tracker.update("| h1 | h2 |\n| --- | --- |\n");
        assert_eq!(opened, vec![15]);
        assert_eq!(tracker.current_header(), "| h1 | h2 |\n| --- | --- |");
    }

    #[test]
    fn table_header_closes_on_blank_line() {
        let mut tracker = HeaderTracker::default();
        tracker.update("| h1 | h2 |\n| --- | --- |\n");
        tracker.update("| a | b |\n");
        assert!(!tracker.is_empty());
        tracker.update("\n");
        assert!(tracker.is_empty());
    }

    #[test]
    fn ended_cache_prevents_reopening_until_active_is_empty() {
        let mut tracker = HeaderTracker::default();
        tracker.update("| h1 | h2 |\n| --- | --- |\n");
        tracker.update("\n");
        assert!(tracker.ended.contains(&15));
        // Clearing happens only once active becomes empty; since it just did,
        // the hook is immediately eligible to reopen on the following fragment.
        tracker.update("| h1 | h2 |\n| --- | --- |\n");
        assert!(!tracker.is_empty());
    }
}
