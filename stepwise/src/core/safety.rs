//! Syntactic safety gate for proposed commands.
//!
//! The gate is a literal denylist match and nothing more. It does not parse
//! shell grammar, resolve aliases, or follow indirection: `find . -delete`,
//! `echo x | xargs rm`, `$(which rm) -rf /` or `/bin/rm` all classify as
//! [`SafetyVerdict::Safe`] because no whitespace token equals a denylist entry.
//! Commands using destructive idioms the list does not name pass through.

use serde::Serialize;

use crate::core::types::SafetyVerdict;

/// Tokens blocked when no denylist is configured.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "rm", "rmdir", "dd", "mkfs", "fdisk", "format", "del", "rd", "erase", "chown", "chmod",
    "truncate", "shred", "sudo", "mv", "cp",
];

/// Case-insensitive ordered set of blocked tokens or whole commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denylist {
    entries: Vec<String>,
}

impl Default for Denylist {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST.iter().copied())
    }
}

impl Denylist {
    /// Build a denylist, lowercasing and trimming entries. Blank entries are
    /// dropped and duplicates keep their first position.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.as_ref().trim().to_lowercase();
            if !entry.is_empty() && !normalized.contains(&entry) {
                normalized.push(entry);
            }
        }
        Self {
            entries: normalized,
        }
    }

    /// Return a copy with `extra` appended.
    pub fn extended<I, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra: Vec<String> = extra.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::new(self.entries.iter().map(String::as_str).chain(extra.iter().map(String::as_str)))
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, candidate: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.as_str() == candidate)
            .map(String::as_str)
    }
}

/// Classify `command` as safe or blocked.
///
/// Blocked when any whitespace-separated token equals an entry, or when the
/// whole trimmed command equals an entry (covers multi-word entries such as
/// `git push --force`). Matching is case-insensitive.
pub fn classify(command: &str, denylist: &Denylist) -> SafetyVerdict {
    let lowered = command.trim().to_lowercase();

    if let Some(matched) = denylist.find(&lowered) {
        return SafetyVerdict::Blocked {
            matched: matched.to_string(),
        };
    }

    for token in lowered.split_whitespace() {
        if let Some(matched) = denylist.find(token) {
            return SafetyVerdict::Blocked {
                matched: matched.to_string(),
            };
        }
    }

    SafetyVerdict::Safe
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked(command: &str, denylist: &Denylist) -> bool {
        classify(command, denylist).is_blocked()
    }

    #[test]
    fn blocks_rm_with_minimal_denylist() {
        let denylist = Denylist::new(["rm", "sudo"]);
        assert_eq!(
            classify("rm -rf /tmp/x", &denylist),
            SafetyVerdict::Blocked {
                matched: "rm".to_string()
            }
        );
    }

    #[test]
    fn blocks_token_anywhere_in_command() {
        let denylist = Denylist::default();
        assert!(blocked("ls && sudo reboot", &denylist));
        assert!(blocked("echo hi ; MV a b", &denylist));
    }

    #[test]
    fn allows_commands_without_denylisted_tokens() {
        let denylist = Denylist::default();
        assert!(!blocked("cat codey.py", &denylist));
        assert!(!blocked("echo \"for i in range(1, 11): print(i)\" > codey.py", &denylist));
        assert!(!blocked("ls -la", &denylist));
    }

    #[test]
    fn substrings_are_not_tokens() {
        let denylist = Denylist::default();
        assert!(!blocked("cat format.txt", &denylist));
        assert!(!blocked("mkdir removed", &denylist));
    }

    #[test]
    fn indirection_is_not_detected() {
        let denylist = Denylist::default();
        assert!(!blocked("/bin/rm -rf /tmp/x", &denylist));
        assert!(!blocked("echo /tmp/x | xargs -n1 /usr/bin/rm", &denylist));
        assert!(!blocked("find . -delete", &denylist));
    }

    #[test]
    fn whole_command_entry_matches_verbatim() {
        let denylist = Denylist::new(["git push --force"]);
        assert!(blocked("  GIT PUSH --FORCE ", &denylist));
        assert!(!blocked("git push", &denylist));
    }

    #[test]
    fn empty_denylist_allows_everything() {
        let denylist = Denylist::new(Vec::<String>::new());
        assert!(denylist.is_empty());
        assert!(!blocked("rm -rf /", &denylist));
    }

    #[test]
    fn new_normalizes_and_dedups_in_order() {
        let denylist = Denylist::new([" RM ", "sudo", "rm", ""]);
        assert_eq!(denylist.entries(), ["rm".to_string(), "sudo".to_string()]);
    }

    #[test]
    fn extended_appends_new_entries() {
        let denylist = Denylist::new(["rm"]).extended(["curl", "RM"]);
        assert_eq!(denylist.entries(), ["rm".to_string(), "curl".to_string()]);
        assert!(blocked("curl http://example.com", &denylist));
    }
}
