//! Commit message and document path helpers.

use chrono::{DateTime, Local, TimeZone};

/// Kind of sync a commit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitAction {
    /// Local documents written to the remote.
    Push,
    /// A write following a pull.
    Pull,
}

/// Timestamp layout used in generated commit messages.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Commit message for a batch of `count` files, stamped with local time.
pub fn commit_message(action: CommitAction, count: usize) -> String {
    commit_message_at(action, count, &Local::now())
}

/// Commit message for a batch of `count` files at a given time.
pub fn commit_message_at<Tz: TimeZone>(
    action: CommitAction,
    count: usize,
    at: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let verb = match action {
        CommitAction::Push => "update",
        CommitAction::Pull => "sync",
    };
    format!("feat: {verb} {count} files - {}", at.format(TIMESTAMP_FORMAT))
}

/// Repository path for a document title.
///
/// Every character other than an ASCII letter, an ASCII digit or a CJK
/// unified ideograph (U+4E00..=U+9FA5) becomes `_`, then `extension` is
/// appended (e.g. `".md"`).
pub fn format_file_path(title: &str, extension: &str) -> String {
    let mut path: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || ('\u{4e00}'..='\u{9fa5}').contains(&c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    path.push_str(extension);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn push_and_pull_messages() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            commit_message_at(CommitAction::Push, 3, &at),
            "feat: update 3 files - 2024/03/09 14:05:07"
        );
        assert_eq!(
            commit_message_at(CommitAction::Pull, 1, &at),
            "feat: sync 1 files - 2024/03/09 14:05:07"
        );
    }

    #[test]
    fn local_message_has_prefix() {
        assert!(commit_message(CommitAction::Push, 2).starts_with("feat: update 2 files - "));
    }

    #[test]
    fn file_path_keeps_ascii_and_cjk() {
        assert_eq!(format_file_path("My Notes!", ".md"), "My_Notes_.md");
        assert_eq!(format_file_path("学习笔记 2024", ".md"), "学习笔记_2024.md");
        assert_eq!(format_file_path("café/../x", ".txt"), "caf_____x.txt");
        assert_eq!(format_file_path("", ".md"), ".md");
    }
}
