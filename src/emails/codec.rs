//! Grouping key codec for email paths.
//!
//! Email artifacts carry their location in a path attribute shaped like
//! `/<source>/<account>/<folder>/...`. The account and folder segments form
//! the grouping key used by the tree and by cache invalidation.
//!
//! NOTE: the path layout is provisional. Account or folder names containing
//! the delimiter cannot be told apart from deeper segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const PATH_DELIMITER: char = '/';

/// Escape character used in `LIKE ... ESCAPE` clauses.
pub const ESCAPE_CHAR: char = '\\';

/// Display name of an unset or empty account or folder.
pub const DEFAULT_DISPLAY_NAME: &str = "Default";

/// Paths with fewer segments carry no account and folder.
pub const MIN_PATH_SEGMENTS: usize = 4;

/// Account and folder pair. `None` on either side is the "unassigned"
/// sentinel; the two sides are independent. A path with an empty segment
/// decodes to `Some("")`, which is a real group that pages can select.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct GroupKey {
    pub account: Option<String>,
    pub folder: Option<String>,
}

impl GroupKey {
    pub fn new(account: Option<String>, folder: Option<String>) -> Self {
        Self { account, folder }
    }

    /// Lookup key joining both sides with the delimiter.
    pub fn path_key(&self) -> String {
        encode_path(self.account.as_deref(), self.folder.as_deref())
    }
}

/// Extract the account and folder from a path attribute value.
///
/// Returns `None` when the path has fewer than [`MIN_PATH_SEGMENTS`]
/// segments once trailing empty segments are dropped.
pub fn decode_path(path: &str) -> Option<GroupKey> {
    let mut pieces: Vec<&str> = path.split(PATH_DELIMITER).collect();
    while pieces.last().is_some_and(|piece| piece.is_empty()) {
        pieces.pop();
    }

    if pieces.len() < MIN_PATH_SEGMENTS {
        return None;
    }

    Some(GroupKey {
        account: Some(pieces[2].to_string()),
        folder: Some(pieces[3].to_string()),
    })
}

pub fn encode_path(account: Option<&str>, folder: Option<&str>) -> String {
    format!(
        "{}{}{}",
        account.unwrap_or_default(),
        PATH_DELIMITER,
        folder.unwrap_or_default()
    )
}

/// Escape `LIKE` wildcards so the value only matches literally.
pub fn like_escape(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == ESCAPE_CHAR || ch == '%' || ch == '_' {
            escaped.push(ESCAPE_CHAR);
        }
        escaped.push(ch);
    }
    escaped
}

pub fn account_display_name(account: Option<&str>) -> String {
    display_name(account)
}

pub fn folder_display_name(folder: Option<&str>) -> String {
    display_name(folder)
}

fn display_name(segment: Option<&str>) -> String {
    segment
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DISPLAY_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_account_and_folder_segments() {
        assert_eq!(
            decode_path("/x/acct/folder/msg1"),
            Some(GroupKey::new(
                Some("acct".to_string()),
                Some("folder".to_string())
            ))
        );
        assert_eq!(
            decode_path("/img/bob@example.com/Inbox"),
            Some(GroupKey::new(
                Some("bob@example.com".to_string()),
                Some("Inbox".to_string())
            ))
        );
    }

    #[test]
    fn short_paths_do_not_decode() {
        assert_eq!(decode_path("/x/y"), None);
        assert_eq!(decode_path("/x/acct/"), None);
        assert_eq!(decode_path(""), None);
    }

    #[test]
    fn empty_segments_stay_selectable() {
        assert_eq!(
            decode_path("/x//Inbox/1"),
            Some(GroupKey::new(Some(String::new()), Some("Inbox".to_string())))
        );
        assert_eq!(
            decode_path("/x/bob//1"),
            Some(GroupKey::new(Some("bob".to_string()), Some(String::new())))
        );
        assert_eq!(decode_path("/x/bob//"), None);
        assert_eq!(folder_display_name(Some("")), "Default");
    }

    #[test]
    fn encodes_with_empty_sentinels() {
        assert_eq!(encode_path(Some("bob"), Some("Inbox")), "bob/Inbox");
        assert_eq!(encode_path(None, Some("Inbox")), "/Inbox");
        assert_eq!(GroupKey::new(Some("bob".to_string()), None).path_key(), "bob/");
    }

    #[test]
    fn like_escape_handles_wildcards() {
        assert_eq!(like_escape(Some("50%_off")), r"50\%\_off");
        assert_eq!(like_escape(Some(r"a\b")), r"a\\b");
        assert_eq!(like_escape(Some("plain")), "plain");
        assert_eq!(like_escape(None), "");
    }

    #[test]
    fn unset_names_display_as_default() {
        assert_eq!(account_display_name(None), "Default");
        assert_eq!(folder_display_name(Some("Sent")), "Sent");
    }
}
