//! Pure text transforms applied to fetched source content
//!
//! Each transform is a string-to-string function identified by a stable
//! name in the source configuration. The set is closed: unknown names are
//! skipped by the fetcher with a warning rather than failing the source.

/// A named, pure text transform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transform {
    /// Drop lines that are blank after trimming or whose trimmed form
    /// starts with `#`
    RemoveCommentsAndEmpty,
    /// Wrap each line as `  - '+.<line>'` (pihole-style domain lists into
    /// yaml domain rules)
    FormatPihole,
    /// Wrap each line as `  - '<line>'`
    FormatYamlList,
}

/// Name of the transform applied when a source declares no chain
pub const DEFAULT_CHAIN: &[&str] = &["remove_comments_and_empty"];

impl Transform {
    /// Look up a transform by its configuration name
    pub fn from_name(name: &str) -> Option<Transform> {
        match name {
            "remove_comments_and_empty" => Some(Transform::RemoveCommentsAndEmpty),
            "format_pihole" => Some(Transform::FormatPihole),
            "format_yaml_list" => Some(Transform::FormatYamlList),
            _ => None,
        }
    }

    /// Configuration name of this transform
    pub fn name(&self) -> &'static str {
        match self {
            Transform::RemoveCommentsAndEmpty => "remove_comments_and_empty",
            Transform::FormatPihole => "format_pihole",
            Transform::FormatYamlList => "format_yaml_list",
        }
    }

    /// Apply this transform to `text`, returning the new content
    pub fn apply(&self, text: &str) -> String {
        match self {
            Transform::RemoveCommentsAndEmpty => remove_comments_and_empty(text),
            Transform::FormatPihole => add_prefix_suffix(text, "  - '+.", "'"),
            Transform::FormatYamlList => add_prefix_suffix(text, "  - '", "'"),
        }
    }
}

fn remove_comments_and_empty(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn add_prefix_suffix(text: &str, prefix: &str, suffix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}{suffix}"))
        .collect::<Vec<_>>()
        .join("\n")
}
