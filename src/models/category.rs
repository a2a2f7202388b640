/// Category applied when the caller does not choose one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Categories offered to users by front ends.
///
/// The store itself accepts any string; this list only drives pickers and
/// completions.
pub const SUGGESTED_CATEGORIES: [&str; 4] = ["General", "Work", "Personal", "Study"];

/// Returns true if `category` is one of the suggested labels (exact match).
pub fn is_suggested_category(category: &str) -> bool {
    SUGGESTED_CATEGORIES.contains(&category)
}
