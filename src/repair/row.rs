// src/repair/row.rs
use super::ColumnLayout;

/// What happened to a single data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Row already had the expected width.
    Kept(Vec<String>),
    /// Spurious empty field after `address2` removed.
    Repaired(Vec<String>),
    /// Too long for some other reason; cut down to the expected width.
    Truncated(Vec<String>),
    /// Matched the `address2` pattern but was still too wide after the
    /// removal. Counts as repaired and as dropped. Never written.
    RepairedButDropped,
    /// Could not be brought to the expected width. Never written.
    Dropped,
}

/// Normalize one parsed row to exactly `layout.expected_columns` fields.
///
/// A row longer than the header whose `address2` field is populated and
/// immediately followed by an empty field is the known export defect: that
/// one empty field is removed. Any other long row is truncated. Short rows
/// are dropped.
pub fn normalize_row(mut row: Vec<String>, layout: &ColumnLayout) -> RowOutcome {
    let expected = layout.expected_columns;
    let target = layout.target_index;

    if row.len() > expected && !row[target].is_empty() {
        // row.len() > expected > target, so target + 1 is in bounds
        if row[target + 1].is_empty() {
            row.remove(target + 1);
            // one removal only; a row two or more fields too long stays too long
            if row.len() != expected {
                return RowOutcome::RepairedButDropped;
            }
            return RowOutcome::Repaired(row);
        }
    }

    let was_long = row.len() > expected;
    row.truncate(expected);
    if row.len() != expected {
        return RowOutcome::Dropped;
    }
    if was_long {
        RowOutcome::Truncated(row)
    } else {
        RowOutcome::Kept(row)
    }
}
