//! Dry runs: the conversion applied to a copy of the workspace, rendered as
//! per-file unified diffs.

use nova_syntax::{FileId, Workspace};
use serde::Serialize;
use similar::TextDiff;

use crate::config::{DelegationSurface, NamingChoices};
use crate::db::DelegationDatabase;
use crate::execute::{execute, EditFailure, ExecuteReport};
use crate::members::DelegationTarget;
use crate::usage::UsageRecord;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilePreview {
    pub file: FileId,
    pub original: String,
    pub modified: String,
    pub unified_diff: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DelegationPreview {
    pub report: ExecuteReport,
    pub files: Vec<FilePreview>,
}

/// Runs the conversion on a clone of `workspace`; `workspace` itself is never
/// modified. Both sides of each diff come from the printer, so formatting
/// differences in untouched code do not show up.
pub fn preview(
    workspace: &Workspace,
    db: &dyn DelegationDatabase,
    target: &DelegationTarget,
    records: &[UsageRecord],
    surface: &DelegationSurface,
    naming: &NamingChoices,
) -> Result<DelegationPreview, EditFailure> {
    let mut scratch = workspace.clone();
    let report = execute(&mut scratch, db, target, records, surface, naming)?;

    let files = report
        .files
        .iter()
        .map(|file| {
            let original = workspace.print_file(file).unwrap_or_default();
            let modified = scratch.print_file(file).unwrap_or_default();
            let unified_diff = TextDiff::from_lines(&original, &modified)
                .unified_diff()
                .context_radius(3)
                .header(file.as_str(), file.as_str())
                .to_string();
            FilePreview {
                file: file.clone(),
                original,
                modified,
                unified_diff,
            }
        })
        .collect();

    Ok(DelegationPreview { report, files })
}
