//! Plain-text rendering for command output.

use chrono::{DateTime, Utc};

use furever_db::{
    ArchiveLogEntry, ArchiveStatistics, ArchiveSummary, ArchivedRecord, EntityKind,
    RetentionReport, RoleTransition, TransitionOutcome,
};

fn date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn actor(value: Option<i32>) -> String {
    value
        .map(|id| format!("user {}", id))
        .unwrap_or_else(|| "system".to_string())
}

pub fn outcome(verb: &str, kind: EntityKind, id: i32, outcome: &TransitionOutcome) -> String {
    match outcome {
        TransitionOutcome::Completed(entry) => format!(
            "{} {} #{}: ok (log entry {})",
            verb,
            kind.as_str(),
            id,
            entry.log_id
        ),
        other => format!("{} {} #{}: {}", verb, kind.as_str(), id, other.describe()),
    }
}

pub fn statistics(stats: &ArchiveStatistics) -> String {
    let mut out = String::new();
    for kind in EntityKind::ALL {
        out.push_str(&format!("{:<28} {:>8}\n", kind.archive_table(), stats.get(kind)));
    }
    out.push_str(&format!("{:<28} {:>8}", "total", stats.total()));
    out
}

pub fn summary(rows: &[ArchiveSummary]) -> String {
    let mut out = format!(
        "{:<18} {:>8}  {:<19}  {:<19}",
        "entity", "count", "oldest", "newest"
    );
    for row in rows {
        out.push_str(&format!(
            "\n{:<18} {:>8}  {:<19}  {:<19}",
            row.kind.as_str(),
            row.count,
            date(row.oldest),
            date(row.newest)
        ));
    }
    out
}

pub fn log_entries(entries: &[ArchiveLogEntry]) -> String {
    if entries.is_empty() {
        return "No archive operations recorded.".to_string();
    }
    entries
        .iter()
        .map(|e| {
            format!(
                "{}  {:<16} {:<22} #{:<8} by {:<10} {}",
                e.operation_date.format("%Y-%m-%d %H:%M:%S"),
                e.operation.as_str(),
                e.table_name,
                e.record_id,
                actor(e.performed_by_user_id),
                e.reason.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn archived_records(kind: EntityKind, records: &[ArchivedRecord]) -> String {
    if records.is_empty() {
        return format!("No archived {} records.", kind.as_str());
    }
    records
        .iter()
        .map(|r| {
            format!(
                "#{:<8} {:<32} archived {} by {:<10} {}",
                r.record_id,
                r.label.as_deref().unwrap_or("-"),
                date(r.archived_date),
                actor(r.archived_by_user_id),
                r.archive_reason.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn integrity(issues: &[String]) -> String {
    if issues.is_empty() {
        return "No archive integrity issues found.".to_string();
    }
    issues
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn retention(report: &RetentionReport) -> String {
    format!(
        "Archived {} completed adoption request(s) and {} adopted pet(s); pruned {} audit entries",
        report.requests_archived, report.pets_archived, report.log_entries_pruned
    )
}

pub fn role_transition(user_id: i32, transition: &RoleTransition) -> String {
    match transition {
        RoleTransition::Unchanged { synced_profile } => match synced_profile {
            Some(kind) => format!("Updated user {}; synced {} profile", user_id, kind.as_str()),
            None => format!("Updated user {}", user_id),
        },
        RoleTransition::Changed {
            from,
            to,
            flagged_old_profile,
            created_profile,
        } => {
            let mut out = format!("Updated user {}; role {} -> {}", user_id, from, to);
            if let Some(kind) = flagged_old_profile {
                out.push_str(&format!("; flagged {} profile archived", kind.as_str()));
            }
            if let Some(kind) = created_profile {
                out.push_str(&format!("; created {} profile", kind.as_str()));
            }
            out
        }
    }
}
