//! Purpose: Format decoded REST payloads as plain aligned text for operators.
//! Exports: `render_schedules`, `render_schedule`, `render_repairs`, `render_repair_info`, `limit_from`.
//! Role: Pure formatting over any `io::Write`; no network or process access.
//! Invariants: A limit only drops rows; summaries always count every row.
//! Invariants: Epoch-millisecond values <= 0 render as `-`.
use std::io::{self, Write};

use time::OffsetDateTime;
use time::macros::format_description;

use crate::api::{OnDemandRepair, RepairInfo, Schedule, VirtualNodeState};

const SCHEDULE_SUMMARY: [(&str, &str); 5] = [
    ("COMPLETED", "completed"),
    ("ON_TIME", "on time"),
    ("BLOCKED", "blocked"),
    ("LATE", "late"),
    ("OVERDUE", "overdue"),
];

const REPAIR_SUMMARY: [(&str, &str); 5] = [
    ("COMPLETED", "completed"),
    ("IN_QUEUE", "in queue"),
    ("BLOCKED", "blocked"),
    ("WARNING", "warning"),
    ("ERROR", "error"),
];

/// Row limit from the `--limit` flag; any negative value disables limiting.
pub fn limit_from(raw: i64) -> Option<usize> {
    usize::try_from(raw).ok()
}

pub fn render_schedules(
    out: &mut dyn Write,
    schedules: &[Schedule],
    limit: Option<usize>,
) -> io::Result<()> {
    let mut sorted = schedules.iter().collect::<Vec<_>>();
    sorted.sort_by(|a, b| (&a.keyspace, &a.table, &a.id).cmp(&(&b.keyspace, &b.table, &b.id)));
    let rows = apply_limit(sorted, limit)
        .into_iter()
        .map(|schedule| {
            vec![
                schedule.id.clone(),
                schedule.keyspace.clone(),
                schedule.table.clone(),
                schedule.status.clone(),
                format_ratio(schedule.repaired_ratio),
                format_epoch_ms(schedule.last_repaired_at_in_ms),
                format_epoch_ms(schedule.next_repair_in_ms),
                schedule.repair_type.clone(),
            ]
        })
        .collect::<Vec<_>>();

    writeln!(out, "Snapshot as of {}", format_now())?;
    writeln!(
        out,
        "{}",
        render_table(
            &[
                "Id",
                "Keyspace",
                "Table",
                "Status",
                "Repaired(%)",
                "Completed at",
                "Next repair",
                "Repair type",
            ],
            &rows,
        )
    )?;
    writeln!(
        out,
        "{}",
        summary_line(schedules.iter().map(|s| s.status.as_str()), &SCHEDULE_SUMMARY)
    )
}

pub fn render_schedule(
    out: &mut dyn Write,
    schedule: &Schedule,
    limit: Option<usize>,
    full: bool,
) -> io::Result<()> {
    let fields = [
        ("Id", schedule.id.clone()),
        ("Keyspace", schedule.keyspace.clone()),
        ("Table", schedule.table.clone()),
        ("Status", schedule.status.clone()),
        ("Repaired(%)", format_ratio(schedule.repaired_ratio)),
        ("Completed at", format_epoch_ms(schedule.last_repaired_at_in_ms)),
        ("Next repair", format_epoch_ms(schedule.next_repair_in_ms)),
        ("Repair type", schedule.repair_type.clone()),
    ];
    write_fields(out, "", &fields)?;

    let config = &schedule.config;
    writeln!(out, "Config:")?;
    write_fields(
        out,
        "  ",
        &[
            ("Interval", format_duration_ms(config.interval_in_ms)),
            ("Unwind ratio", config.unwind_ratio.to_string()),
            ("Warning time", format_duration_ms(config.warning_time_in_ms)),
            ("Error time", format_duration_ms(config.error_time_in_ms)),
            ("Parallelism", config.parallelism.clone()),
        ],
    )?;

    if !full {
        return Ok(());
    }
    let Some(vnodes) = &schedule.virtual_node_states else {
        return Ok(());
    };
    let mut sorted = vnodes.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|vnode| vnode.last_repaired_at_in_ms);
    let rows = apply_limit(sorted, limit)
        .into_iter()
        .map(vnode_row)
        .collect::<Vec<_>>();
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        render_table(
            &["Start token", "End token", "Replicas", "Repaired at", "Repaired"],
            &rows,
        )
    )
}

pub fn render_repairs(
    out: &mut dyn Write,
    repairs: &[OnDemandRepair],
    limit: Option<usize>,
) -> io::Result<()> {
    let mut sorted = repairs.iter().collect::<Vec<_>>();
    sorted.sort_by(|a, b| (&a.keyspace, &a.table, &a.id).cmp(&(&b.keyspace, &b.table, &b.id)));
    let rows = apply_limit(sorted, limit)
        .into_iter()
        .map(|repair| {
            vec![
                repair.id.clone(),
                repair.host_id.clone(),
                repair.keyspace.clone(),
                repair.table.clone(),
                repair.status.clone(),
                format_ratio(repair.repaired_ratio),
                format_epoch_ms(repair.completed_at),
                repair.repair_type.clone(),
            ]
        })
        .collect::<Vec<_>>();

    writeln!(
        out,
        "{}",
        render_table(
            &[
                "Id",
                "Host Id",
                "Keyspace",
                "Table",
                "Status",
                "Repaired(%)",
                "Completed at",
                "Repair type",
            ],
            &rows,
        )
    )?;
    writeln!(
        out,
        "{}",
        summary_line(repairs.iter().map(|r| r.status.as_str()), &REPAIR_SUMMARY)
    )
}

pub fn render_repair_info(
    out: &mut dyn Write,
    info: &RepairInfo,
    limit: Option<usize>,
) -> io::Result<()> {
    writeln!(
        out,
        "Time window ({} - {})",
        format_epoch_ms(info.since_in_ms),
        format_epoch_ms(info.to_in_ms)
    )?;
    let mut sorted = info.repair_stats.iter().collect::<Vec<_>>();
    sorted.sort_by(|a, b| (&a.keyspace, &a.table).cmp(&(&b.keyspace, &b.table)));
    let rows = apply_limit(sorted, limit)
        .into_iter()
        .map(|stats| {
            vec![
                stats.keyspace.clone(),
                stats.table.clone(),
                format_ratio(stats.repaired_ratio),
                format_duration_ms(stats.repair_time_taken_ms),
            ]
        })
        .collect::<Vec<_>>();
    writeln!(
        out,
        "{}",
        render_table(
            &["Keyspace", "Table", "Repaired (%)", "Repair time taken"],
            &rows,
        )
    )
}

fn vnode_row(vnode: &VirtualNodeState) -> Vec<String> {
    let mut replicas = vnode.replicas.clone();
    replicas.sort();
    vec![
        vnode.start_token.to_string(),
        vnode.end_token.to_string(),
        replicas.join(", "),
        format_epoch_ms(vnode.last_repaired_at_in_ms),
        vnode.repaired.to_string(),
    ]
}

fn apply_limit<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

fn write_fields(out: &mut dyn Write, indent: &str, fields: &[(&str, String)]) -> io::Result<()> {
    let width = fields
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    for (label, value) in fields {
        writeln!(
            out,
            "{indent}{label:<width$} : {}",
            escape_cell(value)
        )?;
    }
    Ok(())
}

fn summary_line<'a>(
    statuses: impl Iterator<Item = &'a str>,
    labels: &[(&str, &str)],
) -> String {
    let mut counts = vec![0usize; labels.len()];
    for status in statuses {
        if let Some(idx) = labels.iter().position(|(known, _)| *known == status) {
            counts[idx] += 1;
        }
    }
    let parts = labels
        .iter()
        .zip(counts)
        .map(|((_, label), count)| format!("{count} {label}"))
        .collect::<Vec<_>>();
    format!("Summary: {}", parts.join(", "))
}

/// Header, dashed rule, then rows; columns are padded to their widest cell.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let header_row = headers.iter().map(|header| header.to_string()).collect::<Vec<_>>();
    let body = rows
        .iter()
        .map(|row| {
            (0..headers.len())
                .map(|idx| row.get(idx).map(|cell| escape_cell(cell)).unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let widths = header_row
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            body.iter()
                .map(|row| row[idx].chars().count())
                .fold(header.chars().count(), usize::max)
        })
        .collect::<Vec<_>>();
    let rule = widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>();

    [header_row, rule]
        .iter()
        .chain(body.iter())
        .map(|cells| table_row(cells, &widths))
        .collect::<Vec<_>>()
        .join("\n")
}

fn table_row(cells: &[String], widths: &[usize]) -> String {
    let padded = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>();
    padded.join("  ").trim_end().to_string()
}

/// Keeps multi-line values on one table row.
fn escape_cell(value: &str) -> String {
    value.replace('\n', "\\n").replace('\r', "\\r")
}

fn format_ratio(ratio: f64) -> String {
    if !ratio.is_finite() {
        return "-".to_string();
    }
    format!("{:.0}", (ratio * 100.0).round())
}

fn format_epoch_ms(ms: i64) -> String {
    if ms <= 0 {
        return "-".to_string();
    }
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .ok()
        .and_then(format_utc)
        .unwrap_or_else(|| "-".to_string())
}

fn format_now() -> String {
    format_utc(OffsetDateTime::now_utc()).unwrap_or_else(|| "-".to_string())
}

fn format_utc(ts: OffsetDateTime) -> Option<String> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    ts.format(&format).ok()
}

fn format_duration_ms(ms: i64) -> String {
    if ms <= 0 {
        return "0s".to_string();
    }
    let total_secs = ms / 1000;
    let parts = [
        (total_secs / 86_400, "d"),
        ((total_secs % 86_400) / 3_600, "h"),
        ((total_secs % 3_600) / 60, "m"),
        (total_secs % 60, "s"),
    ];
    let rendered = parts
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect::<Vec<_>>();
    if rendered.is_empty() {
        format!("{ms}ms")
    } else {
        rendered.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::{
        format_duration_ms, format_epoch_ms, limit_from, render_repair_info, render_repairs,
        render_schedule, render_schedules, render_table,
    };
    use crate::api::{OnDemandRepair, RepairInfo, RepairStats, Schedule, VirtualNodeState};

    fn schedule(id: &str, keyspace: &str, table: &str, status: &str) -> Schedule {
        Schedule {
            id: id.to_string(),
            keyspace: keyspace.to_string(),
            table: table.to_string(),
            status: status.to_string(),
            repaired_ratio: 0.5,
            ..Schedule::default()
        }
    }

    fn rendered(f: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).expect("render");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn render_table_pads_columns_and_escapes_newlines() {
        let output = render_table(
            &["NAME", "DETAIL"],
            &[
                vec!["a".to_string(), "line1\nline2".to_string()],
                vec!["long-name".to_string(), "ok".to_string()],
            ],
        );
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[0].contains("  DETAIL"));
        assert!(lines[1].starts_with("---------  "));
        assert!(lines[2].contains("line1\\nline2"));
        assert!(lines[3].contains("long-name"));
        assert!(!lines[3].ends_with(' '));
    }

    #[test]
    fn negative_limit_disables_limiting() {
        assert_eq!(limit_from(-1), None);
        assert_eq!(limit_from(-20), None);
        assert_eq!(limit_from(0), Some(0));
        assert_eq!(limit_from(3), Some(3));
    }

    #[test]
    fn schedules_are_sorted_limited_and_summarized() {
        let schedules = vec![
            schedule("3", "ks2", "a", "LATE"),
            schedule("1", "ks1", "b", "COMPLETED"),
            schedule("2", "ks1", "a", "COMPLETED"),
        ];
        let text = rendered(|out| render_schedules(out, &schedules, Some(2)));
        let lines = text.lines().collect::<Vec<_>>();
        assert!(lines[0].starts_with("Snapshot as of "));
        assert!(lines[1].starts_with("Id"));
        assert!(lines[3].starts_with("2 "));
        assert!(lines[4].starts_with("1 "));
        assert!(!text.contains("ks2"));
        assert_eq!(
            lines.last().copied(),
            Some("Summary: 2 completed, 0 on time, 0 blocked, 1 late, 0 overdue")
        );
    }

    #[test]
    fn schedule_full_lists_virtual_nodes() {
        let mut detailed = schedule("s1", "ks", "tbl", "ON_TIME");
        detailed.virtual_node_states = Some(vec![
            VirtualNodeState {
                start_token: 10,
                end_token: 20,
                replicas: vec!["127.0.0.2".to_string(), "127.0.0.1".to_string()],
                last_repaired_at_in_ms: 1_700_000_000_000,
                repaired: true,
            },
            VirtualNodeState {
                start_token: -5,
                end_token: 10,
                replicas: vec!["127.0.0.1".to_string()],
                last_repaired_at_in_ms: 0,
                repaired: false,
            },
        ]);

        let brief = rendered(|out| render_schedule(out, &detailed, None, false));
        assert!(brief.contains("Keyspace     : ks"));
        assert!(brief.contains("Config:"));
        assert!(!brief.contains("Start token"));

        let full = rendered(|out| render_schedule(out, &detailed, Some(1), true));
        assert!(full.contains("Start token"));
        assert!(full.contains("-5"));
        assert!(!full.contains("127.0.0.2"));
    }

    #[test]
    fn repairs_render_with_summary() {
        let repairs = vec![OnDemandRepair {
            id: "r1".to_string(),
            host_id: "h1".to_string(),
            keyspace: "ks".to_string(),
            table: "tbl".to_string(),
            status: "IN_QUEUE".to_string(),
            repaired_ratio: 0.0,
            completed_at: -1,
            repair_type: "VNODE".to_string(),
        }];
        let text = rendered(|out| render_repairs(out, &repairs, None));
        assert!(text.contains("Host Id"));
        assert!(text.contains("r1  h1"));
        assert!(text.ends_with("Summary: 0 completed, 1 in queue, 0 blocked, 0 warning, 0 error\n"));
    }

    #[test]
    fn repair_info_shows_window_and_stats() {
        let info = RepairInfo {
            since_in_ms: 1_000,
            to_in_ms: 86_401_000,
            repair_stats: vec![
                RepairStats {
                    keyspace: "ks".to_string(),
                    table: "b".to_string(),
                    repaired_ratio: 1.0,
                    repair_time_taken_ms: 90_000,
                },
                RepairStats {
                    keyspace: "ks".to_string(),
                    table: "a".to_string(),
                    repaired_ratio: 0.25,
                    repair_time_taken_ms: 0,
                },
            ],
        };
        let text = rendered(|out| render_repair_info(out, &info, Some(1)));
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Time window (1970-01-01 00:00:01 - 1970-01-02 00:00:01)");
        assert_eq!(lines.len(), 4);
        assert!(lines[3].starts_with("ks        a      25"));
    }

    #[test]
    fn time_and_duration_formatting() {
        assert_eq!(format_epoch_ms(0), "-");
        assert_eq!(format_epoch_ms(1_000), "1970-01-01 00:00:01");
        assert_eq!(format_duration_ms(0), "0s");
        assert_eq!(format_duration_ms(500), "500ms");
        assert_eq!(format_duration_ms(90_000), "1m 30s");
        assert_eq!(format_duration_ms(604_800_000), "7d");
    }
}
