use anyhow::{Context, Result};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::db::Migration;

const HEADERS: [&str; 6] = [
	"Version",
	"Description",
	"Executed At",
	"Duration",
	"Type",
	"Status",
];

const DESCRIPTION_WIDTH: usize = 40;
const STATUS_OK: &str = "✅";
const STATUS_FAILED: &str = "❌";

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]");

pub fn print_table(migrations: &[Migration]) {
	print!("{}", render(migrations));
}

pub fn print_json(migrations: &[Migration]) -> Result<()> {
	let raw = serde_json::to_string_pretty(migrations).context("serializing migration history")?;
	println!("{raw}");
	Ok(())
}

fn render(migrations: &[Migration]) -> String {
	if migrations.is_empty() {
		return "No migrations found.\n".to_string();
	}

	let rows: Vec<[String; 6]> = migrations.iter().map(table_row).collect();

	let mut out = String::new();
	out.push('\n');
	out.push_str(&format!("Migration History ({} total)\n", migrations.len()));
	out.push_str(&"─".repeat(100));
	out.push('\n');
	out.push_str(&render_table(&rows));
	out
}

fn table_row(m: &Migration) -> [String; 6] {
	let status = if m.error.is_empty() {
		STATUS_OK
	} else {
		STATUS_FAILED
	};

	[
		m.version.clone(),
		truncate_description(&m.description),
		format_timestamp(m.executed_at),
		format_duration(m.execution_time),
		m.kind.clone(),
		status.to_string(),
	]
}

fn render_table(rows: &[[String; 6]]) -> String {
	let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();
	for row in rows {
		for (i, cell) in row.iter().enumerate() {
			widths[i] = widths[i].max(cell.chars().count());
		}
	}

	let mut separator = String::from("+");
	for width in &widths {
		separator.push_str(&"-".repeat(width + 2));
		separator.push('+');
	}
	separator.push('\n');

	let mut out = String::new();
	out.push_str(&separator);
	out.push_str(&render_row(&HEADERS.map(String::from), &widths));
	out.push_str(&separator);
	for row in rows {
		out.push_str(&render_row(row, &widths));
	}
	out.push_str(&separator);
	out
}

fn render_row(cells: &[String; 6], widths: &[usize]) -> String {
	let mut line = String::from("|");
	for (cell, &width) in cells.iter().zip(widths) {
		line.push_str(&format!(" {cell:<width$} |"));
	}
	line.push('\n');
	line
}

fn truncate_description(description: &str) -> String {
	if description.chars().count() <= DESCRIPTION_WIDTH {
		return description.to_string();
	}
	let head: String = description.chars().take(DESCRIPTION_WIDTH - 3).collect();
	format!("{head}...")
}

fn format_timestamp(at: OffsetDateTime) -> String {
	at.format(TIMESTAMP_FORMAT)
		.unwrap_or_else(|_| at.to_string())
}

fn format_duration(ms: i64) -> String {
	if ms < 1000 {
		return format!("{ms}ms");
	}
	format!("{:.2}s", ms as f64 / 1000.0)
}
