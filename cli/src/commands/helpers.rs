use chrono::{DateTime, Local};
use serde::Serialize;
use std::process;

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a missing row and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

/// Report an empty collection and exit with status 2.
pub(crate) fn exit_empty(message: &str, json: bool) -> ! {
    if json {
        println!("[]");
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Join a quantity and unit label for display, e.g. `200 g` or `a pinch`.
pub(crate) fn quantity_with_unit(quantity: &str, unit: &str) -> String {
    match (quantity.is_empty(), unit.is_empty()) {
        (_, true) => quantity.to_string(),
        (true, false) => unit.to_string(),
        (false, false) => format!("{quantity} {unit}"),
    }
}

/// Local calendar date of an RFC 3339 timestamp. Unparseable input is shown as-is.
pub(crate) fn format_date(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp).map_or_else(
        |_| timestamp.to_string(),
        |dt| dt.with_timezone(&Local).format("%Y-%m-%d").to_string(),
    )
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_escapes() {
        assert_eq!(
            json_error("Recipe \"Soup\" not found"),
            r#"{"error":"Recipe \"Soup\" not found"}"#
        );
    }

    #[test]
    fn test_quantity_with_unit() {
        assert_eq!(quantity_with_unit("200", "g"), "200 g");
        assert_eq!(quantity_with_unit("a pinch", ""), "a pinch");
        assert_eq!(quantity_with_unit("", "cup"), "cup");
        assert_eq!(quantity_with_unit("", ""), "");
    }

    #[test]
    fn test_format_date() {
        let now = Local::now();
        assert_eq!(
            format_date(&now.to_rfc3339()),
            now.format("%Y-%m-%d").to_string()
        );
        assert_eq!(format_date("yesterday-ish"), "yesterday-ish");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Flour", 10), "Flour");
        assert_eq!(truncate("Extra virgin olive oil", 10), "Extra v...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche épaisse", 10), "Crème f...");
        assert_eq!(truncate("Jalapeño", 10), "Jalapeño");
    }
}
