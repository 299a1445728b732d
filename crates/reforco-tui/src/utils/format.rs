use chrono::NaiveDate;

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// `2024-03-05` (or a timestamp starting with it) as `05/03/2024`
pub fn format_date(date: &str) -> String {
    date.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| date.to_string())
}

/// Drop the seconds from `HH:MM:SS`
pub fn format_time(time: Option<&str>) -> String {
    match time {
        Some(t) if t.as_bytes().get(2) == Some(&b':') => t.get(..5).unwrap_or(t).to_string(),
        Some(t) => t.to_string(),
        None => "--:--".to_string(),
    }
}

/// Lesson length in minutes, e.g. `90` -> `1h30`
pub fn format_duration(minutes: Option<&str>) -> String {
    let Some(raw) = minutes else {
        return String::new();
    };
    match raw.trim().parse::<u32>() {
        Ok(m) if m >= 60 && m % 60 == 0 => format!("{}h", m / 60),
        Ok(m) if m >= 60 => format!("{}h{:02}", m / 60, m % 60),
        Ok(m) => format!("{}min", m),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Matemática", 10), "Matemática");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-03-05"), "05/03/2024");
        assert_eq!(format_date("2024-03-05T14:00:00+00:00"), "05/03/2024");
        assert_eq!(format_date("amanhã"), "amanhã");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(Some("14:30:00")), "14:30");
        assert_eq!(format_time(Some("9h")), "9h");
        assert_eq!(format_time(None), "--:--");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some("45")), "45min");
        assert_eq!(format_duration(Some("60")), "1h");
        assert_eq!(format_duration(Some("90")), "1h30");
        assert_eq!(format_duration(Some("uma hora")), "uma hora");
        assert_eq!(format_duration(None), "");
    }
}
