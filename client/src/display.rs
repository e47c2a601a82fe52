//! Textual view-model helpers
//!
//! Everything a rendering layer needs to turn feed data into strings. No
//! styling or layout lives here.

use chrono::{DateTime, Datelike, Utc};

use backend_api::Topic;

/// Display name for an optionally resolved username.
///
/// Unresolved and empty usernames both render as "Anonymous".
pub fn display_username(username: Option<&str>) -> &str {
    match username {
        Some(name) if !name.is_empty() => name,
        _ => "Anonymous",
    }
}

/// First two characters of a display name, uppercased, for avatar badges.
pub fn initials(name: &str) -> String {
    name.chars().take(2).flat_map(char::to_uppercase).collect()
}

/// Human label for a topic chip.
pub fn topic_label(topic: Topic) -> &'static str {
    match topic {
        Topic::Tech => "Tech",
        Topic::Random => "Random",
        Topic::Politics => "Politics",
    }
}

/// Relative timestamp for a post, rendered against `now`.
///
/// Post timestamps are nanoseconds since the Unix epoch. Within seven days
/// the output is relative ("Just now", "5m ago", "3h ago", "2d ago");
/// beyond that it is the absolute date, with the year shown only when it
/// differs from the current one.
pub fn relative_timestamp(timestamp_ns: u64, now: DateTime<Utc>) -> String {
    let millis = (timestamp_ns / 1_000_000) as i64;
    // An unrepresentable timestamp renders as freshly posted.
    let posted = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(now);

    let elapsed = now.signed_duration_since(posted);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    let days = elapsed.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }
    if posted.year() == now.year() {
        posted.format("%b %-d").to_string()
    } else {
        posted.format("%b %-d, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        // 2024-07-14T23:33:20Z
        DateTime::from_timestamp(1_721_000_000, 0).expect("valid timestamp")
    }

    fn ns_before_now(seconds: u64) -> u64 {
        (1_721_000_000 - seconds) * 1_000_000_000
    }

    #[test]
    fn unresolved_username_falls_back_to_anonymous() {
        assert_eq!(display_username(None), "Anonymous");
        assert_eq!(display_username(Some("")), "Anonymous");
        assert_eq!(display_username(Some("alice")), "alice");
    }

    #[test]
    fn initials_take_the_first_two_characters() {
        assert_eq!(initials("alice"), "AL");
        assert_eq!(initials("Anonymous"), "AN");
        assert_eq!(initials("x"), "X");
    }

    #[test]
    fn fresh_posts_say_just_now() {
        assert_eq!(relative_timestamp(ns_before_now(30), fixed_now()), "Just now");
        // A slightly future timestamp from clock skew is treated the same.
        let future = (1_721_000_000 + 10) * 1_000_000_000;
        assert_eq!(relative_timestamp(future, fixed_now()), "Just now");
    }

    #[test]
    fn recent_posts_use_relative_units() {
        assert_eq!(relative_timestamp(ns_before_now(300), fixed_now()), "5m ago");
        assert_eq!(relative_timestamp(ns_before_now(7_200), fixed_now()), "2h ago");
        assert_eq!(
            relative_timestamp(ns_before_now(3 * 86_400), fixed_now()),
            "3d ago"
        );
    }

    #[test]
    fn older_posts_show_the_date() {
        assert_eq!(
            relative_timestamp(ns_before_now(30 * 86_400), fixed_now()),
            "Jun 14"
        );
    }

    #[test]
    fn posts_from_another_year_include_it() {
        assert_eq!(
            relative_timestamp(ns_before_now(400 * 86_400), fixed_now()),
            "Jun 10, 2023"
        );
    }

    #[test]
    fn topic_labels_are_capitalized() {
        assert_eq!(topic_label(Topic::Tech), "Tech");
        assert_eq!(topic_label(Topic::Random), "Random");
        assert_eq!(topic_label(Topic::Politics), "Politics");
    }
}
