use std::time::SystemTime;

/// Compact display name for a network id: `intersection_3_4` becomes
/// `3,4`, `road_e_1_2` becomes `e 1,2`. Anything else is returned as is.
pub fn short_label(id: &str) -> String {
    if let Some(rest) = id.strip_prefix("intersection_") {
        if let Some((i, j)) = rest.split_once('_') {
            return format!("{i},{j}");
        }
    }
    if let Some(rest) = id.strip_prefix("road_") {
        let mut parts = rest.splitn(3, '_');
        if let (Some(heading), Some(i), Some(j)) = (parts.next(), parts.next(), parts.next()) {
            return format!("{heading} {i},{j}");
        }
    }
    id.to_owned()
}

pub fn format_age(at: SystemTime, now: SystemTime) -> String {
    let Ok(elapsed) = now.duration_since(at) else {
        return "just now".to_owned();
    };

    match elapsed.as_secs() {
        0..=4 => "just now".to_owned(),
        secs @ 5..=59 => format!("{secs}s ago"),
        secs @ 60..=3599 => format!("{}m ago", secs / 60),
        secs => format!("{}h ago", secs / 3600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn short_labels_for_grid_ids() {
        assert_eq!(short_label("intersection_3_4"), "3,4");
        assert_eq!(short_label("road_e_1_2"), "e 1,2");
        assert_eq!(short_label("depot"), "depot");
        assert_eq!(short_label("intersection_7"), "intersection_7");
    }

    #[test]
    fn ages_round_down_to_the_largest_unit() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(10_000);
        let ago = |secs| format_age(now - Duration::from_secs(secs), now);

        assert_eq!(ago(2), "just now");
        assert_eq!(ago(42), "42s ago");
        assert_eq!(ago(125), "2m ago");
        assert_eq!(ago(7300), "2h ago");
        // Clock skew never produces a negative age.
        assert_eq!(format_age(now + Duration::from_secs(5), now), "just now");
    }
}
