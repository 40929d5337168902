use std::cmp::Ordering;

use chrono::NaiveDateTime;

/// Battery figures are reported to two decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Coordinate values carry three decimals end to end, the same precision the
/// dockserver reports them with.
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

pub fn epoch_seconds(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

pub fn from_epoch_seconds(secs: i64) -> Option<NaiveDateTime> {
    chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum NaturalPiece {
    Number(u128),
    Text(String),
}

fn natural_key(s: &str) -> Vec<NaturalPiece> {
    let mut pieces = Vec::new();
    let mut buf = String::new();
    let mut in_digits = false;
    for c in s.chars() {
        if c.is_ascii_digit() != in_digits && !buf.is_empty() {
            pieces.push(flush(&mut buf, in_digits));
        }
        in_digits = c.is_ascii_digit();
        buf.push(c);
    }
    if !buf.is_empty() {
        pieces.push(flush(&mut buf, in_digits));
    }
    pieces
}

fn flush(buf: &mut String, in_digits: bool) -> NaturalPiece {
    let piece = if in_digits {
        match buf.parse::<u128>() {
            Ok(n) => NaturalPiece::Number(n),
            Err(_) => NaturalPiece::Text(buf.to_lowercase()),
        }
    } else {
        NaturalPiece::Text(buf.to_lowercase())
    };
    buf.clear();
    piece
}

/// Orders strings so that embedded numbers compare numerically
/// (`file_9.log` before `file_10.log`). Dockserver log names embed
/// sequence numbers and timestamps, plain lexicographic order shuffles them.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

pub fn natural_sort(items: &mut [String]) {
    items.sort_by(|a, b| natural_cmp(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(round3(40.0527), 40.053);
        assert_eq!(round3(-70.64790000000001), -70.648);
        assert_eq!(round3(39.8333333), 39.833);
        assert_eq!(round2(527.8349), 527.83);
        assert_eq!(round2(-3.0051), -3.01);
    }

    #[test]
    fn epoch_round_trip() {
        let dt = NaiveDateTime::parse_from_str("2019-09-13T18:12:31", "%Y-%m-%dT%H:%M:%S").unwrap();
        let secs = epoch_seconds(dt);
        assert_eq!(secs, 1568398351);
        assert_eq!(from_epoch_seconds(secs).unwrap(), dt);
    }

    #[test]
    fn natural_order() {
        let mut names = vec![
            "cp_564_2019_10_sbd.asc".to_string(),
            "cp_564_2019_9_sbd.asc".to_string(),
            "cp_564_2019_100_sbd.asc".to_string(),
        ];
        natural_sort(&mut names);
        assert_eq!(
            names,
            vec![
                "cp_564_2019_9_sbd.asc",
                "cp_564_2019_10_sbd.asc",
                "cp_564_2019_100_sbd.asc"
            ]
        );
    }

    #[test]
    fn natural_order_mixed_case() {
        assert_eq!(natural_cmp("Glider_2", "glider_10"), Ordering::Less);
        assert_eq!(natural_cmp("a2b", "a2b"), Ordering::Equal);
    }
}
