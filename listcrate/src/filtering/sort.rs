use serde_json::Value;
use std::cmp::Ordering;

use crate::models::SortDirection;

/// Natural ordering of two JSON scalars: numbers compare numerically, text
/// compares with embedded digit runs taken as numbers (`item2 < item10`).
/// `null` sorts first.
#[must_use]
pub fn natural_cmp(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => natural_str_cmp(&scalar_text(left), &scalar_text(right)),
    }
}

/// Apply a direction to an ascending comparison.
#[must_use]
pub fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn natural_str_cmp(left: &str, right: &str) -> Ordering {
    let mut a = left.chars().peekable();
    let mut b = right.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left_run = take_digits(&mut a);
                let right_run = take_digits(&mut b);
                let ordering = compare_digit_runs(&left_run, &right_run);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                let ordering = x.cmp(&y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(left: &str, right: &str) -> Ordering {
    let left_trimmed = left.trim_start_matches('0');
    let right_trimmed = right.trim_start_matches('0');
    left_trimmed
        .len()
        .cmp(&right_trimmed.len())
        .then_with(|| left_trimmed.cmp(right_trimmed))
        .then_with(|| left.len().cmp(&right.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_digit_runs_compare_numerically() {
        assert_eq!(natural_cmp(&json!("item2"), &json!("item10")), Ordering::Less);
        assert_eq!(natural_cmp(&json!("item10"), &json!("item9")), Ordering::Greater);
        assert_eq!(natural_cmp(&json!("a"), &json!("b")), Ordering::Less);
        assert_eq!(natural_cmp(&json!("abc"), &json!("abc")), Ordering::Equal);
        assert_eq!(natural_cmp(&json!("ab"), &json!("abc")), Ordering::Less);
    }

    #[test]
    fn test_numbers_and_nulls() {
        assert_eq!(natural_cmp(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(natural_cmp(&json!(1.5), &json!(1.25)), Ordering::Greater);
        assert_eq!(natural_cmp(&Value::Null, &json!(0)), Ordering::Less);
        assert_eq!(natural_cmp(&json!("3"), &json!(20)), Ordering::Less);
    }

    #[test]
    fn test_direction() {
        assert_eq!(directed(Ordering::Less, SortDirection::Desc), Ordering::Greater);
        assert_eq!(directed(Ordering::Less, SortDirection::Asc), Ordering::Less);
    }
}
