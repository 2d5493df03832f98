use serde_json::Value;

use super::{format_value, result_of};

/// Headline figure of each computation, in priority order.
const PRIORITY_PATHS: [&str; 7] = [
    "monthly_payment",
    "plan.monthly_payment",
    "interest_saved",
    "impact.extra_interest",
    "extra_interest",
    "adjusted_principal",
    "band",
];

/// Print just the key answer value from the output.
///
/// Looks for the headline fields in priority order, then falls back to the
/// first field in the result object.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result_obj = result_of(value);

    for path in PRIORITY_PATHS {
        if let Some(val) = lookup(result_obj, path) {
            if !val.is_null() {
                return format_value(val);
            }
        }
    }

    if let Value::Object(map) = result_obj {
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_value(val));
        }
    }
    format_value(result_obj)
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}
