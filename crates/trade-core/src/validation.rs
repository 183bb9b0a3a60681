//! Shared checks used by every configuration struct's `validate` function.
//! Each helper returns `Some(message)` when the value is out of bounds.

pub fn validate_percentage(value: f64, field: &str) -> Option<String> {
    if !(0.0..=100.0).contains(&value) {
        return Some(format!("{field} must be between 0 and 100, got {value}"));
    }
    None
}

pub fn validate_positive(value: f64, field: &str) -> Option<String> {
    if value <= 0.0 {
        return Some(format!("{field} must be positive, got {value}"));
    }
    None
}

pub fn validate_range(value: f64, min: f64, max: f64, field: &str) -> Option<String> {
    if value < min || value > max {
        return Some(format!("{field} must be between {min} and {max}, got {value}"));
    }
    None
}
