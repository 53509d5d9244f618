use crate::error::ApiError;

/// Collects every field problem in a request body so the client sees all of
/// them at once (422 with a `fields` list) instead of one per round-trip.
#[derive(Debug, Default)]
pub struct FieldChecks {
    errors: Vec<String>,
}

impl FieldChecks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        if len < min || len > max {
            self.errors.push(format!(
                "{field} must be between {min} and {max} characters (got {len})"
            ));
        }
        self
    }

    pub fn max_length(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(v) = value {
            let len = v.chars().count();
            if len > max {
                self.errors
                    .push(format!("{field} must be at most {max} characters (got {len})"));
            }
        }
        self
    }

    pub fn not_blank(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if value.is_some_and(|v| v.trim().is_empty()) {
            self.errors.push(format!("{field} must not be empty"));
        }
        self
    }

    pub fn username(&mut self, field: &str, value: &str) -> &mut Self {
        self.length(field, value, 1, 50);
        if !value
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            self.errors.push(format!(
                "{field} must contain only alphanumeric characters, hyphens, underscores, or dots"
            ));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let len = value.chars().count();
        let shape_ok = value.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        });
        if !(3..=255).contains(&len) || !shape_ok || value.chars().any(char::is_whitespace) {
            self.errors.push(format!("{field} is not a valid email address"));
        }
        self
    }

    pub fn range(&mut self, field: &str, value: Option<i32>, min: i32, max: i32) -> &mut Self {
        if let Some(v) = value
            && !(min..=max).contains(&v)
        {
            self.errors
                .push(format!("{field} must be between {min} and {max} (got {v})"));
        }
        self
    }

    pub fn positive(&mut self, field: &str, value: Option<f64>) -> &mut Self {
        if let Some(v) = value
            && !(v > 0.0 && v.is_finite())
        {
            self.errors.push(format!("{field} must be greater than 0"));
        }
        self
    }

    pub fn non_negative(&mut self, field: &str, value: Option<f64>) -> &mut Self {
        if let Some(v) = value
            && !(v >= 0.0 && v.is_finite())
        {
            self.errors.push(format!("{field} must not be negative"));
        }
        self
    }

    pub fn at_least(&mut self, field: &str, value: Option<i32>, min: i32) -> &mut Self {
        if let Some(v) = value
            && v < min
        {
            self.errors.push(format!("{field} must be at least {min} (got {v})"));
        }
        self
    }

    /// Record `message` unless `ok` holds.
    pub fn rule(&mut self, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(message.to_owned());
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}
