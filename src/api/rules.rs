use chrono::{Local, NaiveDate};
use validator::Validate;

use crate::error::{AppError, AppResult, FieldErrors};

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Collects date rules that depend on the current day, then merges them
/// with the payload's derived `validator` rules.
#[derive(Default)]
pub struct Rules {
    errors: FieldErrors,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
        self
    }

    pub fn not_in_past(&mut self, field: &str, date: NaiveDate, today: NaiveDate) -> &mut Self {
        if date < today {
            self.fail(
                field,
                format!("The {} must be a date after or equal to today.", field.replace('_', " ")),
            );
        }
        self
    }

    pub fn not_before(
        &mut self,
        field: &str,
        value: NaiveDate,
        other_field: &str,
        other: NaiveDate,
    ) -> &mut Self {
        if value < other {
            self.fail(
                field,
                format!(
                    "The {} must be a date after or equal to {}.",
                    field.replace('_', " "),
                    other_field.replace('_', " ")
                ),
            );
        }
        self
    }

    /// Run `payload`'s derived rules and return every failure at once.
    pub fn check(&mut self, payload: &impl Validate) -> AppResult<()> {
        if let Err(e) = payload.validate() {
            if let AppError::Validation(derived) = AppError::from(e) {
                for (field, messages) in derived {
                    self.errors.entry(field).or_default().extend(messages);
                }
            }
        }
        self.finish()
    }

    /// Return the failures collected so far, if any.
    pub fn finish(&mut self) -> AppResult<()> {
        let errors = std::mem::take(&mut self.errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "The title field is required."))]
        title: String,
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn merges_date_and_field_rules() {
        let today = date(2026, 10, 18);
        let err = Rules::new()
            .not_in_past("start_date", date(2026, 10, 17), today)
            .not_before("end_date", date(2026, 10, 16), "start_date", date(2026, 10, 17))
            .check(&Payload { title: String::new() })
            .unwrap_err();

        let AppError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 3);
        assert_eq!(
            fields["start_date"][0],
            "The start date must be a date after or equal to today."
        );
    }

    #[test]
    fn passes_when_clean() {
        let today = date(2026, 10, 18);
        assert!(
            Rules::new()
                .not_in_past("start_date", today, today)
                .check(&Payload { title: "x".into() })
                .is_ok()
        );
    }
}
