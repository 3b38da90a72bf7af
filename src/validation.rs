use std::collections::HashMap;

use axum::extract::{Form, FromRequest, Request};

use crate::error::AppError;

/// The value type a field must decode to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
}

/// Field
///
/// One declared member of a form object, e.g. `campground[price]`.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub min: Option<f64>,
}

impl Field {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            required: true,
            min: None,
        }
    }

    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Number,
            required: true,
            min: None,
        }
    }

    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub const fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }
}

/// Schema
///
/// A static description of a urlencoded form object. HTML forms post nested keys
/// (`campground[title]=...`), so `object` names the outer key and `fields` the inner ones.
#[derive(Debug)]
pub struct Schema {
    pub object: &'static str,
    pub fields: &'static [Field],
}

/// A single failed check, addressed by its dotted path (`campground.title`).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    fn new(path: String, detail: &str) -> Self {
        let message = format!("\"{path}\" {detail}");
        Self { path, message }
    }
}

impl Schema {
    /// The form key for a member: `campground[title]`.
    pub fn key(&self, field: &str) -> String {
        format!("{}[{}]", self.object, field)
    }

    /// The dotted path used in messages: `campground.title`.
    pub fn path(&self, field: &str) -> String {
        format!("{}.{}", self.object, field)
    }

    /// validate
    ///
    /// Checks every field and returns all failures in declaration order, followed by
    /// any undeclared members. An empty vector means the payload is acceptable.
    pub fn validate(&self, body: &HashMap<String, String>) -> Vec<FieldError> {
        let prefix = format!("{}[", self.object);
        let members: Vec<&str> = body
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).and_then(|rest| rest.strip_suffix(']')))
            .collect();

        if members.is_empty() {
            return vec![FieldError::new(self.object.to_string(), "is required")];
        }

        let mut errors = Vec::new();
        for field in self.fields {
            let path = self.path(field.name);
            let Some(raw) = body.get(&self.key(field.name)) else {
                if field.required {
                    errors.push(FieldError::new(path, "is required"));
                }
                continue;
            };

            let value = raw.trim();
            if value.is_empty() {
                if field.required {
                    errors.push(FieldError::new(path, "is not allowed to be empty"));
                }
                continue;
            }

            if field.kind == FieldKind::Number {
                match value.parse::<f64>() {
                    Ok(n) if n.is_finite() => {
                        if let Some(min) = field.min {
                            if n < min {
                                let detail = format!("must be greater than or equal to {min}");
                                errors.push(FieldError::new(path, &detail));
                            }
                        }
                    }
                    _ => errors.push(FieldError::new(path, "must be a number")),
                }
            }
        }

        let mut unknown: Vec<&str> = members
            .into_iter()
            .filter(|m| !self.fields.iter().any(|f| f.name == *m))
            .collect();
        unknown.sort_unstable();
        for member in unknown {
            errors.push(FieldError::new(self.path(member), "is not allowed"));
        }

        errors
    }
}

/// Validate
///
/// Implemented by request payloads that declare a [`Schema`]. `from_fields` is only
/// called once `schema().validate(..)` came back empty.
pub trait Validate: Sized {
    fn schema() -> &'static Schema;
    fn from_fields(fields: &HashMap<String, String>) -> Result<Self, AppError>;
}

/// Valid
///
/// Validation guard. Decodes the urlencoded body, runs the payload's schema and hands the
/// typed value to the handler. Any failure becomes a 400 whose message joins every field
/// message with a comma, and the handler is never invoked.
///
/// Being a body extractor it always runs last, after path, session and auth extraction.
#[derive(Debug, Clone)]
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
            .await
            .map_err(|rejection| {
                let text = rejection.body_text();
                tracing::debug!(rejection = %text, "undecodable form body");
                AppError::bad_request(text)
            })?;

        let errors = T::schema().validate(&fields);
        if !errors.is_empty() {
            tracing::debug!(object = T::schema().object, failures = errors.len(), "payload failed validation");
            return Err(AppError::validation(&errors));
        }

        T::from_fields(&fields).map(Valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SCHEMA: Schema = Schema {
        object: "campground",
        fields: &[
            Field::text("title"),
            Field::number("price").min(0.0),
            Field::text("note").optional(),
        ],
    };

    fn body(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn messages(errors: Vec<FieldError>) -> Vec<String> {
        errors.into_iter().map(|e| e.message).collect()
    }

    #[test]
    fn accepts_complete_payload() {
        let b = body(&[("campground[title]", "Lake"), ("campground[price]", "12.5")]);
        assert!(SCHEMA.validate(&b).is_empty());
    }

    #[test]
    fn missing_object_is_a_single_error() {
        let b = body(&[("title", "Lake")]);
        assert_eq!(messages(SCHEMA.validate(&b)), vec!["\"campground\" is required"]);
    }

    #[test]
    fn reports_every_failure() {
        let b = body(&[("campground[title]", "  "), ("campground[price]", "-3")]);
        assert_eq!(
            messages(SCHEMA.validate(&b)),
            vec![
                "\"campground.title\" is not allowed to be empty",
                "\"campground.price\" must be greater than or equal to 0",
            ]
        );
    }

    #[test]
    fn rejects_non_numeric_and_missing() {
        let b = body(&[("campground[price]", "cheap")]);
        assert_eq!(
            messages(SCHEMA.validate(&b)),
            vec![
                "\"campground.title\" is required",
                "\"campground.price\" must be a number",
            ]
        );
    }

    #[test]
    fn infinite_price_is_not_a_number() {
        let b = body(&[("campground[title]", "Lake"), ("campground[price]", "inf")]);
        assert_eq!(
            messages(SCHEMA.validate(&b)),
            vec!["\"campground.price\" must be a number"]
        );
    }

    #[test]
    fn rejects_undeclared_members() {
        let b = body(&[
            ("campground[title]", "Lake"),
            ("campground[price]", "0"),
            ("campground[owner_id]", "x"),
        ]);
        let errors = SCHEMA.validate(&b);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "campground.owner_id");
        assert_eq!(errors[0].message, "\"campground.owner_id\" is not allowed");
    }
}
