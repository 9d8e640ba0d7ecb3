//! Configuration table validation for the simulator.
//!
//! Backends and other pluggable components describe the TOML table they
//! accept as a [`Schema`]; the loader checks a table against it before the
//! component is constructed.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field has the wrong type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Type of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
	String,
}

/// Custom check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// Required and optional fields of a configuration table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			check_field(field, value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				check_field(field, value)?;
			}
		}

		Ok(())
	}
}

fn check_field(field: &Field, value: &toml::Value) -> Result<(), ValidationError> {
	validate_field_type(&field.name, value, field.field_type)?;

	if let Some(validator) = &field.validator {
		validator(value).map_err(|message| ValidationError::InvalidValue {
			field: field.name.clone(),
			message,
		})?;
	}

	Ok(())
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String if !value.is_str() => Err(ValidationError::TypeMismatch {
			field: field_name.to_string(),
			expected: "string".to_string(),
			actual: value.type_str().to_string(),
		}),
		FieldType::String => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(document: &str) -> toml::Value {
		toml::Value::Table(toml::from_str(document).unwrap())
	}

	fn storage_schema() -> Schema {
		Schema::new(
			vec![Field::new("backend", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some("memory") | Some("file") => Ok(()),
					other => Err(format!("unknown backend {:?}", other)),
				}
			})],
			vec![Field::new("path", FieldType::String)],
		)
	}

	#[test]
	fn test_valid_table() {
		let config = parse(r#"
backend = "file"
path = "./data"
"#);
		assert!(storage_schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let config = parse(r#"path = "./data""#);
		match storage_schema().validate(&config) {
			Err(ValidationError::MissingField(field)) => assert_eq!(field, "backend"),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn test_custom_validator_rejects_value() {
		let config = parse(r#"backend = "redis""#);
		assert!(matches!(
			storage_schema().validate(&config),
			Err(ValidationError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_type_mismatch() {
		let config = parse(r#"
backend = "memory"
path = 7
"#);
		match storage_schema().validate(&config) {
			Err(ValidationError::TypeMismatch { field, expected, .. }) => {
				assert_eq!(field, "path");
				assert_eq!(expected, "string");
			}
			other => panic!("unexpected result: {:?}", other),
		}
		assert!(storage_schema().validate(&toml::Value::Integer(1)).is_err());
	}
}
