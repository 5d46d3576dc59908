//! Dynamic tracker field mapping: transformation, validation, and
//! versioned CRUD over mapping templates.

pub mod apply;
pub mod error;
pub mod template;
pub mod transform;
pub mod validate;

pub use apply::apply_field_mappings;
pub use error::{MapperError, Result};
pub use template::{create_mapping, create_template, delete_mapping, update_mapping, FieldMappingUpdate, NewFieldMapping};
pub use transform::transform_field_value;
pub use validate::validate_field_value;
