//! Per-command response contracts.
//!
//! A [`ContractDescriptor`] declares what a command's response must look like using a
//! small JSON-schema subset. Declared fields are checked strictly; fields the descriptor
//! does not mention are left untouched so that additive backend changes never break an
//! older client.
//!
//! # Examples
//!
//! ```
//! use callgate::contract::ContractDescriptor;
//! use serde_json::json;
//!
//! let descriptor = ContractDescriptor::new(
//!     "get_config",
//!     json!({
//!         "type": "object",
//!         "properties": {
//!             "key": {"type": "string"},
//!             "value": {}
//!         },
//!         "required": ["key", "value"]
//!     }),
//! );
//!
//! let value = json!({"key": "x", "value": 1, "added_later": true});
//! let checked = descriptor.validate(value.clone()).unwrap();
//! assert_eq!(checked, value);
//! ```

pub mod descriptor;
pub mod error;
pub mod registry;
pub mod validator;

pub use descriptor::ContractDescriptor;
pub use error::{ContractError, ContractViolation, Issue};
pub use registry::{is_contract_file, ContractLoader, ContractRegistry, ContractRegistryBuilder};
pub use validator::{deserialize_as, ContractValidator, Passthrough, Validator};
