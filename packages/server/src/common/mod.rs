// Common types and utilities shared across the verification domains

pub mod cpf;
pub mod entity_ids;
pub mod id;
pub mod phone;

pub use cpf::{validate_cpf, Cpf, CpfError};
pub use entity_ids::*;
pub use phone::{hash_phone_number, is_valid_mobile_phone, is_well_formed_code};
