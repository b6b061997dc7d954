//! Data model shared by the certificate issuance service.

pub mod model;
pub mod requests;
