pub mod certificate;
pub mod issuance;
pub mod recipient;
