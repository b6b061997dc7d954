//! The certificate issuance core.

pub mod dates;
pub mod document;
pub mod ledger;
pub mod numbering;
pub mod pipeline;
pub mod renderer;
pub mod template;
