//! Pure domain types: MIME tree, signing identity, CMS envelope, OIDs.

pub mod cms;
pub mod constants;
pub mod identity;
pub mod mime;
