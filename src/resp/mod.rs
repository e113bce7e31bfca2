//! Response and request-guard plumbing shared by all routes.

pub mod jwt;
pub mod problem;
pub mod util;
