//! Auth-domain primitives: scope normalization, access tokens, and PKCE/state material.

pub mod pkce;
pub mod scope;
pub mod token;

pub use pkce::*;
pub use scope::*;
pub use token::{secret::*, *};
