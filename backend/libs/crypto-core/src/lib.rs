//! Credential primitives shared by Yuyan services.
//!
//! - [`jwt`]: HS256 credential issuance and verification
//! - [`clock`]: time source injected into verification
//! - [`secret`]: signing-secret strength classification

pub mod clock;
pub mod jwt;
pub mod secret;

pub use clock::{Clock, ManualClock, SystemClock};
pub use jwt::{Claims, IssueError, TokenCodec, TokenError, TokenIssuer};
