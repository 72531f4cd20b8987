//! HTML to AMP conversion.
//!
//! [`Amped`] is the single entry point: it binds the embed and sanitizer
//! registries and the global stage arguments to a `convert(html)` call,
//! parses the input, runs the sanitizer pipeline and serializes the result.
//!
//! It is the only crate that talks to the outside world: configuration
//! ([`amp_config::Config`]) and an optional post-render [`Optimizer`].
//!
//! # Example
//!
//! ```
//! use amp_config::Config;
//! use amped::Amped;
//!
//! let amped = Amped::from_config(&Config::default()).unwrap();
//! let html = amped
//!     .convert(r#"<div class="fb-like" data-href="https://facebook.com/x"></div>"#)
//!     .unwrap();
//!
//! assert_eq!(
//!     html,
//!     r#"<amp-facebook-like layout="responsive" width="600" height="380" data-href="https://facebook.com/x"></amp-facebook-like>"#
//! );
//! ```

mod error;
mod facade;
mod optimizer;

pub use error::AmpedError;
pub use facade::{Amped, Converted, dimension_resolver};
pub use optimizer::{OptimizeError, Optimizer};
