//! Advisory module for optional LLM-written cleaning guidance.
//!
//! # Feature Flag
//!
//! The concrete [`GeminiProvider`] requires the `ai` feature flag. The
//! [`AdvisoryProvider`] trait and [`StaticAdvisor`] are always available.
//!
//! ```toml
//! # Enable AI support (default)
//! insight-processing = { version = "0.1", features = ["ai"] }
//!
//! # Disable AI support for a smaller binary
//! insight-processing = { version = "0.1", default-features = false }
//! ```

// Provider trait is always available (for custom implementations)
mod provider;
pub use provider::{AdvisoryProvider, FALLBACK_GUIDANCE, GuidanceRequest, StaticAdvisor};

// Concrete providers require the "ai" feature
#[cfg(feature = "ai")]
mod gemini;

#[cfg(feature = "ai")]
pub use gemini::GeminiProvider;
