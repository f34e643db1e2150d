//! Registry trait for self-registering implementations.
//!
//! This module provides the base trait that pluggable implementations
//! (storage backends, auth verifiers, notification sinks) implement to
//! register themselves with their configuration name and factory function.

/// Base trait for implementation registries.
///
/// Each implementation module must provide a Registry struct that
/// implements this trait, tying the name used in the configuration file to
/// the factory that builds the implementation.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	///
	/// This should match the key used in the TOML configuration, for example:
	/// - "memory" for storage.implementations.memory
	/// - "jwt" for auth.implementations.jwt
	/// - "webhook" for notifier.implementations.webhook
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
