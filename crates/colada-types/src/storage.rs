//! Storage-related types for the colada system.

use std::str::FromStr;

/// Document collections in the store.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
	/// Customer records, shadow or claimed.
	Clients,
	/// Order records.
	Ventas,
}

impl Collection {
	/// Returns the string representation of the collection.
	pub fn as_str(&self) -> &'static str {
		match self {
			Collection::Clients => "clients",
			Collection::Ventas => "ventas",
		}
	}

	/// Returns an iterator over all collections.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Clients, Self::Ventas].into_iter()
	}
}

impl FromStr for Collection {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"clients" => Ok(Self::Clients),
			"ventas" => Ok(Self::Ventas),
			_ => Err(()),
		}
	}
}

impl From<Collection> for &'static str {
	fn from(collection: Collection) -> Self {
		collection.as_str()
	}
}
