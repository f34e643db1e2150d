//! Client record types.
//!
//! A client is identified either by an authenticated subject (its
//! `firebase_uid`) or, before any authentication has happened, solely by a
//! phone number. The latter form is a "shadow" client: it exists so that
//! orders can be attributed to a person who has never logged in, and it can
//! later be claimed by an authenticated identity during login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer record in the `clients` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
	/// Document identifier. Either the authenticated subject identifier or
	/// a store-generated key (shadow clients always get a generated key).
	pub id: String,
	/// Display name.
	pub nombre: String,
	/// Normalized phone number. Optional in general, but always present on
	/// shadow clients, where it is the natural merge key.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub telefono: Option<String>,
	/// Authenticated subject identifier. `None` marks a shadow client.
	///
	/// Invariant: once set, this field is never overwritten with a
	/// different subject.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub firebase_uid: Option<String>,
	/// Elevated-access flag.
	#[serde(default)]
	pub admin: bool,
	/// Server-assigned creation timestamp.
	pub created_at: DateTime<Utc>,
	/// Server-assigned last-modification timestamp.
	pub updated_at: DateTime<Utc>,
}

impl Client {
	/// Returns true when this record has not been claimed by any
	/// authenticated subject.
	pub fn is_shadow(&self) -> bool {
		self.firebase_uid.is_none()
	}

	/// Returns true when this record is claimed by the given subject.
	pub fn is_claimed_by(&self, subject: &str) -> bool {
		self.firebase_uid.as_deref() == Some(subject)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample(firebase_uid: Option<&str>) -> Client {
		Client {
			id: "c1".to_string(),
			nombre: "Ana López".to_string(),
			telefono: Some("600111222".to_string()),
			firebase_uid: firebase_uid.map(str::to_string),
			admin: false,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[test]
	fn shadow_detection() {
		assert!(sample(None).is_shadow());
		assert!(!sample(Some("uid-a")).is_shadow());
	}

	#[test]
	fn claim_check_matches_exact_subject() {
		let client = sample(Some("uid-a"));
		assert!(client.is_claimed_by("uid-a"));
		assert!(!client.is_claimed_by("uid-b"));
		assert!(!sample(None).is_claimed_by("uid-a"));
	}

	#[test]
	fn shadow_serializes_without_uid_field() {
		let json = serde_json::to_value(sample(None)).unwrap();
		assert!(json.get("firebase_uid").is_none());
		assert_eq!(json["telefono"], "600111222");
	}
}
