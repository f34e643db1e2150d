//! Identity resolution: shadow clients and login-time merging.
//!
//! A phone number is the natural key linking orders to people who have
//! never authenticated. This module finds or creates "shadow" client
//! records from phone numbers, and reconciles them with authenticated
//! identities on login, without ever letting one subject take over a
//! record already claimed by another.

use crate::EngineError;
use chrono::Utc;
use colada_storage::StorageService;
use colada_types::{Client, Collection};
use std::sync::Arc;

/// Resolves `(phone, name)` pairs and authenticated subjects to exactly one
/// client record.
pub struct IdentityResolver {
	storage: Arc<StorageService>,
}

impl IdentityResolver {
	/// Creates a new resolver over the given store.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Looks up a client by exact phone match.
	pub async fn find_by_phone(&self, telefono: &str) -> Result<Option<Client>, EngineError> {
		let found = self
			.storage
			.find::<Client, _>(Collection::Clients.as_str(), |c| {
				c.telefono.as_deref() == Some(telefono)
			})
			.await?;
		Ok(found.map(|(_, client)| client))
	}

	/// Looks up the client claimed by an authenticated subject.
	pub async fn find_by_subject(&self, subject: &str) -> Result<Option<Client>, EngineError> {
		let found = self
			.storage
			.find::<Client, _>(Collection::Clients.as_str(), |c| c.is_claimed_by(subject))
			.await?;
		Ok(found.map(|(_, client)| client))
	}

	/// Finds the client owning `telefono`, creating a shadow record on miss.
	///
	/// Idempotent on hit. On miss exactly one new document is written. The
	/// lookup-then-create pair is not atomic: two concurrent first-time
	/// calls for the same phone can both miss and produce duplicate shadow
	/// records. Callers tolerate this; the store offers no conditional
	/// write to close the window.
	pub async fn resolve_or_create_shadow(
		&self,
		telefono: &str,
		nombre: &str,
	) -> Result<String, EngineError> {
		if let Some(client) = self.find_by_phone(telefono).await? {
			tracing::debug!(client_id = %client.id, "Existing client found for phone");
			return Ok(client.id);
		}

		let now = Utc::now();
		let client = Client {
			id: uuid::Uuid::new_v4().to_string(),
			nombre: nombre.to_string(),
			telefono: Some(telefono.to_string()),
			firebase_uid: None,
			admin: false,
			created_at: now,
			updated_at: now,
		};
		self.storage
			.store(Collection::Clients.as_str(), &client.id, &client)
			.await?;

		tracing::info!(client_id = %client.id, "Shadow client created");
		Ok(client.id)
	}

	/// Reconciles an authenticated subject with the client records on file.
	///
	/// Resolution policy, in order:
	/// 1. an unclaimed record holding the supplied phone is claimed;
	/// 2. a record holding the phone and already claimed by this same
	///    subject resolves as-is;
	/// 3. a record holding the phone but claimed by a different subject is
	///    left untouched (a warning is logged) and the subject's own record
	///    is used instead, when present;
	/// 4. with no usable phone record, the subject's own record is used;
	/// 5. with neither, a fresh claimed record is created.
	///
	/// When a claim lands on a record other than the subject's previous
	/// one, that previous record (an empty profile created before the phone
	/// was known) is deleted. The claim write lands before the cleanup
	/// delete; a store failure between the two can leave both records
	/// claimed, never a foreign record overwritten.
	pub async fn merge_on_login(
		&self,
		subject: &str,
		telefono: Option<&str>,
		nombre: Option<&str>,
	) -> Result<Client, EngineError> {
		let existing = self.find_by_subject(subject).await?;

		let candidate = match telefono {
			Some(telefono) => self.find_by_phone(telefono).await?,
			None => None,
		};

		match candidate {
			Some(mut candidate) if candidate.is_shadow() => {
				candidate.firebase_uid = Some(subject.to_string());
				candidate.updated_at = Utc::now();
				self.storage
					.update(Collection::Clients.as_str(), &candidate.id, &candidate)
					.await?;
				tracing::info!(client_id = %candidate.id, "Shadow client claimed on login");

				if let Some(existing) = existing {
					if existing.id != candidate.id {
						self.storage
							.remove(Collection::Clients.as_str(), &existing.id)
							.await?;
						tracing::info!(
							client_id = %existing.id,
							merged_into = %candidate.id,
							"Removed redundant pre-merge profile"
						);
					}
				}

				Ok(candidate)
			},
			Some(candidate) if candidate.is_claimed_by(subject) => Ok(candidate),
			Some(candidate) => {
				// Phone record belongs to someone else. Never reassign.
				tracing::warn!(
					client_id = %candidate.id,
					"Rejected login merge: phone record is claimed by another subject"
				);
				match existing {
					Some(client) => Ok(client),
					None => self.create_claimed(subject, telefono, nombre).await,
				}
			},
			None => match existing {
				Some(client) => Ok(client),
				None => self.create_claimed(subject, telefono, nombre).await,
			},
		}
	}

	/// Creates a fresh record claimed by `subject`, keyed by the subject
	/// identifier itself.
	async fn create_claimed(
		&self,
		subject: &str,
		telefono: Option<&str>,
		nombre: Option<&str>,
	) -> Result<Client, EngineError> {
		let now = Utc::now();
		let client = Client {
			id: subject.to_string(),
			nombre: nombre.unwrap_or_default().to_string(),
			telefono: telefono.map(str::to_string),
			firebase_uid: Some(subject.to_string()),
			admin: false,
			created_at: now,
			updated_at: now,
		};
		self.storage
			.store(Collection::Clients.as_str(), &client.id, &client)
			.await?;

		tracing::info!(client_id = %client.id, "Client created on first login");
		Ok(client)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use colada_storage::implementations::memory::MemoryStore;

	fn resolver() -> IdentityResolver {
		IdentityResolver::new(Arc::new(StorageService::new(Box::new(MemoryStore::new()))))
	}

	async fn count_clients(resolver: &IdentityResolver) -> usize {
		resolver
			.storage
			.list::<Client>(Collection::Clients.as_str())
			.await
			.unwrap()
			.len()
	}

	#[tokio::test]
	async fn shadow_creation_is_idempotent_by_phone() {
		let resolver = resolver();

		let first = resolver
			.resolve_or_create_shadow("600111222", "Ana")
			.await
			.unwrap();
		let second = resolver
			.resolve_or_create_shadow("600111222", "Ana")
			.await
			.unwrap();

		assert_eq!(first, second);
		assert_eq!(count_clients(&resolver).await, 1);

		let client = resolver.find_by_phone("600111222").await.unwrap().unwrap();
		assert!(client.is_shadow());
		assert_eq!(client.nombre, "Ana");
	}

	#[tokio::test]
	async fn login_claims_a_shadow_record() {
		let resolver = resolver();
		let shadow_id = resolver
			.resolve_or_create_shadow("600111222", "Ana")
			.await
			.unwrap();

		let resolved = resolver
			.merge_on_login("uid-ana", Some("600111222"), Some("Ana"))
			.await
			.unwrap();

		assert_eq!(resolved.id, shadow_id);
		assert!(resolved.is_claimed_by("uid-ana"));
		assert_eq!(count_clients(&resolver).await, 1);
	}

	#[tokio::test]
	async fn merge_is_idempotent() {
		let resolver = resolver();
		resolver
			.resolve_or_create_shadow("600111222", "Ana")
			.await
			.unwrap();

		let first = resolver
			.merge_on_login("uid-ana", Some("600111222"), None)
			.await
			.unwrap();
		let second = resolver
			.merge_on_login("uid-ana", Some("600111222"), None)
			.await
			.unwrap();

		assert_eq!(first.id, second.id);
		assert_eq!(count_clients(&resolver).await, 1);
	}

	#[tokio::test]
	async fn merge_never_reassigns_a_foreign_claim() {
		let resolver = resolver();
		resolver
			.resolve_or_create_shadow("600111222", "Ana")
			.await
			.unwrap();
		let owned = resolver
			.merge_on_login("uid-ana", Some("600111222"), None)
			.await
			.unwrap();

		// A different subject logs in with Ana's phone.
		let resolved = resolver
			.merge_on_login("uid-mallory", Some("600111222"), Some("Mallory"))
			.await
			.unwrap();

		assert_ne!(resolved.id, owned.id);
		assert!(resolved.is_claimed_by("uid-mallory"));

		// Ana's record is untouched.
		let ana = resolver.find_by_subject("uid-ana").await.unwrap().unwrap();
		assert_eq!(ana.id, owned.id);
		assert!(ana.is_claimed_by("uid-ana"));
	}

	#[tokio::test]
	async fn claiming_deletes_the_redundant_empty_profile() {
		let resolver = resolver();

		// First login without a phone creates an empty claimed profile.
		let empty = resolver.merge_on_login("uid-ana", None, None).await.unwrap();
		// An order placed by phone creates a shadow record meanwhile.
		let shadow_id = resolver
			.resolve_or_create_shadow("600111222", "Ana")
			.await
			.unwrap();
		assert_eq!(count_clients(&resolver).await, 2);

		// Second login supplies the phone: the shadow is claimed and the
		// empty profile goes away.
		let resolved = resolver
			.merge_on_login("uid-ana", Some("600111222"), None)
			.await
			.unwrap();

		assert_eq!(resolved.id, shadow_id);
		assert_eq!(count_clients(&resolver).await, 1);
		assert!(resolver
			.storage
			.retrieve::<Client>(Collection::Clients.as_str(), &empty.id)
			.await
			.is_err());
	}

	#[tokio::test]
	async fn login_without_phone_or_records_creates_claimed_client() {
		let resolver = resolver();

		let client = resolver
			.merge_on_login("uid-new", None, Some("Eva"))
			.await
			.unwrap();

		assert_eq!(client.id, "uid-new");
		assert!(client.is_claimed_by("uid-new"));
		assert_eq!(client.nombre, "Eva");
		assert!(client.telefono.is_none());
	}
}
