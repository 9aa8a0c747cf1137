//! Deterministic external session id derivation
//!
//! The agent CLI identifies resumable sessions by UUID. Conversations are
//! identified by arbitrary keys (database ids, channel names), so the
//! engine derives a stable UUID from the key: the same key always maps to
//! the same external session, across process restarts, with no lookup
//! table.

use uuid::Uuid;

/// Namespace for session id derivation
///
/// Fixed so derived ids are reproducible, and private to this purpose so
/// other UUID-v5 users of the same keys cannot collide with session ids.
const SESSION_NAMESPACE: Uuid = Uuid::from_u128(0x8f0c_0e5d_5b7a_4c89_9d4e_2f61_73a0_41c7);

/// Derive the external session UUID for an arbitrary session key
///
/// Pure and deterministic: UUID v5 (SHA-1) of the key under a fixed
/// namespace. Distinct keys yield distinct ids with overwhelming
/// probability, and the output is shaped like any random UUID
/// (`xxxxxxxx-xxxx-5xxx-[89ab]xxx-xxxxxxxxxxxx`).
pub fn session_uuid(key: &str) -> Uuid {
    Uuid::new_v5(&SESSION_NAMESPACE, key.as_bytes())
}
