//! Durable copies of the hangout list and per-contact message logs.
//!
//! Keys are namespaced by the local username:
//! - `{me}-hangouts` → JSON array of [`Hangout`]
//! - `{me}-{contact}-messages` → JSON array of [`Message`]
//!
//! [`HangoutStore`] is the only writer of these keys. It keeps the last
//! written value in memory and performs every read-modify-write under a lock,
//! so two updates arriving back to back cannot overwrite each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use hangouts_shared::{Hangout, Message};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StorageError;
use crate::storage::KeyValueStore;

pub fn hangouts_key(username: &str) -> String {
    format!("{}-hangouts", username)
}

pub fn messages_key(username: &str, contact: &str) -> String {
    format!("{}-{}-messages", username, contact)
}

/// Typed JSON access to a [`KeyValueStore`].
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load a value. Returns `None` if the key doesn't exist.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.store.get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json)
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.store.remove(key)
    }
}

/// Single writer for one local user's durable hangout data.
pub struct HangoutStore {
    username: String,
    persistence: Persistence,
    hangouts: Mutex<Option<Vec<Hangout>>>,
    messages: Mutex<HashMap<String, Vec<Message>>>,
}

impl HangoutStore {
    pub fn new(username: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            username: username.into(),
            persistence: Persistence::new(store),
            hangouts: Mutex::new(None),
            messages: Mutex::new(HashMap::new()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The persisted hangout list, read from the store on first access.
    pub fn load_hangouts(&self) -> Result<Vec<Hangout>, StorageError> {
        let mut cache = self.hangouts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.cached_hangouts(&mut cache)?.clone())
    }

    /// Apply `f` to the hangout list and write the whole list back.
    ///
    /// The cache only changes if the write succeeded.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<Hangout>) -> R) -> Result<R, StorageError> {
        let mut cache = self.hangouts.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.cached_hangouts(&mut cache)?.clone();
        let result = f(&mut next);
        self.persistence
            .save(&hangouts_key(&self.username), &next)?;
        *cache = Some(next);
        Ok(result)
    }

    /// Replace the entry with the same username, or append it.
    pub fn upsert(&self, hangout: Hangout) -> Result<(), StorageError> {
        self.update(|list| {
            match list.iter_mut().find(|h| h.username == hangout.username) {
                Some(existing) => *existing = hangout,
                None => list.push(hangout),
            }
        })
    }

    /// Message log for one conversation, oldest first.
    pub fn load_messages(&self, contact: &str) -> Result<Vec<Message>, StorageError> {
        let mut cache = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.cached_messages(&mut cache, contact)?.clone())
    }

    /// Append one message to a conversation log.
    pub fn append_message(&self, contact: &str, message: Message) -> Result<(), StorageError> {
        let mut cache = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.cached_messages(&mut cache, contact)?.clone();
        next.push(message);
        self.persistence
            .save(&messages_key(&self.username, contact), &next)?;
        cache.insert(contact.to_string(), next);
        Ok(())
    }

    fn cached_hangouts<'a>(
        &self,
        cache: &'a mut Option<Vec<Hangout>>,
    ) -> Result<&'a mut Vec<Hangout>, StorageError> {
        if cache.is_none() {
            let loaded = self
                .persistence
                .load::<Vec<Hangout>>(&hangouts_key(&self.username))?
                .unwrap_or_default();
            *cache = Some(loaded);
        }
        Ok(cache.get_or_insert_with(Vec::new))
    }

    fn cached_messages<'a>(
        &self,
        cache: &'a mut HashMap<String, Vec<Message>>,
        contact: &str,
    ) -> Result<&'a mut Vec<Message>, StorageError> {
        if !cache.contains_key(contact) {
            let loaded = self
                .persistence
                .load::<Vec<Message>>(&messages_key(&self.username, contact))?
                .unwrap_or_default();
            cache.insert(contact.to_string(), loaded);
        }
        Ok(cache.entry(contact.to_string()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use hangouts_shared::HangoutState;

    fn hangout(username: &str, state: HangoutState) -> Hangout {
        Hangout {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            state,
            message: None,
        }
    }

    #[test]
    fn test_save_then_load_is_deep_equal() {
        let persistence = Persistence::new(Arc::new(MemoryStore::new()));
        let list = vec![
            hangout("alice", HangoutState::Invite),
            Hangout {
                message: Some(Message {
                    text: "hi".to_string(),
                    timestamp: 1_700_000_000_000,
                    username: Some("bob".to_string()),
                }),
                ..hangout("bob", HangoutState::Messenger)
            },
        ];

        persistence.save("me-hangouts", &list).unwrap();
        let loaded: Vec<Hangout> = persistence.load("me-hangouts").unwrap().unwrap();
        assert_eq!(loaded, list);
    }

    #[test]
    fn test_load_missing_key_is_none() {
        let persistence = Persistence::new(Arc::new(MemoryStore::new()));
        assert_eq!(persistence.load::<Vec<Hangout>>("nobody-hangouts").unwrap(), None);
    }

    #[test]
    fn test_load_reports_corrupt_json() {
        let store = Arc::new(MemoryStore::new());
        store.set("me-hangouts", "{not json").unwrap();
        let persistence = Persistence::new(store);
        assert!(matches!(
            persistence.load::<Vec<Hangout>>("me-hangouts"),
            Err(StorageError::Serde(_))
        ));
    }

    #[test]
    fn test_upsert_replaces_by_username() {
        let store = Arc::new(MemoryStore::new());
        let hangouts = HangoutStore::new("me", store.clone());

        hangouts.upsert(hangout("bob", HangoutState::Invite)).unwrap();
        hangouts.upsert(hangout("carol", HangoutState::Inviter)).unwrap();
        hangouts.upsert(hangout("bob", HangoutState::Accepted)).unwrap();

        let persisted: Vec<Hangout> =
            serde_json::from_str(&store.get("me-hangouts").unwrap().unwrap()).unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].state, HangoutState::Accepted);
        assert_eq!(persisted[1].username, "carol");
    }

    #[test]
    fn test_back_to_back_updates_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let writer = HangoutStore::new("me", store.clone());
        writer.upsert(hangout("bob", HangoutState::Invited)).unwrap();

        writer.upsert(hangout("carol", HangoutState::Inviter)).unwrap();
        writer.upsert(hangout("dave", HangoutState::Inviter)).unwrap();

        let reloaded = HangoutStore::new("me", store);
        let names: Vec<_> = reloaded
            .load_hangouts()
            .unwrap()
            .into_iter()
            .map(|h| h.username)
            .collect();
        assert_eq!(names, vec!["bob", "carol", "dave"]);
    }

    #[test]
    fn test_concurrent_upserts_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let writer = Arc::new(HangoutStore::new("me", store.clone()));

        let threads: Vec<_> = (0..2)
            .map(|t| {
                let writer = writer.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let name = format!("peer-{}-{}", t, i);
                        writer.upsert(hangout(&name, HangoutState::Inviter)).unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let reloaded = HangoutStore::new("me", store);
        assert_eq!(reloaded.load_hangouts().unwrap().len(), 100);
    }

    #[test]
    fn test_messages_are_appended_per_contact() {
        let store = Arc::new(MemoryStore::new());
        let hangouts = HangoutStore::new("me", store.clone());

        hangouts.append_message("bob", Message::now("one")).unwrap();
        hangouts.append_message("bob", Message::now("two")).unwrap();
        hangouts.append_message("carol", Message::now("other")).unwrap();

        let bob = hangouts.load_messages("bob").unwrap();
        assert_eq!(
            bob.iter().map(|m| m.text.as_str()).collect::<Vec<_>>(),
            vec!["one", "two"]
        );
        assert!(store.get("me-bob-messages").unwrap().is_some());
        assert_eq!(hangouts.load_messages("carol").unwrap().len(), 1);
        assert!(hangouts.load_messages("dave").unwrap().is_empty());
    }
}
