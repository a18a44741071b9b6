//! Message Chain Engine.
//!
//! Each conversation owns a tail record `(last_sequence, last_hash)` behind
//! its own mutex. An append holds that mutex from the `prev_hash` check
//! until the row is committed and the tail has advanced, so two appends
//! against the same snapshot can never both succeed. Conversations never
//! share a tail lock.
//!
//! Readers go straight to the committed rows. A row is inserted before its
//! tail advances and the next append cannot start until it has, so a reader
//! never sees sequence `n` without `n - 1`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use vault_shared::chain::verify_messages;
use vault_shared::error::ChainViolation;
use vault_shared::protocol::{Appended, ChainMessage, ChainTail, NewMessage, User};
use vault_shared::signing::SignatureVerifier;
use vault_shared::types::{ConversationId, MessageId, UserId};
use vault_store::StoreError;

use crate::access::{require_conversation, require_non_empty, require_participant, require_user};
use crate::error::{LedgerError, Result};
use crate::{LedgerConfig, SharedDb};

type TailHandle = Arc<Mutex<ChainTail>>;

/// Outcome of a full-chain audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainReport {
    pub conversation_id: ConversationId,
    /// Number of stored messages examined
    pub messages: u64,
    /// Last sequence the engine has committed
    pub last_sequence: u64,
    pub intact: bool,
    /// First sequence that failed, if any
    pub broken_at: Option<u64>,
    pub reason: Option<String>,
}

pub struct ChainEngine {
    db: SharedDb,
    verifier: Arc<dyn SignatureVerifier>,
    tails: RwLock<HashMap<ConversationId, TailHandle>>,
    config: LedgerConfig,
}

impl ChainEngine {
    pub(crate) fn new(
        db: SharedDb,
        verifier: Arc<dyn SignatureVerifier>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            db,
            verifier,
            tails: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Append a message to the conversation's chain.
    ///
    /// Checks run in a fixed order and the first failure is returned:
    /// unknown conversation or sender, `key_id` not registered to the
    /// sender, non-participant sender, stale `prev_hash`, bad signature.
    /// A failed append changes nothing.
    pub async fn append(
        &self,
        conversation_id: ConversationId,
        message: NewMessage,
    ) -> Result<Appended> {
        validate_new(&message)?;

        let handle = self.tail_handle(conversation_id).await?;

        let public_key = {
            let db = self.db.lock().await;
            let sender = require_user(&db, message.sender_id)?;
            if sender.key_id != message.key_id {
                return Err(LedgerError::InvalidInput(format!(
                    "key {} is not registered for user {}",
                    message.key_id.as_str(),
                    message.sender_id
                )));
            }
            require_participant(&db, conversation_id, message.sender_id)?;
            sender.public_key
        };

        let mut tail = handle.lock().await;

        if !tail.accepts(message.prev_hash.as_deref()) {
            debug!(
                conversation = %conversation_id,
                sender = %message.sender_id,
                last_sequence = tail.last_sequence,
                "Rejected append: prev_hash does not match tail"
            );
            return Err(LedgerError::ChainMismatch { tail: tail.clone() });
        }

        let payload = message.signing_payload(&conversation_id);
        if !self
            .verifier
            .verify(&public_key, &payload, &message.signature)
        {
            warn!(
                conversation = %conversation_id,
                sender = %message.sender_id,
                "Rejected append: invalid signature"
            );
            return Err(LedgerError::SignatureInvalid);
        }

        let committed = ChainMessage {
            message_id: MessageId::new(),
            conversation_id,
            sender_id: message.sender_id,
            ciphertext: message.ciphertext,
            content_hash: message.content_hash,
            signature: message.signature,
            prev_hash: message.prev_hash,
            client_timestamp: message.client_timestamp,
            key_id: message.key_id,
            sequence: tail.last_sequence + 1,
            created_at: Utc::now(),
        };

        {
            let db = self.db.lock().await;
            match db.insert_message(&committed) {
                Ok(()) => {}
                Err(StoreError::Duplicate(detail)) => {
                    // Another writer reached the same database; adopt its tail.
                    *tail = db.chain_tail(conversation_id)?;
                    warn!(conversation = %conversation_id, %detail, "Tail was stale, reloaded");
                    return Err(LedgerError::ChainMismatch { tail: tail.clone() });
                }
                Err(e) => return Err(e.into()),
            }
        }

        tail.last_sequence = committed.sequence;
        tail.last_hash = Some(committed.content_hash);

        info!(
            conversation = %conversation_id,
            message = %committed.message_id,
            sequence = committed.sequence,
            "Message appended"
        );

        Ok(Appended {
            message_id: committed.message_id,
            sequence: committed.sequence,
        })
    }

    /// Messages with `sequence > after_sequence`, ascending, at most `limit`.
    pub async fn list(
        &self,
        conversation_id: ConversationId,
        after_sequence: u64,
        limit: i64,
    ) -> Result<Vec<ChainMessage>> {
        let limit = self.config.check_limit(limit)?;

        let db = self.db.lock().await;
        require_conversation(&db, conversation_id)?;
        Ok(db.list_messages(conversation_id, after_sequence, limit)?)
    }

    /// Current committed tail of the conversation.
    pub async fn tail(&self, conversation_id: ConversationId) -> Result<ChainTail> {
        let handle = self.tail_handle(conversation_id).await?;
        let tail = handle.lock().await;
        Ok(tail.clone())
    }

    /// Whether the stored chain is unbroken. See [`ChainEngine::audit_chain`].
    pub async fn verify_chain(&self, conversation_id: ConversationId) -> Result<bool> {
        Ok(self.audit_chain(conversation_id).await?.intact)
    }

    /// Re-walk the full stored chain: contiguous sequences from 1,
    /// `prev_hash` linkage, every signature, and agreement of the stored
    /// end with the committed tail.
    ///
    /// Appends to this conversation wait until the audit finishes.
    pub async fn audit_chain(&self, conversation_id: ConversationId) -> Result<ChainReport> {
        let handle = self.tail_handle(conversation_id).await?;
        let committed = handle.lock().await;

        let (messages, senders) = {
            let db = self.db.lock().await;
            let messages = db.chain_messages(conversation_id)?;
            let mut senders: HashMap<UserId, User> = HashMap::new();
            for msg in &messages {
                if senders.contains_key(&msg.sender_id) {
                    continue;
                }
                match db.get_user(msg.sender_id) {
                    Ok(user) => {
                        senders.insert(msg.sender_id, user);
                    }
                    Err(StoreError::NotFound) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            (messages, senders)
        };

        let outcome = verify_messages(
            &messages,
            &ChainTail::default(),
            |id, key_id| {
                senders
                    .get(id)
                    .filter(|user| &user.key_id == key_id)
                    .map(|user| user.public_key.clone())
            },
            self.verifier.as_ref(),
        )
        .and_then(|stored| {
            if stored == *committed {
                Ok(stored)
            } else {
                Err(ChainViolation::TailMismatch {
                    sequence: stored.last_sequence.max(committed.last_sequence),
                })
            }
        });

        let report = ChainReport {
            conversation_id,
            messages: messages.len() as u64,
            last_sequence: committed.last_sequence,
            intact: outcome.is_ok(),
            broken_at: outcome.as_ref().err().map(ChainViolation::sequence),
            reason: outcome.as_ref().err().map(ToString::to_string),
        };

        if let Some(reason) = &report.reason {
            warn!(conversation = %conversation_id, %reason, "Chain audit failed");
        } else {
            info!(
                conversation = %conversation_id,
                messages = report.messages,
                "Chain audit passed"
            );
        }
        Ok(report)
    }

    /// Tail record for a conversation, loaded from storage on first use.
    async fn tail_handle(&self, conversation_id: ConversationId) -> Result<TailHandle> {
        if let Some(handle) = self.tails.read().await.get(&conversation_id) {
            return Ok(handle.clone());
        }

        let mut tails = self.tails.write().await;
        if let Some(handle) = tails.get(&conversation_id) {
            return Ok(handle.clone());
        }

        let tail = {
            let db = self.db.lock().await;
            require_conversation(&db, conversation_id)?;
            db.chain_tail(conversation_id)?
        };
        debug!(
            conversation = %conversation_id,
            last_sequence = tail.last_sequence,
            "Loaded chain tail"
        );

        let handle = Arc::new(Mutex::new(tail));
        tails.insert(conversation_id, handle.clone());
        Ok(handle)
    }
}

fn validate_new(message: &NewMessage) -> Result<()> {
    require_non_empty("ciphertext", &message.ciphertext)?;
    require_non_empty("content_hash", &message.content_hash)?;
    require_non_empty("signature", &message.signature)?;
    if let Some(prev) = &message.prev_hash {
        require_non_empty("prev_hash", prev)?;
    }
    if message.key_id.is_empty() {
        return Err(LedgerError::InvalidInput("key_id must not be empty".into()));
    }
    Ok(())
}
