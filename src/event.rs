// src/event.rs
//! Outbound message construction: content plus, for relays, a signed
//! Nostr text note (NIP-01 id, BIP-340 Schnorr signature).

use std::fmt;
use std::str::FromStr;

use secp256k1::{schnorr, Keypair, Message, XOnlyPublicKey, SECP256K1};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::identity::RepositoryIdentity;
use crate::source::Candidate;

pub const KIND_TEXT_NOTE: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("secret key is not a valid 32-byte hex secp256k1 key")]
    InvalidKey,
    #[error("event id does not match its content")]
    IdMismatch,
    #[error("signature check failed: {0}")]
    BadSignature(String),
}

/// Nostr event as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NostrEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

/// sha256 over `[0, pubkey, created_at, kind, tags, content]` in compact JSON.
pub fn event_id(
    pubkey: &str,
    created_at: i64,
    kind: u16,
    tags: &[Vec<String>],
    content: &str,
) -> [u8; 32] {
    Sha256::digest(canonical_json(pubkey, created_at, kind, tags, content).as_bytes()).into()
}

/// Relays recompute the id from this exact form: only `" \\ \n \r \t \b \f`
/// are escaped; anything else, control bytes included, goes out verbatim.
fn canonical_json(
    pubkey: &str,
    created_at: i64,
    kind: u16,
    tags: &[Vec<String>],
    content: &str,
) -> String {
    let mut out = String::with_capacity(content.len() + 128);
    out.push_str("[0,");
    push_json_str(&mut out, pubkey);
    out.push_str(&format!(",{created_at},{kind},["));
    for (i, tag) in tags.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('[');
        for (j, item) in tag.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            push_json_str(&mut out, item);
        }
        out.push(']');
    }
    out.push_str("],");
    push_json_str(&mut out, content);
    out.push(']');
    out
}

fn push_json_str(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c => out.push(c),
        }
    }
    out.push('"');
}

impl NostrEvent {
    /// Recompute the id and check the signature against `pubkey`.
    pub fn verify(&self) -> Result<(), SignError> {
        let id = event_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        );
        if hex::encode(id) != self.id {
            return Err(SignError::IdMismatch);
        }

        let pk = XOnlyPublicKey::from_str(&self.pubkey)
            .map_err(|e| SignError::BadSignature(e.to_string()))?;
        let sig = schnorr::Signature::from_str(&self.sig)
            .map_err(|e| SignError::BadSignature(e.to_string()))?;
        SECP256K1
            .verify_schnorr(&sig, &Message::from_digest(id), &pk)
            .map_err(|e| SignError::BadSignature(e.to_string()))
    }
}

/// Holds the publishing identity. Never prints the secret.
pub struct NostrSigner {
    keypair: Keypair,
    pubkey_hex: String,
}

impl fmt::Debug for NostrSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NostrSigner")
            .field("pubkey", &self.pubkey_hex)
            .finish_non_exhaustive()
    }
}

impl NostrSigner {
    pub fn from_hex(secret_hex: &str) -> Result<Self, SignError> {
        let keypair =
            Keypair::from_seckey_str(SECP256K1, secret_hex.trim()).map_err(|_| SignError::InvalidKey)?;
        let (xonly, _parity) = keypair.x_only_public_key();
        Ok(Self {
            keypair,
            pubkey_hex: xonly.to_string(),
        })
    }

    pub fn public_key_hex(&self) -> &str {
        &self.pubkey_hex
    }

    pub fn sign_note(
        &self,
        content: &str,
        tags: Vec<Vec<String>>,
        created_at: i64,
    ) -> NostrEvent {
        let id = event_id(&self.pubkey_hex, created_at, KIND_TEXT_NOTE, &tags, content);
        let sig = SECP256K1.sign_schnorr_no_aux_rand(&Message::from_digest(id), &self.keypair);
        NostrEvent {
            id: hex::encode(id),
            pubkey: self.pubkey_hex.clone(),
            created_at,
            kind: KIND_TEXT_NOTE,
            tags,
            content: content.to_string(),
            sig: sig.to_string(),
        }
    }
}

/// One rendered announcement, built per accepted candidate and dropped after fan-out.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub identity: RepositoryIdentity,
    pub url: String,
    pub content: String,
    /// Present when a signer is configured; relays refuse unsigned messages.
    pub nostr: Option<NostrEvent>,
}

impl OutboundMessage {
    pub fn build(
        candidate: &Candidate,
        content: String,
        signer: Option<&NostrSigner>,
        created_at: i64,
    ) -> Self {
        let nostr = signer.map(|s| {
            let mut tags = vec![
                vec!["t".to_string(), "github".to_string()],
                vec!["r".to_string(), candidate.url.clone()],
            ];
            if let Some(lang) = candidate.language.as_deref().filter(|l| !l.is_empty()) {
                tags.push(vec!["t".to_string(), lang.to_ascii_lowercase()]);
            }
            s.sign_note(&content, tags, created_at)
        });

        Self {
            identity: candidate.identity.clone(),
            url: candidate.url.clone(),
            content,
            nostr,
        }
    }
}
