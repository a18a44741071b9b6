/// Application name
pub const APP_NAME: &str = "Secure Vault";

/// Key id issued for the key supplied at registration
pub const PRIMARY_KEY_ID: &str = "primary";

/// Sequence number of the first message in every conversation
pub const FIRST_SEQUENCE: u64 = 1;

/// Domain tags prefixed to every canonical signing payload
pub const SIGNING_TAG_MESSAGE: &str = "vault-ledger/message/v1";
pub const SIGNING_TAG_ATTACHMENT: &str = "vault-ledger/attachment/v1";
pub const SIGNING_TAG_ATTACHMENT_META: &str = "vault-ledger/attachment-meta/v1";

/// Key derivation contexts (BLAKE3)
pub const KDF_CONTEXT_FINGERPRINT: &str = "vault-ledger key fingerprint v1";
pub const KDF_CONTEXT_CONTENT_HASH: &str = "vault-ledger content hash v1";

/// Ed25519 public key size in bytes
pub const PUBKEY_SIZE: usize = 32;

/// Ed25519 signature size in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Default and maximum page sizes for message listing
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 200;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;
