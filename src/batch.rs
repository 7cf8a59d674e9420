//! Checksummed transaction batches.
//!
//! [`BatchBuilder`] fills in the defaults a multisig transaction builder
//! expects (`version`, `createdAt`), hashes the batch with
//! [`checksum_of`](crate::checksum::checksum_of) and attaches the digest to
//! `meta.checksum`. The returned [`Batch`] is never mutated afterwards.
//!
//! Decoding a persisted artifact into a [`Batch`] checks the stored checksum
//! against the raw JSON and again against the typed form, so a decoded batch
//! always verifies.

use crate::checksum::{checksum_of, verify_checksum, Checksum, ChecksumVerdict};
use crate::error::{IncentiveError, Result};
use crate::io::now_millis;
use crate::transaction::{Address, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Batch format version used when none is supplied.
pub const DEFAULT_VERSION: &str = "1.0";

/// Display and provenance metadata of a batch.
///
/// Every field except `name` and `checksum` is covered by the checksum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMeta {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description shown to reviewers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Version tag of the tool that produced the batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_builder_version: Option<String>,
    /// Multisig wallet the batch is meant for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_from_safe_address: Option<Address>,
    /// Digest of the batch with this field absent and `name` null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
}

impl BatchMeta {
    /// Metadata carrying only a display name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// An ordered, checksummed set of transactions reviewed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Value")]
pub struct Batch {
    version: String,
    chain_id: String,
    created_at: u64,
    meta: BatchMeta,
    transactions: Vec<Transaction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchParts {
    version: String,
    chain_id: String,
    created_at: u64,
    meta: BatchMeta,
    transactions: Vec<Transaction>,
}

impl TryFrom<Value> for Batch {
    type Error = IncentiveError;

    /// Rejects artifacts whose stored checksum is wrong, and artifacts whose
    /// typed form would hash differently (explicit nulls, mixed-case
    /// addresses, unknown keys).
    fn try_from(value: Value) -> Result<Self> {
        let stored = match verify_checksum(&value)? {
            ChecksumVerdict::Match(checksum) => checksum,
            ChecksumVerdict::Mismatch { stored, recomputed } => {
                return Err(IncentiveError::InvalidBatch(format!(
                    "stored checksum {stored} does not match content {recomputed}"
                )))
            }
        };
        let parts: BatchParts = serde_json::from_value(value)?;
        check_header(&parts.chain_id, &parts.version)?;
        let batch = Batch {
            version: parts.version,
            chain_id: parts.chain_id,
            created_at: parts.created_at,
            meta: parts.meta,
            transactions: parts.transactions,
        };
        let typed = checksum_of(&batch)?;
        if typed != stored {
            return Err(IncentiveError::InvalidBatch(format!(
                "decoding changes the checksum from {stored} to {typed}"
            )));
        }
        Ok(batch)
    }
}

impl Batch {
    /// Starts a batch for the network identified by `chain_id`.
    pub fn builder(chain_id: impl Into<String>) -> BatchBuilder {
        BatchBuilder {
            chain_id: chain_id.into(),
            transactions: Vec::new(),
            version: None,
            created_at: None,
            meta: None,
        }
    }

    /// Two-part format version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Decimal chain id.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Creation time in milliseconds since the epoch.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Metadata including the checksum.
    pub fn meta(&self) -> &BatchMeta {
        &self.meta
    }

    /// Transactions in execution order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Stored checksum; always present on built batches.
    pub fn checksum(&self) -> Option<Checksum> {
        self.meta.checksum
    }

    /// Recomputes the checksum and compares it with the stored one.
    pub fn verify(&self) -> Result<ChecksumVerdict> {
        let value = serde_json::to_value(self)
            .map_err(|err| IncentiveError::Serialization(err.to_string()))?;
        verify_checksum(&value)
    }
}

/// Incremental form of [`build_batch`].
#[derive(Debug, Clone)]
pub struct BatchBuilder {
    chain_id: String,
    transactions: Vec<Transaction>,
    version: Option<String>,
    created_at: Option<u64>,
    meta: Option<BatchMeta>,
}

impl BatchBuilder {
    /// Appends one transaction.
    pub fn with_transaction(mut self, tx: Transaction) -> Self {
        self.transactions.push(tx);
        self
    }

    /// Appends transactions in order.
    pub fn with_transactions(mut self, txs: impl IntoIterator<Item = Transaction>) -> Self {
        self.transactions.extend(txs);
        self
    }

    /// Overrides the format version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Pins the creation time; required for reproducible checksums.
    pub fn with_created_at(mut self, created_at_ms: u64) -> Self {
        self.created_at = Some(created_at_ms);
        self
    }

    /// Supplies metadata; any checksum in it is replaced.
    pub fn with_meta(mut self, meta: BatchMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Finalizes the batch.
    pub fn build(self) -> Result<Batch> {
        build_batch(
            self.chain_id,
            self.transactions,
            self.version,
            self.created_at,
            self.meta,
        )
    }
}

/// Applies defaults, computes the checksum and returns the completed batch.
///
/// `meta` is always emitted: without caller metadata it is `{"checksum": ...}`
/// alone, and the checksum itself is taken over `meta` as `{"name": null}`.
/// Any checksum in the supplied metadata is discarded.
///
/// An empty transaction list is accepted; whether to emit such a batch is the
/// caller's decision.
pub fn build_batch(
    chain_id: String,
    transactions: Vec<Transaction>,
    version: Option<String>,
    created_at: Option<u64>,
    meta: Option<BatchMeta>,
) -> Result<Batch> {
    let version = version.unwrap_or_else(|| DEFAULT_VERSION.to_string());
    check_header(&chain_id, &version)?;
    let mut meta = meta.unwrap_or_default();
    meta.checksum = None;

    let mut batch = Batch {
        version,
        chain_id,
        created_at: created_at.unwrap_or_else(now_millis),
        meta,
        transactions,
    };
    batch.meta.checksum = Some(checksum_of(&batch)?);
    Ok(batch)
}

fn check_header(chain_id: &str, version: &str) -> Result<()> {
    if chain_id.is_empty() || !chain_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IncentiveError::InvalidBatch(format!(
            "chain id '{chain_id}' is not a decimal number"
        )));
    }
    if !is_two_part_version(version) {
        return Err(IncentiveError::InvalidBatch(format!(
            "version '{version}' is not of the form <major>.<minor>"
        )));
    }
    Ok(())
}

fn is_two_part_version(version: &str) -> bool {
    match version.split_once('.') {
        Some((major, minor)) => [major, minor]
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{Batch, BatchMeta, DEFAULT_VERSION};
    use crate::checksum::{calculate_checksum, verify_checksum, ChecksumVerdict};
    use crate::transaction::{Address, ContractMethod, Transaction};
    use alloy_primitives::U256;
    use serde_json::{json, Value};

    const CREATED_AT: u64 = 1_700_000_000_000;

    fn approve_tx() -> Transaction {
        let token: Address = "0x912CE59144191C1204E64559FE8253a0e49E6548".parse().unwrap();
        Transaction::builder(token, U256::ZERO)
            .with_method(
                ContractMethod::new("approve")
                    .with_input("spender", "address")
                    .with_input("amount", "uint256"),
            )
            .with_input("spender", "0x00000000000000000000000000000000000000aa")
            .with_input("amount", "1000000000000000000")
            .build()
            .unwrap()
    }

    fn pinned() -> Batch {
        Batch::builder("42161")
            .with_transaction(approve_tx())
            .with_created_at(CREATED_AT)
            .with_meta(BatchMeta::named("weekly incentives"))
            .build()
            .unwrap()
    }

    #[test]
    fn defaults_are_applied() {
        let batch = Batch::builder("1").build().unwrap();
        assert_eq!(batch.version(), DEFAULT_VERSION);
        assert!(batch.created_at() > CREATED_AT);
        assert!(batch.transactions().is_empty());
        assert!(batch.checksum().is_some());
        assert_eq!(batch.meta().name, None);
        assert_eq!(
            serde_json::to_value(&batch).unwrap()["meta"],
            json!({"checksum": batch.checksum().unwrap().to_string()})
        );
    }

    #[test]
    fn pinned_batches_have_identical_checksums() {
        let first = pinned();
        let second = pinned();
        assert_eq!(first.checksum(), second.checksum());
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );

        let later = Batch::builder("42161")
            .with_transaction(approve_tx())
            .with_created_at(CREATED_AT + 1)
            .build()
            .unwrap();
        assert_ne!(first.checksum(), later.checksum());
    }

    #[test]
    fn name_is_preserved_but_not_hashed() {
        let named = pinned();
        let unnamed = Batch::builder("42161")
            .with_transaction(approve_tx())
            .with_created_at(CREATED_AT)
            .build()
            .unwrap();
        assert_eq!(named.meta().name.as_deref(), Some("weekly incentives"));
        assert_eq!(named.checksum(), unnamed.checksum());
    }

    #[test]
    fn supplied_checksum_is_replaced() {
        let mut meta = BatchMeta::named("x");
        meta.checksum = Some(crate::checksum::Checksum::from_bytes([7u8; 32]));
        let batch = Batch::builder("42161")
            .with_created_at(CREATED_AT)
            .with_meta(meta)
            .build()
            .unwrap();
        assert_ne!(batch.checksum().unwrap().as_bytes(), &[7u8; 32]);
        assert!(batch.verify().unwrap().is_match());
    }

    #[test]
    fn checksum_matches_independently_ordered_json() {
        let batch = pinned();
        let handwritten = json!({
            "transactions": [{
                "contractInputsValues": {
                    "spender": "0x00000000000000000000000000000000000000aa",
                    "amount": "1000000000000000000"
                },
                "value": "0",
                "contractMethod": {
                    "payable": false,
                    "name": "approve",
                    "inputs": [
                        {"type": "address", "name": "spender", "internalType": "address"},
                        {"type": "uint256", "name": "amount", "internalType": "uint256"}
                    ]
                },
                "to": "0x912ce59144191c1204e64559fe8253a0e49e6548"
            }],
            "meta": {"name": "something else entirely"},
            "createdAt": CREATED_AT,
            "chainId": "42161",
            "version": "1.0"
        });
        assert_eq!(Some(calculate_checksum(&handwritten).unwrap()), batch.checksum());
    }

    #[test]
    fn persisted_artifact_verifies() {
        let batch = pinned();
        let text = serde_json::to_string_pretty(&batch).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            crate::checksum::verify_checksum(&value).unwrap(),
            ChecksumVerdict::Match(batch.checksum().unwrap())
        );
        let reloaded: Batch = serde_json::from_str(&text).unwrap();
        assert_eq!(reloaded, batch);
    }

    #[test]
    fn provenance_metadata_is_hashed() {
        let plain = pinned();
        let safe: Address = "0x00000000000000000000000000000000000000bb".parse().unwrap();
        let with_safe = Batch::builder("42161")
            .with_transaction(approve_tx())
            .with_created_at(CREATED_AT)
            .with_meta(BatchMeta {
                created_from_safe_address: Some(safe),
                ..BatchMeta::named("weekly incentives")
            })
            .build()
            .unwrap();
        assert_ne!(plain.checksum(), with_safe.checksum());
    }

    #[test]
    fn invalid_header_fields_are_rejected() {
        assert!(Batch::builder("arb").build().is_err());
        assert!(Batch::builder("").build().is_err());
        assert!(Batch::builder("1").with_version("1").build().is_err());
        assert!(Batch::builder("1").with_version("1.x").build().is_err());
        assert!(Batch::builder("1").with_version("2.10").build().is_ok());
    }

    const TOKEN: &str = "0x912ce59144191c1204e64559fe8253a0e49e6548";

    fn approve_call(to: &str) -> Value {
        json!({
            "to": to,
            "value": "0",
            "contractMethod": {
                "inputs": [{"internalType": "address", "name": "spender", "type": "address"}],
                "name": "approve",
                "payable": false
            },
            "contractInputsValues": {"spender": "0x00000000000000000000000000000000000000aa"}
        })
    }

    fn stamped(chain_id: &str, tx: Value) -> Value {
        let mut raw = json!({
            "version": "1.0",
            "chainId": chain_id,
            "createdAt": CREATED_AT,
            "meta": {"name": "weekly incentives"},
            "transactions": [tx]
        });
        let checksum = calculate_checksum(&raw).unwrap();
        raw["meta"]["checksum"] = json!(checksum.to_string());
        raw
    }

    #[test]
    fn decoded_artifacts_keep_their_checksum() {
        let raw = stamped("42161", approve_call(TOKEN));
        let batch: Batch = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(
            batch.verify().unwrap(),
            ChecksumVerdict::Match(batch.checksum().unwrap())
        );
        assert_eq!(serde_json::to_value(&batch).unwrap(), raw);
    }

    #[test]
    fn decoding_rejects_content_the_typed_form_would_rehash() {
        let mut null_data_mixed_case = approve_call("0x912CE59144191C1204E64559FE8253a0e49E6548");
        null_data_mixed_case["data"] = Value::Null;
        let mut null_data = approve_call(TOKEN);
        null_data["data"] = Value::Null;
        let mut unknown_input_key = approve_call(TOKEN);
        unknown_input_key["contractMethod"]["inputs"][0]["components"] = json!([]);
        let mixed_case = approve_call("0x912CE59144191C1204E64559FE8253a0e49E6548");

        for tx in [null_data_mixed_case, null_data, unknown_input_key, mixed_case] {
            let raw = stamped("42161", tx);
            assert!(verify_checksum(&raw).unwrap().is_match());
            let err = serde_json::from_value::<Batch>(raw).unwrap_err();
            assert!(err.to_string().contains("changes the checksum"), "{err}");
        }
    }

    #[test]
    fn decoding_rejects_bad_checksums_and_headers() {
        let mut tampered = stamped("42161", approve_call(TOKEN));
        tampered["createdAt"] = json!(CREATED_AT + 1);
        assert!(serde_json::from_value::<Batch>(tampered).is_err());

        let mut unstamped = stamped("42161", approve_call(TOKEN));
        unstamped["meta"].as_object_mut().unwrap().remove("checksum");
        assert!(serde_json::from_value::<Batch>(unstamped).is_err());

        let bad_chain = stamped("arbitrum", approve_call(TOKEN));
        assert!(verify_checksum(&bad_chain).unwrap().is_match());
        assert!(serde_json::from_value::<Batch>(bad_chain).is_err());
    }
}
