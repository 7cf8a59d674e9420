//! Contract-call descriptions in the multisig transaction-builder shape.
//!
//! A [`Transaction`] either carries raw call data, or a [`ContractMethod`]
//! descriptor together with one string argument per declared parameter, or
//! neither (a plain value transfer). The combination is checked once, at
//! construction, and the value is immutable afterwards.

use crate::error::{IncentiveError, Result};
use crate::units;
use alloy_primitives::{Bytes, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// 20-byte account address, displayed as `0x` + 40 lowercase hex digits.
///
/// Mixed-case input is accepted without checksum validation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(alloy_primitives::Address);

impl Address {
    /// Wraps raw address bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(alloy_primitives::Address::new(bytes))
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0 .0 .0
    }
}

impl From<alloy_primitives::Address> for Address {
    fn from(address: alloy_primitives::Address) -> Self {
        Self(address)
    }
}

impl From<Address> for alloy_primitives::Address {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl FromStr for Address {
    type Err = IncentiveError;

    fn from_str(raw: &str) -> Result<Self> {
        raw.trim()
            .parse::<alloy_primitives::Address>()
            .map(Self)
            .map_err(|_| IncentiveError::InvalidAddress(raw.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Raw call-data bytes, displayed as `0x`-prefixed lowercase hex.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct CallData(Bytes);

impl CallData {
    /// Wraps raw call-data bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl FromStr for CallData {
    type Err = IncentiveError;

    fn from_str(raw: &str) -> Result<Self> {
        raw.trim()
            .parse::<Bytes>()
            .map(Self)
            .map_err(|err| IncentiveError::MalformedTransaction(format!("call data '{raw}': {err}")))
    }
}

impl fmt::Display for CallData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for CallData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallData({self})")
    }
}

impl Serialize for CallData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CallData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One named, typed parameter of a contract method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodInput {
    /// Solidity-level type name, when it differs from the ABI type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,
    /// Parameter name; also the key of its argument in `contractInputsValues`.
    pub name: String,
    /// ABI type (`address`, `uint256`, ...).
    #[serde(rename = "type")]
    pub kind: String,
}

/// Function descriptor: a name plus its ordered parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMethod {
    /// Parameters in declaration order.
    pub inputs: Vec<MethodInput>,
    /// Function name.
    pub name: String,
    /// Whether the function accepts native value.
    #[serde(default)]
    pub payable: bool,
}

impl ContractMethod {
    /// Creates a non-payable method without parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inputs: Vec::new(),
            name: name.into(),
            payable: false,
        }
    }

    /// Appends a parameter whose internal type equals its ABI type.
    pub fn with_input(mut self, name: impl Into<String>, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        self.inputs.push(MethodInput {
            internal_type: Some(kind.clone()),
            name: name.into(),
            kind,
        });
        self
    }

    /// Marks the method payable.
    pub fn payable(mut self) -> Self {
        self.payable = true;
        self
    }

    /// Canonical signature, e.g. `approve(address,uint256)`.
    pub fn signature(&self) -> String {
        let kinds = self
            .inputs
            .iter()
            .map(|input| input.kind.as_str())
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({kinds})", self.name)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(IncentiveError::MalformedTransaction(
                "contract method has no name".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for input in &self.inputs {
            if input.name.is_empty() {
                return Err(IncentiveError::MalformedTransaction(format!(
                    "{} declares an unnamed parameter",
                    self.signature()
                )));
            }
            if !seen.insert(input.name.as_str()) {
                return Err(IncentiveError::MalformedTransaction(format!(
                    "{} declares parameter '{}' twice",
                    self.signature(),
                    input.name
                )));
            }
        }
        Ok(())
    }
}

/// A single contract call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TransactionParts")]
pub struct Transaction {
    to: Address,
    #[serde(with = "units::decimal")]
    value: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<CallData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contract_method: Option<ContractMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contract_inputs_values: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionParts {
    to: Address,
    #[serde(with = "units::decimal")]
    value: U256,
    #[serde(default)]
    data: Option<CallData>,
    #[serde(default)]
    contract_method: Option<ContractMethod>,
    #[serde(default)]
    contract_inputs_values: Option<BTreeMap<String, String>>,
}

impl TryFrom<TransactionParts> for Transaction {
    type Error = IncentiveError;

    fn try_from(parts: TransactionParts) -> Result<Self> {
        build_transaction(
            parts.to,
            parts.value,
            parts.contract_method,
            parts.contract_inputs_values,
            parts.data,
        )
    }
}

impl Transaction {
    /// Starts building a call to `to` carrying `value` native units.
    pub fn builder(to: Address, value: U256) -> TransactionBuilder {
        TransactionBuilder {
            to,
            value,
            method: None,
            inputs: None,
            data: None,
        }
    }

    /// Call target.
    pub fn to(&self) -> Address {
        self.to
    }

    /// Native value attached to the call.
    pub fn value(&self) -> U256 {
        self.value
    }

    /// Raw call data, if the call was given as bytes.
    pub fn data(&self) -> Option<&CallData> {
        self.data.as_ref()
    }

    /// Method descriptor, if the call was given structurally.
    pub fn contract_method(&self) -> Option<&ContractMethod> {
        self.contract_method.as_ref()
    }

    /// Arguments keyed by parameter name; present iff a method is.
    pub fn contract_inputs_values(&self) -> Option<&BTreeMap<String, String>> {
        self.contract_inputs_values.as_ref()
    }

    /// Whether the call only moves native value.
    pub fn is_plain_transfer(&self) -> bool {
        self.data.is_none() && self.contract_method.is_none()
    }
}

/// Incremental form of [`build_transaction`].
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    to: Address,
    value: U256,
    method: Option<ContractMethod>,
    inputs: Option<Vec<(String, String)>>,
    data: Option<CallData>,
}

impl TransactionBuilder {
    /// Sets the method descriptor.
    pub fn with_method(mut self, method: ContractMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Adds one argument.
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    /// Sets raw call data.
    pub fn with_data(mut self, data: CallData) -> Self {
        self.data = Some(data);
        self
    }

    /// Validates and produces the transaction.
    pub fn build(self) -> Result<Transaction> {
        let inputs = match self.inputs {
            Some(pairs) => {
                let mut map = BTreeMap::new();
                for (name, value) in pairs {
                    if map.insert(name.clone(), value).is_some() {
                        return Err(IncentiveError::MalformedTransaction(format!(
                            "argument '{name}' supplied twice"
                        )));
                    }
                }
                Some(map)
            }
            None => None,
        };
        build_transaction(self.to, self.value, self.method, inputs, self.data)
    }
}

/// Assembles a transaction, enforcing the method/argument/data combinations.
///
/// * `data` excludes `method` and `inputs`;
/// * `inputs` requires `method`;
/// * a method's arguments must name exactly its declared parameters (a method
///   without parameters may omit `inputs`);
/// * with none of the three the call is a plain value transfer.
pub fn build_transaction(
    to: Address,
    value: U256,
    method: Option<ContractMethod>,
    inputs: Option<BTreeMap<String, String>>,
    data: Option<CallData>,
) -> Result<Transaction> {
    if data.is_some() && (method.is_some() || inputs.is_some()) {
        return Err(IncentiveError::MalformedTransaction(
            "raw call data and a contract method are mutually exclusive".to_string(),
        ));
    }
    let inputs = match (&method, inputs) {
        (None, Some(_)) => {
            return Err(IncentiveError::MalformedTransaction(
                "contract input values supplied without a contract method".to_string(),
            ))
        }
        (None, None) => None,
        (Some(method), inputs) => {
            method.validate()?;
            let inputs = inputs.unwrap_or_default();
            check_arguments(method, &inputs)?;
            Some(inputs)
        }
    };
    Ok(Transaction {
        to,
        value,
        data,
        contract_method: method,
        contract_inputs_values: inputs,
    })
}

fn check_arguments(method: &ContractMethod, inputs: &BTreeMap<String, String>) -> Result<()> {
    let declared = method
        .inputs
        .iter()
        .map(|input| input.name.as_str())
        .collect::<BTreeSet<_>>();
    let missing = declared
        .iter()
        .filter(|name| !inputs.contains_key(**name))
        .copied()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(IncentiveError::MalformedTransaction(format!(
            "{} is missing arguments: {}",
            method.signature(),
            missing.join(", ")
        )));
    }
    let extra = inputs
        .keys()
        .filter(|name| !declared.contains(name.as_str()))
        .map(String::as_str)
        .collect::<Vec<_>>();
    if !extra.is_empty() {
        return Err(IncentiveError::MalformedTransaction(format!(
            "{} does not declare arguments: {}",
            method.signature(),
            extra.join(", ")
        )));
    }
    Ok(())
}
