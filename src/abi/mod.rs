//! Contract ABI model
//!
//! The contract is not bound at compile time. Its ABI arrives as JSON from the
//! deployment tooling and is turned into an ordered list of [`FunctionDescriptor`]s.
//! [`resolver`] picks which descriptor serves each operation and [`Invocation`]
//! encodes the call.

pub mod resolver;

use crate::types::{CallRequest, TxRequest};
use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{keccak256, Address, Bytes, FixedBytes, U256};
use eyre::{bail, ensure, Context, ContextCompat, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// State mutability of a contract function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl Mutability {
    /// `view` and `pure` functions never mutate state
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Pure | Self::View)
    }
}

/// Whether a function is called or transacted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Read,
    Write,
}

/// A single callable function from the ABI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: String,
    /// Canonical Solidity input types, in order (e.g. `address`, `uint256`, `(uint256,address)`)
    pub inputs: Vec<String>,
    /// Canonical Solidity output types, in order
    pub outputs: Vec<String>,
    pub mutability: Mutability,
}

impl FunctionDescriptor {
    pub fn new(
        name: impl Into<String>,
        inputs: &[&str],
        outputs: &[&str],
        mutability: Mutability,
    ) -> Self {
        Self {
            name: name.into(),
            inputs: inputs.iter().map(|t| canonical_type(t)).collect(),
            outputs: outputs.iter().map(|t| canonical_type(t)).collect(),
            mutability,
        }
    }

    pub fn kind(&self) -> FunctionKind {
        if self.mutability.is_read_only() {
            FunctionKind::Read
        } else {
            FunctionKind::Write
        }
    }

    /// Canonical signature, e.g. `donations(address)`
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.inputs.join(","))
    }

    /// First four bytes of the signature hash
    pub fn selector(&self) -> FixedBytes<4> {
        FixedBytes::from_slice(&keccak256(self.signature().as_bytes())[..4])
    }

    pub fn takes_no_arguments(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn takes_single_address(&self) -> bool {
        matches!(self.inputs.as_slice(), [ty] if ty == "address")
    }

    pub fn takes_single_numeric(&self) -> bool {
        matches!(self.inputs.as_slice(), [ty] if is_numeric_type(ty))
    }

    pub fn returns_single_numeric(&self) -> bool {
        matches!(self.outputs.as_slice(), [ty] if is_numeric_type(ty))
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// `uint`, `uint8` .. `uint256`; arrays and signed integers are not amounts
pub fn is_numeric_type(ty: &str) -> bool {
    ty.strip_prefix("uint")
        .is_some_and(|bits| bits.bytes().all(|b| b.is_ascii_digit()))
}

/// Canonical form of a Solidity type as used in signatures
///
/// `uint`/`int` aliases become `uint256`/`int256`, including inside tuples and
/// ahead of array suffixes.
pub fn canonical_type(ty: &str) -> String {
    let ty = ty.trim();
    if let Some(rest) = ty.strip_prefix('(') {
        let mut depth = 1usize;
        let close = rest.char_indices().find_map(|(i, c)| {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            (depth == 0).then_some(i)
        });
        let Some(close) = close else {
            return ty.to_string();
        };
        let components: Vec<String> = split_components(&rest[..close])
            .into_iter()
            .map(canonical_type)
            .collect();
        return format!("({}){}", components.join(","), &rest[close + 1..]);
    }

    let (base, suffix) = ty.split_at(ty.find('[').unwrap_or(ty.len()));
    let base = match base {
        "uint" => "uint256",
        "int" => "int256",
        other => other,
    };
    format!("{base}{suffix}")
}

/// Split a tuple body on its top-level commas
fn split_components(body: &str) -> Vec<&str> {
    if body.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

/// Encode `value` as an argument of the unsigned integer type `ty`
pub fn uint_arg(ty: &str, value: U256) -> Result<DynSolValue> {
    let parsed: DynSolType = ty
        .parse()
        .with_context(|| format!("Unsupported ABI type {ty}"))?;
    let DynSolType::Uint(bits) = parsed else {
        bail!("{ty} is not an unsigned integer type");
    };
    ensure!(value.bit_len() <= bits, "{value} does not fit in {ty}");
    Ok(DynSolValue::Uint(value, bits))
}

/// Ordered set of function descriptors, unique by signature
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbiDescription {
    functions: Vec<FunctionDescriptor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    #[serde(rename = "type", default = "function_item")]
    item_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    outputs: Vec<RawParam>,
    state_mutability: Option<Mutability>,
    // Pre-0.5 compilers emit these instead of stateMutability
    #[serde(default)]
    constant: bool,
    #[serde(default)]
    payable: bool,
}

#[derive(Debug, Deserialize)]
struct RawParam {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    components: Vec<RawParam>,
}

impl RawParam {
    /// Expand `tuple` tags from their components
    fn canonical(&self) -> String {
        match self.ty.strip_prefix("tuple") {
            Some(suffix) => {
                let components: Vec<String> =
                    self.components.iter().map(RawParam::canonical).collect();
                format!("({}){}", components.join(","), suffix)
            }
            None => canonical_type(&self.ty),
        }
    }
}

fn function_item() -> String {
    "function".to_string()
}

impl RawItem {
    fn into_descriptor(self) -> FunctionDescriptor {
        let mutability = self.state_mutability.unwrap_or(match (self.constant, self.payable) {
            (true, _) => Mutability::View,
            (false, true) => Mutability::Payable,
            (false, false) => Mutability::NonPayable,
        });
        FunctionDescriptor {
            name: self.name,
            inputs: self.inputs.iter().map(RawParam::canonical).collect(),
            outputs: self.outputs.iter().map(RawParam::canonical).collect(),
            mutability,
        }
    }
}

impl AbiDescription {
    /// Build from descriptors, rejecting duplicate signatures
    pub fn new(functions: Vec<FunctionDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for function in &functions {
            ensure!(
                seen.insert(function.signature()),
                "Duplicate ABI function {}",
                function
            );
        }
        Ok(Self { functions })
    }

    /// Parse a JSON ABI: either a bare array or a compiler artifact with an `abi` field.
    /// Constructors, events, errors, fallback and receive entries are skipped.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json).context("Invalid ABI JSON")?;
        let items = match value {
            array @ serde_json::Value::Array(_) => array,
            serde_json::Value::Object(mut artifact) => artifact
                .remove("abi")
                .context("ABI artifact has no `abi` field")?,
            _ => bail!("ABI JSON must be an array or an artifact object"),
        };

        let items: Vec<RawItem> =
            serde_json::from_value(items).context("Failed to parse ABI entries")?;

        Self::new(
            items
                .into_iter()
                .filter(|item| item.item_type == "function")
                .map(RawItem::into_descriptor)
                .collect(),
        )
    }

    /// Read and parse an ABI JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ABI file {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Descriptors in ABI order
    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    /// Descriptors with the given name, in ABI order
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FunctionDescriptor> {
        self.functions.iter().filter(move |f| f.name == name)
    }
}

/// A fully bound contract call: function, arguments, and execution context
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub function: FunctionDescriptor,
    /// Positional arguments
    pub args: Vec<DynSolValue>,
    /// Simulated `msg.sender` for reads. Not a positional argument.
    pub sender: Option<Address>,
    /// Value attached to a transaction
    pub value: U256,
}

impl Invocation {
    pub fn new(function: FunctionDescriptor) -> Self {
        Self {
            function,
            args: Vec::new(),
            sender: None,
            value: U256::ZERO,
        }
    }

    pub fn with_arg(mut self, arg: DynSolValue) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Selector followed by the ABI-encoded arguments
    pub fn calldata(&self) -> Result<Bytes> {
        ensure!(
            self.args.len() == self.function.inputs.len(),
            "{} expects {} argument(s), got {}",
            self.function,
            self.function.inputs.len(),
            self.args.len()
        );
        for (ty, arg) in self.function.inputs.iter().zip(&self.args) {
            let expected: DynSolType = ty
                .parse()
                .with_context(|| format!("Unsupported ABI type {ty}"))?;
            ensure!(
                expected.matches(arg),
                "Argument {:?} does not match {} in {}",
                arg,
                ty,
                self.function
            );
        }

        let mut data = self.function.selector().to_vec();
        data.extend(DynSolValue::Tuple(self.args.clone()).abi_encode_params());
        Ok(data.into())
    }

    pub fn call_request(&self, to: Address) -> Result<CallRequest> {
        let request = CallRequest::new(to, self.calldata()?);
        Ok(match self.sender {
            Some(sender) => request.with_sender(sender),
            None => request,
        })
    }

    pub fn tx_request(&self, to: Address) -> Result<TxRequest> {
        Ok(TxRequest::new(to, self.calldata()?).with_value(self.value))
    }

    /// Decode the single numeric output of a read
    pub fn decode_amount(&self, raw: &[u8]) -> Result<U256> {
        ensure!(
            self.function.returns_single_numeric(),
            "{} does not return a single unsigned integer",
            self.function
        );
        let ty: DynSolType = self.function.outputs[0]
            .parse()
            .with_context(|| format!("Unsupported ABI type {}", self.function.outputs[0]))?;
        let decoded = ty
            .abi_decode(raw)
            .with_context(|| format!("Failed to decode {} output", self.function))?;
        decoded
            .as_uint()
            .map(|(value, _)| value)
            .with_context(|| format!("{} returned a non-integer", self.function))
    }
}
