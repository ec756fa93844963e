//! Solidity ABI encoding of constructor arguments and configuration calls.

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Bytes, keccak256},
};
use anyhow::{Context, Result};

use crate::plan::AbiValue;

/// ABI-encode a list of values as function parameters (head/tail layout).
pub fn encode_params(args: &[AbiValue]) -> Vec<u8> {
    if args.is_empty() {
        return Vec::new();
    }
    DynSolValue::Tuple(args.iter().map(DynSolValue::from).collect()).abi_encode_params()
}

/// Contract creation payload: bytecode followed by the encoded constructor arguments.
pub fn encode_deployment(bytecode: &[u8], args: &[AbiValue]) -> Bytes {
    let mut init_code = bytecode.to_vec();
    init_code.extend(encode_params(args));
    init_code.into()
}

/// First four bytes of the keccak256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Parameter types of a signature such as `setAuthorized(address,bool)`.
///
/// `None` if the signature has no name or unbalanced parentheses.
pub(crate) fn parameter_types(signature: &str) -> Option<Vec<&str>> {
    let open = signature.find('(')?;
    let inner = signature[open + 1..].strip_suffix(')')?;
    if open == 0 || inner.contains(['(', ')']) {
        return None;
    }

    if inner.is_empty() {
        return Some(Vec::new());
    }
    Some(inner.split(',').map(str::trim).collect())
}

/// Calldata for `signature` applied to `args`.
///
/// The argument types must match the signature exactly, otherwise the call
/// would silently hit the wrong function or decode garbage.
pub fn encode_call(signature: &str, args: &[AbiValue]) -> Result<Bytes> {
    let types = parameter_types(signature)
        .with_context(|| format!("Invalid function signature '{}'", signature))?;
    let actual: Vec<&str> = args.iter().map(AbiValue::sol_type).collect();
    if types != actual {
        anyhow::bail!(
            "Arguments ({}) do not match function signature '{}'",
            actual.join(","),
            signature
        );
    }

    let mut calldata = selector(signature).to_vec();
    calldata.extend(encode_params(args));
    Ok(calldata.into())
}
