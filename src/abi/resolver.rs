//! Picks the ABI function that serves each semantic operation
//!
//! The exact names on the deployed contract are not known ahead of time, so each
//! [`Intent`] has an ordered table of rules. A rule is a pure function over the
//! ABI; the first rule that finds a match wins.

use super::{AbiDescription, FunctionDescriptor};
use std::fmt;

/// Conventional names for the aggregate total, highest precedence first
pub const AGGREGATE_NAMES: [&str; 6] = [
    "totalDonations",
    "total",
    "getTotal",
    "getTotalDonations",
    "totalRaised",
    "totalPot",
];

/// Conventional names for per-account reads taking the account as an argument
pub const ACCOUNT_ARGUMENT_NAMES: [&str; 7] = [
    "donations",
    "deposits",
    "balances",
    "userDonations",
    "getDonation",
    "getDeposits",
    "getBalance",
];

/// Conventional names for per-account reads keyed on `msg.sender`
pub const SENDER_OVERRIDE_NAMES: [&str; 5] = [
    "getMyDeposit",
    "myDeposit",
    "getMyDonation",
    "myDonation",
    "mine",
];

/// The only accepted name for the write
pub const DONATE_NAME: &str = "donate";

/// A semantic operation the client needs a contract function for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Read the aggregate total held by the contract
    AggregateTotal,
    /// Read the value attributed to one account
    AccountValue,
    /// Transfer an amount to the contract
    Donate,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AggregateTotal => "the aggregate total (e.g. totalDonations())",
            Self::AccountValue => "the per-account value (e.g. donations(address) or getMyDeposit())",
            Self::Donate => "donations (donate)",
        })
    }
}

/// Where the donated amount goes in the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountEncoding {
    /// `donate()`: attached value only
    ValueOnly,
    /// `donate(uint) payable`: both the argument and the attached value
    ArgumentAndValue,
    /// `donate(uint)` non-payable: the argument only, nothing attached
    ArgumentOnly,
}

/// Calling convention of a resolved function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Called with no arguments
    NoArguments,
    /// The account is the single positional argument
    AccountArgument,
    /// Called with no arguments while simulating the account as `msg.sender`
    SenderOverride,
    /// Donation write
    Donation(AmountEncoding),
}

/// A function selected for an intent together with how to call it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub function: FunctionDescriptor,
    pub binding: Binding,
}

impl Resolved {
    fn new(function: &FunctionDescriptor, binding: Binding) -> Self {
        Self {
            function: function.clone(),
            binding,
        }
    }
}

type Rule = fn(&AbiDescription) -> Option<Resolved>;

const AGGREGATE_RULES: &[Rule] = &[aggregate_by_name, aggregate_by_shape];
const ACCOUNT_RULES: &[Rule] = &[account_by_name, account_by_shape, sender_override_by_name];
const DONATE_RULES: &[Rule] = &[donate_by_name];

fn rules(intent: Intent) -> &'static [Rule] {
    match intent {
        Intent::AggregateTotal => AGGREGATE_RULES,
        Intent::AccountValue => ACCOUNT_RULES,
        Intent::Donate => DONATE_RULES,
    }
}

/// Resolve `intent` against `abi`; `None` means the ABI does not fit this client
pub fn resolve(abi: &AbiDescription, intent: Intent) -> Option<Resolved> {
    rules(intent).iter().find_map(|rule| rule(abi))
}

/// First allow-listed name (in list order) with an acceptable shape
fn first_named<'a>(
    abi: &'a AbiDescription,
    names: &[&'static str],
    shape: fn(&FunctionDescriptor) -> bool,
) -> Option<&'a FunctionDescriptor> {
    names.iter().find_map(|name| {
        abi.named(*name)
            .find(|f| shape(f) && f.returns_single_numeric())
    })
}

/// First read-only function (in ABI order) with an acceptable shape
fn first_view<'a>(
    abi: &'a AbiDescription,
    shape: fn(&FunctionDescriptor) -> bool,
) -> Option<&'a FunctionDescriptor> {
    abi.functions()
        .iter()
        .find(|f| f.mutability.is_read_only() && shape(f) && f.returns_single_numeric())
}

fn aggregate_by_name(abi: &AbiDescription) -> Option<Resolved> {
    first_named(abi, &AGGREGATE_NAMES, FunctionDescriptor::takes_no_arguments)
        .map(|f| Resolved::new(f, Binding::NoArguments))
}

fn aggregate_by_shape(abi: &AbiDescription) -> Option<Resolved> {
    first_view(abi, FunctionDescriptor::takes_no_arguments)
        .map(|f| Resolved::new(f, Binding::NoArguments))
}

fn account_by_name(abi: &AbiDescription) -> Option<Resolved> {
    first_named(abi, &ACCOUNT_ARGUMENT_NAMES, FunctionDescriptor::takes_single_address)
        .map(|f| Resolved::new(f, Binding::AccountArgument))
}

fn account_by_shape(abi: &AbiDescription) -> Option<Resolved> {
    first_view(abi, FunctionDescriptor::takes_single_address)
        .map(|f| Resolved::new(f, Binding::AccountArgument))
}

fn sender_override_by_name(abi: &AbiDescription) -> Option<Resolved> {
    first_named(abi, &SENDER_OVERRIDE_NAMES, FunctionDescriptor::takes_no_arguments)
        .map(|f| Resolved::new(f, Binding::SenderOverride))
}

fn donate_by_name(abi: &AbiDescription) -> Option<Resolved> {
    abi.named(DONATE_NAME).find_map(|f| {
        let encoding = match f.inputs.len() {
            0 => AmountEncoding::ValueOnly,
            1 if !f.takes_single_numeric() => return None,
            1 if f.mutability == super::Mutability::Payable => AmountEncoding::ArgumentAndValue,
            1 => AmountEncoding::ArgumentOnly,
            _ => return None,
        };
        Some(Resolved::new(f, Binding::Donation(encoding)))
    })
}
