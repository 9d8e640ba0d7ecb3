//! Fill and approval bookkeeping.
//!
//! Orders are never stored; only `(maker, hash) -> fill` and
//! `(approver, hash) -> approved` persist between matches. The ledger
//! serializes as two sorted record lists so exports are stable.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LedgerRecords", into = "LedgerRecords")]
pub struct ExchangeLedger {
	fills: HashMap<(Address, B256), U256>,
	approvals: HashSet<(Address, B256)>,
}

impl ExchangeLedger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fill(&self, maker: Address, hash: B256) -> U256 {
		self.fills.get(&(maker, hash)).copied().unwrap_or_default()
	}

	/// Records a fill; zero clears the entry.
	pub fn set_fill(&mut self, maker: Address, hash: B256, fill: U256) {
		if fill.is_zero() {
			self.fills.remove(&(maker, hash));
		} else {
			self.fills.insert((maker, hash), fill);
		}
	}

	pub fn is_approved(&self, approver: Address, hash: B256) -> bool {
		self.approvals.contains(&(approver, hash))
	}

	/// Marks a hash approved. Returns `false` if it already was.
	pub fn approve(&mut self, approver: Address, hash: B256) -> bool {
		self.approvals.insert((approver, hash))
	}

	pub fn fill_count(&self) -> usize {
		self.fills.len()
	}

	pub fn approval_count(&self) -> usize {
		self.approvals.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fills.is_empty() && self.approvals.is_empty()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FillRecord {
	pub maker: Address,
	pub hash: B256,
	pub fill: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApprovalRecord {
	pub approver: Address,
	pub hash: B256,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerRecords {
	#[serde(default)]
	fills: Vec<FillRecord>,
	#[serde(default)]
	approvals: Vec<ApprovalRecord>,
}

impl From<LedgerRecords> for ExchangeLedger {
	fn from(records: LedgerRecords) -> Self {
		let mut ledger = ExchangeLedger::new();
		for record in records.fills {
			ledger.set_fill(record.maker, record.hash, record.fill);
		}
		for record in records.approvals {
			ledger.approve(record.approver, record.hash);
		}
		ledger
	}
}

impl From<ExchangeLedger> for LedgerRecords {
	fn from(ledger: ExchangeLedger) -> Self {
		let mut fills: Vec<FillRecord> = ledger
			.fills
			.into_iter()
			.map(|((maker, hash), fill)| FillRecord { maker, hash, fill })
			.collect();
		fills.sort();

		let mut approvals: Vec<ApprovalRecord> = ledger
			.approvals
			.into_iter()
			.map(|(approver, hash)| ApprovalRecord { approver, hash })
			.collect();
		approvals.sort();

		LedgerRecords { fills, approvals }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_zero_fill_clears_entry() {
		let mut ledger = ExchangeLedger::new();
		let maker = Address::repeat_byte(1);
		let hash = B256::repeat_byte(2);

		ledger.set_fill(maker, hash, U256::from(3));
		assert_eq!(ledger.fill(maker, hash), U256::from(3));
		ledger.set_fill(maker, hash, U256::ZERO);
		assert_eq!(ledger.fill_count(), 0);
		assert!(ledger.is_empty());
	}

	#[test]
	fn test_approve_once() {
		let mut ledger = ExchangeLedger::new();
		let approver = Address::repeat_byte(1);
		let hash = B256::repeat_byte(2);
		assert!(ledger.approve(approver, hash));
		assert!(!ledger.approve(approver, hash));
		assert!(ledger.is_approved(approver, hash));
		assert!(!ledger.is_approved(Address::repeat_byte(3), hash));
	}

	#[test]
	fn test_json_export_is_sorted_and_restorable() {
		let mut ledger = ExchangeLedger::new();
		ledger.set_fill(Address::repeat_byte(2), B256::repeat_byte(1), U256::from(5));
		ledger.set_fill(Address::repeat_byte(1), B256::repeat_byte(9), U256::from(1));
		ledger.approve(Address::repeat_byte(3), B256::repeat_byte(4));

		let json = serde_json::to_value(&ledger).unwrap();
		let fills = json["fills"].as_array().unwrap();
		assert_eq!(fills.len(), 2);
		assert_eq!(
			fills[0]["maker"],
			serde_json::json!(Address::repeat_byte(1).to_string())
		);
		assert_eq!(json["approvals"].as_array().unwrap().len(), 1);

		let restored: ExchangeLedger = serde_json::from_value(json).unwrap();
		assert_eq!(restored, ledger);
	}

	#[test]
	fn test_missing_sections_default_to_empty() {
		let ledger: ExchangeLedger = serde_json::from_str("{}").unwrap();
		assert!(ledger.is_empty());
	}
}
