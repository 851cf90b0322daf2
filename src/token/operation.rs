//! Named operations and queries
//!
//! The serializable form of the ledger interface. A transport or a script
//! runner decodes requests into [`Operation`] / [`Query`] values and hands
//! them to the ledger; the stable names match the token's public ABI.

use crate::token::callback::SpenderRegistry;
use crate::token::error::LedgerError;
use crate::token::events::EventRecord;
use crate::token::ledger::Ledger;
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A state-changing request
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    Transfer {
        caller: Address,
        to: Address,
        amount: U256,
    },
    Approve {
        caller: Address,
        spender: Address,
        amount: U256,
    },
    TransferFrom {
        caller: Address,
        from: Address,
        to: Address,
        amount: U256,
    },
    Burn {
        caller: Address,
        amount: U256,
    },
    BurnFrom {
        caller: Address,
        from: Address,
        amount: U256,
    },
    ApproveAndCall {
        caller: Address,
        spender: Address,
        amount: U256,
        #[serde(default, rename = "extraData")]
        extra_data: Bytes,
    },
}

/// Outcome of a committed operation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    /// Stable name of the operation
    pub operation: String,
    /// Events emitted while applying it, in order
    pub events: Vec<EventRecord>,
}

impl Operation {
    /// Stable name of the operation
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Transfer { .. } => "transfer",
            Operation::Approve { .. } => "approve",
            Operation::TransferFrom { .. } => "transferFrom",
            Operation::Burn { .. } => "burn",
            Operation::BurnFrom { .. } => "burnFrom",
            Operation::ApproveAndCall { .. } => "approveAndCall",
        }
    }

    /// Account submitting the operation
    pub fn caller(&self) -> Address {
        match self {
            Operation::Transfer { caller, .. }
            | Operation::Approve { caller, .. }
            | Operation::TransferFrom { caller, .. }
            | Operation::Burn { caller, .. }
            | Operation::BurnFrom { caller, .. }
            | Operation::ApproveAndCall { caller, .. } => *caller,
        }
    }

    /// Apply the operation to a ledger
    pub fn apply(
        &self,
        ledger: &mut Ledger,
        spenders: &mut dyn SpenderRegistry,
    ) -> Result<Receipt, LedgerError> {
        let cursor = ledger.events().next_sequence();

        let result = match self {
            Operation::Transfer { caller, to, amount } => {
                ledger.transfer(*caller, *to, *amount).map(|_| ())
            }
            Operation::Approve {
                caller,
                spender,
                amount,
            } => {
                ledger.approve(*caller, *spender, *amount);
                Ok(())
            }
            Operation::TransferFrom {
                caller,
                from,
                to,
                amount,
            } => ledger
                .transfer_from(*caller, *from, *to, *amount)
                .map(|_| ()),
            Operation::Burn { caller, amount } => ledger.burn(*caller, *amount).map(|_| ()),
            Operation::BurnFrom {
                caller,
                from,
                amount,
            } => ledger.burn_from(*caller, *from, *amount).map(|_| ()),
            Operation::ApproveAndCall {
                caller,
                spender,
                amount,
                extra_data,
            } => ledger.approve_and_call(*caller, *spender, *amount, extra_data, spenders),
        };

        if let Err(err) = &result {
            log::debug!("{} from {} rejected: {}", self.name(), self.caller(), err);
        }
        result?;

        Ok(Receipt {
            operation: self.name().to_string(),
            events: ledger.events().since(cursor).to_vec(),
        })
    }
}

/// A read-only request
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "query", rename_all = "camelCase")]
pub enum Query {
    BalanceOf { account: Address },
    Allowance { owner: Address, spender: Address },
    TotalSupply,
    Name,
    Symbol,
    Decimals,
}

/// Answer to a [`Query`]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum QueryResult {
    Amount(U256),
    Text(String),
    Decimals(u8),
}

impl Query {
    /// Evaluate against a ledger
    pub fn evaluate(&self, ledger: &Ledger) -> QueryResult {
        match self {
            Query::BalanceOf { account } => QueryResult::Amount(ledger.balance_of(account)),
            Query::Allowance { owner, spender } => {
                QueryResult::Amount(ledger.allowance(owner, spender))
            }
            Query::TotalSupply => QueryResult::Amount(ledger.total_supply()),
            Query::Name => QueryResult::Text(ledger.name().to_string()),
            Query::Symbol => QueryResult::Text(ledger.symbol().to_string()),
            Query::Decimals => QueryResult::Decimals(ledger.decimals()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::callback::NoContracts;
    use crate::token::events::LedgerEvent;

    fn addr(n: u8) -> Address {
        Address::with_last_byte(n)
    }

    fn create_test_ledger() -> Ledger {
        Ledger::with_supply(U256::from(1_000_000u64), addr(1)).unwrap()
    }

    #[test]
    fn test_apply_transfer_receipt() {
        let mut ledger = create_test_ledger();
        let op = Operation::Transfer {
            caller: addr(1),
            to: addr(2),
            amount: U256::from(100u64),
        };

        let receipt = op.apply(&mut ledger, &mut NoContracts).unwrap();

        assert_eq!(receipt.operation, "transfer");
        assert_eq!(receipt.events.len(), 1);
        assert_eq!(
            receipt.events[0].event,
            LedgerEvent::Transfer {
                from: addr(1),
                to: addr(2),
                value: U256::from(100u64),
            }
        );
    }

    #[test]
    fn test_apply_approve_has_no_events() {
        let mut ledger = create_test_ledger();
        let op = Operation::Approve {
            caller: addr(1),
            spender: addr(2),
            amount: U256::from(7u64),
        };

        let receipt = op.apply(&mut ledger, &mut NoContracts).unwrap();

        assert!(receipt.events.is_empty());
        assert_eq!(ledger.allowance(&addr(1), &addr(2)), U256::from(7u64));
    }

    #[test]
    fn test_apply_rejection_propagates() {
        let mut ledger = create_test_ledger();
        let op = Operation::BurnFrom {
            caller: addr(3),
            from: addr(1),
            amount: U256::from(1u64),
        };

        assert!(matches!(
            op.apply(&mut ledger, &mut NoContracts),
            Err(LedgerError::InsufficientAllowance { .. })
        ));
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_operation_json_names() {
        let json = r#"[
            { "op": "transfer", "caller": "0x0000000000000000000000000000000000000001",
              "to": "0x0000000000000000000000000000000000000002", "amount": "0x64" },
            { "op": "transferFrom", "caller": "0x0000000000000000000000000000000000000003",
              "from": "0x0000000000000000000000000000000000000001",
              "to": "0x0000000000000000000000000000000000000002", "amount": "0x1" },
            { "op": "approveAndCall", "caller": "0x0000000000000000000000000000000000000001",
              "spender": "0x0000000000000000000000000000000000000002", "amount": "0x1",
              "extraData": "0xbeef" },
            { "op": "burnFrom", "caller": "0x0000000000000000000000000000000000000003",
              "from": "0x0000000000000000000000000000000000000001", "amount": "0x1" }
        ]"#;

        let ops: Vec<Operation> = serde_json::from_str(json).unwrap();

        let names: Vec<&str> = ops.iter().map(|op| op.name()).collect();
        assert_eq!(
            names,
            vec!["transfer", "transferFrom", "approveAndCall", "burnFrom"]
        );
        assert_eq!(ops[0].caller(), addr(1));
        match &ops[2] {
            Operation::ApproveAndCall { extra_data, .. } => {
                assert_eq!(extra_data.to_vec(), vec![0xbe, 0xef])
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_queries() {
        let mut ledger = create_test_ledger();
        ledger.approve(addr(1), addr(2), U256::from(5u64));

        assert_eq!(
            Query::BalanceOf { account: addr(1) }.evaluate(&ledger),
            QueryResult::Amount(U256::from(1_000_000u64))
        );
        assert_eq!(
            Query::Allowance {
                owner: addr(1),
                spender: addr(2)
            }
            .evaluate(&ledger),
            QueryResult::Amount(U256::from(5u64))
        );
        assert_eq!(
            Query::TotalSupply.evaluate(&ledger),
            QueryResult::Amount(U256::from(1_000_000u64))
        );
        assert_eq!(
            Query::Name.evaluate(&ledger),
            QueryResult::Text("TriCoin".to_string())
        );
        assert_eq!(
            Query::Symbol.evaluate(&ledger),
            QueryResult::Text("TRI".to_string())
        );
        assert_eq!(Query::Decimals.evaluate(&ledger), QueryResult::Decimals(18));
    }
}
