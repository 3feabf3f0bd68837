use serde::{Deserialize, Serialize};

use crate::{Error, Operation};

/// Gas units of a batch operation. The first two items are covered by `min`, every
/// additional item costs `increment`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BatchGasUnits {
    pub min: u64,
    pub increment: u64,
}

impl BatchGasUnits {
    pub fn gas_units(&self, batch_size: Option<u32>) -> u64 {
        let additional_items = match batch_size {
            Some(size) if size >= 2 => u64::from(size - 2),
            _ => 0,
        };

        self.min.saturating_add(self.increment.saturating_mul(additional_items))
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OperationGasUnits {
    #[serde(rename = "createToken")]
    pub create_token: u64,

    #[serde(rename = "safeTransferFrom")]
    pub transfer: u64,

    pub mint: u64,
    pub burn: u64,

    #[serde(rename = "safeAdjustedBatchTransferFrom")]
    pub batch_transfer: BatchGasUnits,

    #[serde(rename = "mintBatch")]
    pub batch_mint: BatchGasUnits,

    #[serde(rename = "burnBatch")]
    pub batch_burn: BatchGasUnits,
}

/// Versioned gas unit cost of every [`Operation`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasUnitTable {
    pub version: u32,
    pub operations: OperationGasUnits,
}

/// Placeholder measurements. Deployments load the table matching their contract with
/// [`GasUnitTable::from_json`].
impl Default for GasUnitTable {
    fn default() -> Self {
        Self {
            version: 1,
            operations: OperationGasUnits {
                create_token: 144_884,
                transfer: 58_873,
                mint: 40_146,
                burn: 33_517,
                batch_transfer: BatchGasUnits {
                    min: 88_393,
                    increment: 25_430,
                },
                batch_mint: BatchGasUnits {
                    min: 71_224,
                    increment: 24_017,
                },
                batch_burn: BatchGasUnits {
                    min: 46_992,
                    increment: 5_460,
                },
            },
        }
    }
}

impl GasUnitTable {
    /// Loads a table from its JSON form. Every operation must be present.
    pub fn from_json(value: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(value)?)
    }

    /// Batch size is only meaningful for batch operations and is ignored otherwise.
    pub fn gas_units(&self, operation: Operation, batch_size: Option<u32>) -> u64 {
        let operations = &self.operations;

        match operation {
            Operation::CreateToken => operations.create_token,
            Operation::Transfer => operations.transfer,
            Operation::Mint => operations.mint,
            Operation::Burn => operations.burn,
            Operation::BatchTransfer => operations.batch_transfer.gas_units(batch_size),
            Operation::BatchMint => operations.batch_mint.gas_units(batch_size),
            Operation::BatchBurn => operations.batch_burn.gas_units(batch_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_formula_applies_after_two_items() {
        let table = GasUnitTable::default();

        for batch_size in 2..100u32 {
            assert_eq!(
                table.gas_units(Operation::BatchMint, Some(batch_size)),
                71_224 + 24_017 * u64::from(batch_size - 2)
            );
        }
    }

    #[test]
    fn small_or_missing_batch_size_costs_min() {
        let table = GasUnitTable::default();

        assert_eq!(table.gas_units(Operation::BatchBurn, None), 46_992);
        assert_eq!(table.gas_units(Operation::BatchBurn, Some(0)), 46_992);
        assert_eq!(table.gas_units(Operation::BatchBurn, Some(1)), 46_992);
        assert_eq!(table.gas_units(Operation::BatchBurn, Some(2)), 46_992);
        assert_eq!(table.gas_units(Operation::BatchBurn, Some(3)), 46_992 + 5_460);
    }

    #[test]
    fn batch_size_is_ignored_for_single_operations() {
        let table = GasUnitTable::default();

        assert_eq!(table.gas_units(Operation::Transfer, Some(50)), 58_873);
        assert_eq!(table.gas_units(Operation::CreateToken, None), 144_884);
    }

    #[test]
    fn huge_batch_saturates() {
        let table = GasUnitTable {
            version: 1,
            operations: OperationGasUnits {
                batch_transfer: BatchGasUnits {
                    min: 1,
                    increment: u64::MAX,
                },
                ..GasUnitTable::default().operations
            },
        };

        assert_eq!(table.gas_units(Operation::BatchTransfer, Some(u32::MAX)), u64::MAX);
    }

    #[test]
    fn table_is_loaded_from_json() {
        let table = GasUnitTable::from_json(
            r#"{
                "version": 2,
                "operations": {
                    "createToken": 1,
                    "safeTransferFrom": 2,
                    "mint": 3,
                    "burn": 4,
                    "safeAdjustedBatchTransferFrom": { "min": 5, "increment": 6 },
                    "mintBatch": { "min": 7, "increment": 8 },
                    "burnBatch": { "min": 9, "increment": 10 }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(table.version, 2);
        assert_eq!(table.gas_units(Operation::Burn, None), 4);
        assert_eq!(table.gas_units(Operation::BatchTransfer, Some(4)), 5 + 6 * 2);
    }

    #[test]
    fn incomplete_table_is_rejected() {
        let result = GasUnitTable::from_json(r#"{ "version": 2, "operations": { "createToken": 1 } }"#);

        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn default_table_survives_serialization() {
        let table = GasUnitTable::default();

        let json = serde_json::to_string(&table).unwrap();

        assert_eq!(GasUnitTable::from_json(&json).unwrap(), table);
    }
}
