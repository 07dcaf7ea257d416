use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::database::sql_type_wrapper::BulkSqlTypeWrapper;

/// Operation applied to a column when two rows share a key, both in memory and in the
/// `ON DUPLICATE KEY UPDATE` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeOperation {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `=` keeps the incoming value
    Overwrite,
}

/// Operator symbols accepted in configuration.
pub const VALID_OPERATION_SYMBOLS: &[&str] = &["+", "-", "*", "/", "%", "="];

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Invalid merge operation '{0}', expected one of + - * / % =")]
pub struct InvalidMergeOperation(pub String);

impl FromStr for MergeOperation {
    type Err = InvalidMergeOperation;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        match symbol.trim() {
            "+" => Ok(MergeOperation::Add),
            "-" => Ok(MergeOperation::Subtract),
            "*" => Ok(MergeOperation::Multiply),
            "/" => Ok(MergeOperation::Divide),
            "%" => Ok(MergeOperation::Modulo),
            "=" => Ok(MergeOperation::Overwrite),
            other => Err(InvalidMergeOperation(other.to_string())),
        }
    }
}

impl fmt::Display for MergeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MergeError {
    #[error("Merge type mismatch on column {column}: can not apply '{operation}' to {current} and {incoming}")]
    TypeMismatch {
        column: String,
        operation: MergeOperation,
        current: &'static str,
        incoming: &'static str,
    },

    #[error("Division by zero merging column {column} with '{operation}'")]
    DivisionByZero { column: String, operation: MergeOperation },

    #[error("Numeric overflow merging column {column} with '{operation}'")]
    Overflow { column: String, operation: MergeOperation },
}

impl MergeOperation {
    pub fn as_symbol(&self) -> &'static str {
        match self {
            MergeOperation::Add => "+",
            MergeOperation::Subtract => "-",
            MergeOperation::Multiply => "*",
            MergeOperation::Divide => "/",
            MergeOperation::Modulo => "%",
            MergeOperation::Overwrite => "=",
        }
    }

    /// Combines the merged value held for a key with the value of a later duplicate.
    ///
    /// Integer division and modulo floor towards negative infinity. Any float operand promotes
    /// the whole operation to float. Everything except `Overwrite` requires numeric operands.
    pub fn apply(
        &self,
        column: &str,
        current: &BulkSqlTypeWrapper,
        incoming: &BulkSqlTypeWrapper,
    ) -> Result<BulkSqlTypeWrapper, MergeError> {
        if *self == MergeOperation::Overwrite {
            return Ok(incoming.clone());
        }

        match (current, incoming) {
            (BulkSqlTypeWrapper::Int(a), BulkSqlTypeWrapper::Int(b)) => {
                self.apply_int(column, *a, *b).map(BulkSqlTypeWrapper::Int)
            }
            (a, b) if a.is_numeric() && b.is_numeric() => {
                self.apply_float(column, as_f64(a), as_f64(b)).map(BulkSqlTypeWrapper::Float)
            }
            _ => Err(MergeError::TypeMismatch {
                column: column.to_string(),
                operation: *self,
                current: current.type_name(),
                incoming: incoming.type_name(),
            }),
        }
    }

    fn apply_int(&self, column: &str, a: i64, b: i64) -> Result<i64, MergeError> {
        let result = match self {
            MergeOperation::Add => a.checked_add(b),
            MergeOperation::Subtract => a.checked_sub(b),
            MergeOperation::Multiply => a.checked_mul(b),
            MergeOperation::Divide | MergeOperation::Modulo if b == 0 => {
                return Err(MergeError::DivisionByZero {
                    column: column.to_string(),
                    operation: *self,
                });
            }
            MergeOperation::Divide => a.checked_div(b).map(|q| {
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            }),
            MergeOperation::Modulo => a.checked_rem(b).map(|r| {
                if r != 0 && ((r < 0) != (b < 0)) {
                    r + b
                } else {
                    r
                }
            }),
            MergeOperation::Overwrite => Some(b),
        };

        result.ok_or_else(|| MergeError::Overflow { column: column.to_string(), operation: *self })
    }

    fn apply_float(&self, column: &str, a: f64, b: f64) -> Result<f64, MergeError> {
        let result = match self {
            MergeOperation::Add => a + b,
            MergeOperation::Subtract => a - b,
            MergeOperation::Multiply => a * b,
            MergeOperation::Divide | MergeOperation::Modulo if b == 0.0 => {
                return Err(MergeError::DivisionByZero {
                    column: column.to_string(),
                    operation: *self,
                });
            }
            MergeOperation::Divide => a / b,
            MergeOperation::Modulo => {
                let r = a % b;
                if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                    r + b
                } else {
                    r
                }
            }
            MergeOperation::Overwrite => b,
        };

        if result.is_finite() {
            Ok(result)
        } else {
            Err(MergeError::Overflow { column: column.to_string(), operation: *self })
        }
    }
}

fn as_f64(value: &BulkSqlTypeWrapper) -> f64 {
    match value {
        BulkSqlTypeWrapper::Int(i) => *i as f64,
        BulkSqlTypeWrapper::Float(f) => *f,
        _ => f64::NAN,
    }
}

/// A validated `column,operation` pair, kept in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKeyOperation {
    pub column: String,
    pub column_index: usize,
    pub operation: MergeOperation,
}

/// How rows sharing an aggregate key are folded together within one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSpec {
    pub aggregate_key_column_indexes: Vec<usize>,
    pub operations_by_column_index: BTreeMap<usize, MergeOperation>,
}

impl MergeSpec {
    pub fn new(
        aggregate_key_column_indexes: Vec<usize>,
        operations: &[DuplicateKeyOperation],
    ) -> Self {
        let operations_by_column_index =
            operations.iter().map(|op| (op.column_index, op.operation)).collect();

        MergeSpec { aggregate_key_column_indexes, operations_by_column_index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> BulkSqlTypeWrapper {
        BulkSqlTypeWrapper::Int(i)
    }

    #[test]
    fn test_parse_every_valid_symbol() {
        for symbol in VALID_OPERATION_SYMBOLS {
            let operation: MergeOperation = symbol.parse().unwrap();
            assert_eq!(operation.as_symbol(), *symbol);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_symbol() {
        assert_eq!("^".parse::<MergeOperation>(), Err(InvalidMergeOperation("^".to_string())));
        assert!("".parse::<MergeOperation>().is_err());
        assert!("++".parse::<MergeOperation>().is_err());
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(MergeOperation::Add.apply("c", &int(1), &int(3)), Ok(int(4)));
        assert_eq!(MergeOperation::Subtract.apply("c", &int(1), &int(3)), Ok(int(-2)));
        assert_eq!(MergeOperation::Multiply.apply("c", &int(4), &int(3)), Ok(int(12)));
        assert_eq!(MergeOperation::Divide.apply("c", &int(7), &int(2)), Ok(int(3)));
        assert_eq!(MergeOperation::Modulo.apply("c", &int(7), &int(2)), Ok(int(1)));
    }

    #[test]
    fn test_integer_division_floors() {
        assert_eq!(MergeOperation::Divide.apply("c", &int(-7), &int(2)), Ok(int(-4)));
        assert_eq!(MergeOperation::Divide.apply("c", &int(7), &int(-2)), Ok(int(-4)));
        assert_eq!(MergeOperation::Modulo.apply("c", &int(-7), &int(2)), Ok(int(1)));
        assert_eq!(MergeOperation::Modulo.apply("c", &int(7), &int(-2)), Ok(int(-1)));
    }

    #[test]
    fn test_mixed_numeric_promotes_to_float() {
        let result = MergeOperation::Add.apply("c", &int(1), &BulkSqlTypeWrapper::Float(0.5));
        assert_eq!(result, Ok(BulkSqlTypeWrapper::Float(1.5)));

        let result = MergeOperation::Divide
            .apply("c", &BulkSqlTypeWrapper::Float(7.0), &int(2));
        assert_eq!(result, Ok(BulkSqlTypeWrapper::Float(3.5)));
    }

    #[test]
    fn test_overwrite_takes_incoming_of_any_type() {
        let result = MergeOperation::Overwrite.apply("c", &int(1), &"new".into());
        assert_eq!(result, Ok(BulkSqlTypeWrapper::from("new")));

        let result = MergeOperation::Overwrite.apply("c", &int(1), &BulkSqlTypeWrapper::Null);
        assert_eq!(result, Ok(BulkSqlTypeWrapper::Null));
    }

    #[test]
    fn test_non_numeric_is_type_mismatch() {
        let result = MergeOperation::Add.apply("name", &"a".into(), &"b".into());
        assert_eq!(
            result,
            Err(MergeError::TypeMismatch {
                column: "name".to_string(),
                operation: MergeOperation::Add,
                current: "string",
                incoming: "string",
            })
        );

        let result = MergeOperation::Add.apply("count", &int(1), &BulkSqlTypeWrapper::Null);
        assert!(matches!(result, Err(MergeError::TypeMismatch { .. })));
    }

    #[test]
    fn test_division_by_zero() {
        let result = MergeOperation::Divide.apply("c", &int(1), &int(0));
        assert!(matches!(result, Err(MergeError::DivisionByZero { .. })));

        let result = MergeOperation::Modulo
            .apply("c", &BulkSqlTypeWrapper::Float(1.0), &BulkSqlTypeWrapper::Float(0.0));
        assert!(matches!(result, Err(MergeError::DivisionByZero { .. })));
    }

    #[test]
    fn test_overflow() {
        let result = MergeOperation::Add.apply("c", &int(i64::MAX), &int(1));
        assert!(matches!(result, Err(MergeError::Overflow { .. })));

        let result = MergeOperation::Divide.apply("c", &int(i64::MIN), &int(-1));
        assert!(matches!(result, Err(MergeError::Overflow { .. })));
    }

    #[test]
    fn test_merge_spec_from_operations() {
        let operations = vec![
            DuplicateKeyOperation {
                column: "count".to_string(),
                column_index: 1,
                operation: MergeOperation::Add,
            },
            DuplicateKeyOperation {
                column: "last_seen".to_string(),
                column_index: 2,
                operation: MergeOperation::Overwrite,
            },
        ];

        let spec = MergeSpec::new(vec![0], &operations);

        assert_eq!(spec.aggregate_key_column_indexes, vec![0]);
        assert_eq!(spec.operations_by_column_index.get(&1), Some(&MergeOperation::Add));
        assert_eq!(spec.operations_by_column_index.get(&2), Some(&MergeOperation::Overwrite));
    }
}
