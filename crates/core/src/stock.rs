//! Quantity arithmetic and the negative-balance guards for edit and move.
//!
//! Nothing here touches the store. Callers read the cells, ask for a plan,
//! and only write when the plan says [`Verdict::Proceed`].

use crate::domain::cell::CellAddress;
use crate::errors::DomainError;
use crate::store::CellValue;

/// A rule that blocked a mutation. Always reported to the user, never raised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardViolation {
    SameLocation,
    NegativeMoveQuantity { quantity: i64 },
    NegativeResult { current: i64, change: i64, would_be: i64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict<P> {
    Proceed(P),
    Blocked(GuardViolation),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditPlan {
    pub old_quantity: i64,
    pub delta: i64,
    pub new_quantity: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovePlan {
    pub quantity: i64,
    pub source_old: i64,
    pub source_new: i64,
    pub destination_old: i64,
    pub destination_new: i64,
}

/// Coerces a raw cell into a quantity. An empty cell counts as zero;
/// anything that is not a whole number is rejected rather than turned into NaN.
pub fn read_quantity(cell: &CellAddress, value: Option<&CellValue>) -> Result<i64, DomainError> {
    let invalid = |raw: String| DomainError::InvalidQuantity { cell: cell.to_string(), value: raw };

    match value {
        None => Ok(0),
        Some(CellValue::Number(number)) => {
            whole_number(*number).ok_or_else(|| invalid(number.to_string()))
        }
        Some(CellValue::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            if let Ok(quantity) = trimmed.parse::<i64>() {
                return Ok(quantity);
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(whole_number)
                .ok_or_else(|| invalid(text.clone()))
        }
        Some(CellValue::Bool(flag)) => Err(invalid(flag.to_string())),
    }
}

fn whole_number(number: f64) -> Option<i64> {
    let in_range = number >= i64::MIN as f64 && number <= i64::MAX as f64;
    (number.is_finite() && number.fract() == 0.0 && in_range).then_some(number as i64)
}

pub fn plan_edit(old_quantity: i64, delta: i64) -> Result<Verdict<EditPlan>, DomainError> {
    let new_quantity = old_quantity.checked_add(delta).ok_or_else(|| {
        DomainError::InvariantViolation(format!("{old_quantity} + {delta} overflows"))
    })?;

    if new_quantity < 0 {
        return Ok(Verdict::Blocked(GuardViolation::NegativeResult {
            current: old_quantity,
            change: delta,
            would_be: new_quantity,
        }));
    }

    Ok(Verdict::Proceed(EditPlan { old_quantity, delta, new_quantity }))
}

/// Guards that need no store read. Checked in order: same location, then
/// negative quantity.
pub fn check_move_request<L: PartialEq>(
    source: &L,
    destination: &L,
    quantity: i64,
) -> Option<GuardViolation> {
    if source == destination {
        return Some(GuardViolation::SameLocation);
    }
    if quantity < 0 {
        return Some(GuardViolation::NegativeMoveQuantity { quantity });
    }
    None
}

pub fn plan_move(
    source_old: i64,
    destination_old: i64,
    quantity: i64,
) -> Result<Verdict<MovePlan>, DomainError> {
    if quantity < 0 {
        return Ok(Verdict::Blocked(GuardViolation::NegativeMoveQuantity { quantity }));
    }

    let source_new = source_old.checked_sub(quantity).ok_or_else(|| {
        DomainError::InvariantViolation(format!("{source_old} - {quantity} overflows"))
    })?;
    if source_new < 0 {
        return Ok(Verdict::Blocked(GuardViolation::NegativeResult {
            current: source_old,
            change: quantity,
            would_be: source_new,
        }));
    }

    let destination_new = destination_old.checked_add(quantity).ok_or_else(|| {
        DomainError::InvariantViolation(format!("{destination_old} + {quantity} overflows"))
    })?;

    Ok(Verdict::Proceed(MovePlan {
        quantity,
        source_old,
        source_new,
        destination_old,
        destination_new,
    }))
}

#[cfg(test)]
mod tests {
    use super::{
        check_move_request, plan_edit, plan_move, read_quantity, EditPlan, GuardViolation,
        MovePlan, Verdict,
    };
    use crate::domain::cell::CellAddress;
    use crate::domain::item::{Item, ItemId};
    use crate::domain::storage::{Storage, StorageId};
    use crate::errors::DomainError;
    use crate::store::CellValue;

    fn b3() -> CellAddress {
        CellAddress::for_stock(
            &Item { id: ItemId("widget".to_owned()), name: "Widget".to_owned(), row: 3 },
            &Storage {
                id: StorageId("warehouse-a".to_owned()),
                name: "Warehouse A".to_owned(),
                column: "B".to_owned(),
            },
        )
    }

    #[test]
    fn empty_cells_read_as_zero() {
        assert_eq!(read_quantity(&b3(), None), Ok(0));
        assert_eq!(read_quantity(&b3(), Some(&CellValue::Text("  ".to_owned()))), Ok(0));
    }

    #[test]
    fn numeric_text_and_numbers_are_coerced() {
        assert_eq!(read_quantity(&b3(), Some(&CellValue::Text(" 10 ".to_owned()))), Ok(10));
        assert_eq!(read_quantity(&b3(), Some(&CellValue::Text("4.0".to_owned()))), Ok(4));
        assert_eq!(read_quantity(&b3(), Some(&CellValue::Number(-2.0))), Ok(-2));
    }

    #[test]
    fn non_numeric_values_are_rejected_instead_of_nan() {
        let error = read_quantity(&b3(), Some(&CellValue::Text("lots".to_owned())))
            .expect_err("text must not coerce");
        assert_eq!(
            error,
            DomainError::InvalidQuantity { cell: "B3".to_owned(), value: "lots".to_owned() }
        );
        assert!(read_quantity(&b3(), Some(&CellValue::Number(2.5))).is_err());
        assert!(read_quantity(&b3(), Some(&CellValue::Number(f64::NAN))).is_err());
        assert!(read_quantity(&b3(), Some(&CellValue::Bool(true))).is_err());
    }

    #[test]
    fn edit_adds_delta_to_current_quantity() {
        assert_eq!(
            plan_edit(10, 5),
            Ok(Verdict::Proceed(EditPlan { old_quantity: 10, delta: 5, new_quantity: 15 }))
        );
        assert_eq!(
            plan_edit(10, -10),
            Ok(Verdict::Proceed(EditPlan { old_quantity: 10, delta: -10, new_quantity: 0 }))
        );
    }

    #[test]
    fn edit_below_zero_is_blocked() {
        assert_eq!(
            plan_edit(10, -20),
            Ok(Verdict::Blocked(GuardViolation::NegativeResult {
                current: 10,
                change: -20,
                would_be: -10,
            }))
        );
    }

    #[test]
    fn edit_overflow_is_an_invariant_violation() {
        assert!(matches!(plan_edit(i64::MAX, 1), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn move_request_guards_run_in_order() {
        assert_eq!(check_move_request(&"a", &"a", -1), Some(GuardViolation::SameLocation));
        assert_eq!(
            check_move_request(&"a", &"b", -1),
            Some(GuardViolation::NegativeMoveQuantity { quantity: -1 })
        );
        assert_eq!(check_move_request(&"a", &"b", 0), None);
    }

    #[test]
    fn move_transfers_quantity_between_cells() {
        assert_eq!(
            plan_move(10, 2, 5),
            Ok(Verdict::Proceed(MovePlan {
                quantity: 5,
                source_old: 10,
                source_new: 5,
                destination_old: 2,
                destination_new: 7,
            }))
        );
    }

    #[test]
    fn move_that_drains_source_below_zero_is_blocked() {
        assert_eq!(
            plan_move(3, 2, 5),
            Ok(Verdict::Blocked(GuardViolation::NegativeResult {
                current: 3,
                change: 5,
                would_be: -2,
            }))
        );
    }

    #[test]
    fn blocked_plans_are_repeatable() {
        assert_eq!(plan_edit(1, -2), plan_edit(1, -2));
        assert_eq!(plan_move(0, 0, 1), plan_move(0, 0, 1));
    }
}
