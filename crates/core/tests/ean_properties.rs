//! Property-based tests for EAN-13 check digits and cart patches.

use proptest::prelude::*;

use grocery_aid_core::{
    Ean, ItemQuantity, PatchOp, add_product, calculate_check_digit, change_cart_product_quantity,
    is_valid_ean, remove_product,
};

// =============================================================================
// Strategy helpers
// =============================================================================

/// Twelve payload digits.
fn prefix_strategy() -> impl Strategy<Value = String> {
    "[0-9]{12}"
}

/// A valid EAN-13 code.
fn ean_strategy() -> impl Strategy<Value = String> {
    prefix_strategy().prop_map(|prefix| {
        let check = calculate_check_digit(&prefix);
        format!("{prefix}{check}")
    })
}

/// Twelve payload digits of a variable-price code.
fn variable_price_prefix_strategy() -> impl Strategy<Value = String> {
    "2[0-9]{11}"
}

// =============================================================================
// Check digit
// =============================================================================

proptest! {
    #[test]
    fn check_digit_is_a_single_digit(prefix in prefix_strategy()) {
        prop_assert!(calculate_check_digit(&prefix).is_ascii_digit());
    }

    #[test]
    fn appended_check_digit_validates(prefix in prefix_strategy()) {
        let code = format!("{prefix}{}", calculate_check_digit(&prefix));
        prop_assert!(is_valid_ean(&code));
    }

    #[test]
    fn valid_code_round_trips(code in ean_strategy()) {
        prop_assert!(is_valid_ean(&code));
        let (prefix, check) = code.split_at(12);
        prop_assert_eq!(calculate_check_digit(prefix).to_string(), check);
    }

    #[test]
    fn any_other_check_digit_is_rejected(code in ean_strategy(), bump in 1_u32..10) {
        let (prefix, check) = code.split_at(12);
        let check = check.parse::<u32>().unwrap_or_default();
        let wrong = format!("{prefix}{}", (check + bump) % 10);
        prop_assert!(!is_valid_ean(&wrong));
    }

    #[test]
    fn arbitrary_strings_never_panic(input in ".*") {
        let _ = calculate_check_digit(&input);
        let _ = is_valid_ean(&input);
        let _ = Ean::parse(&input);
    }

    #[test]
    fn parse_agrees_with_is_valid_ean(input in "[0-9a]{11,14}") {
        prop_assert_eq!(Ean::parse(&input).is_ok(), is_valid_ean(&input));
    }
}

// =============================================================================
// Variable-price codes
// =============================================================================

proptest! {
    #[test]
    fn embedded_price_round_trips(prefix in variable_price_prefix_strategy(), cents in 0_i64..=9999) {
        let ean = Ean::from_prefix(&prefix).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let price = rust_decimal::Decimal::new(cents, 2);
        let priced = ean.with_price(price).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(priced.embedded_price(), Some(price));
        prop_assert!(is_valid_ean(priced.as_str()));
    }

    #[test]
    fn lookup_code_zeroes_the_price(prefix in variable_price_prefix_strategy()) {
        let ean = Ean::from_prefix(&prefix).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let lookup = ean.lookup_code();
        prop_assert_eq!(&lookup.as_str()[..8], &ean.as_str()[..8]);
        prop_assert_eq!(&lookup.as_str()[8..12], "0000");
        prop_assert!(is_valid_ean(lookup.as_str()));
    }
}

// =============================================================================
// Cart patches
// =============================================================================

proptest! {
    #[test]
    fn add_product_sends_quantity_only_for_fixed_price(code in ean_strategy(), quantity in 1_u32..1000) {
        let patch = add_product(&code, quantity);
        prop_assert_eq!(patch.len(), 1);
        let Some(PatchOp::AddItem(item)) = patch.ops().first() else {
            return Err(TestCaseError::fail("expected an add operation"));
        };
        if code.starts_with('2') {
            prop_assert_eq!(item.quantity, ItemQuantity::Absent);
        } else {
            prop_assert_eq!(item.quantity, ItemQuantity::Count(quantity));
        }
    }

    #[test]
    fn index_patches_target_their_line(index in 0_usize..500, quantity in 1_u32..1000) {
        let replace = change_cart_product_quantity(index, quantity);
        prop_assert_eq!(replace.ops()[0].path(), format!("/cart/items/{index}/quantity"));

        let remove = remove_product(index);
        prop_assert_eq!(remove.ops()[0].path(), format!("/cart/items/{index}"));
    }

    #[test]
    fn wire_form_reads_back(code in ean_strategy(), index in 0_usize..500, quantity in 1_u32..1000) {
        let patch = add_product(&code, quantity)
            .then(change_cart_product_quantity(index, quantity))
            .then(remove_product(index));
        let json = serde_json::to_string(&patch).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let read: grocery_aid_core::CartPatch =
            serde_json::from_str(&json).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(read, patch);
    }
}
