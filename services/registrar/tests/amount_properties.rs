//! Amount Conversion and Aggregation Property Tests
//!
//! Wei amounts are checked against an independent exact integer computation, and batch
//! values must not depend on the order of the pending registrations.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use registrar_service::testing::MockPriceProvider;
use registrar_service::{build_transaction, PriceCache};
use rust_decimal::Decimal;
use types::{
    dollars_to_wei, label_hash, parse_registration_request, Address, PendingRegistration,
    ValidationPolicy, U256,
};

prop_compose! {
    /// Dollar amounts within the default policy bound, up to 4 decimal places
    fn arb_dollars()(scale in 0u32..=4)(mantissa in 0i64..=5 * 10i64.pow(scale), scale in Just(scale)) -> Decimal {
        Decimal::new(mantissa, scale)
    }
}

prop_compose! {
    /// Positive spot prices with up to 6 decimal places
    fn arb_price()(mantissa in 1i64..=100_000_000_000i64, scale in 0u32..=6) -> Decimal {
        Decimal::new(mantissa, scale)
    }
}

prop_compose! {
    fn arb_pending()(byte in any::<u8>(), wei in any::<u64>(), label in "[a-z0-9]{1,12}") -> PendingRegistration {
        let name = format!("{label}.myethvault.com");
        PendingRegistration {
            message_id: format!("msg-{label}"),
            label_hash: label_hash(&name),
            name,
            target_address: Address::repeat_byte(byte),
            wei_amount: U256::from(wei),
        }
    }
}

/// floor(d / p * 10^18) with plain u128 integers
fn reference_wei(dollars: Decimal, price: Decimal) -> u128 {
    let numerator = dollars.mantissa() as u128 * 10u128.pow(18 + price.scale());
    let denominator = price.mantissa() as u128 * 10u128.pow(dollars.scale());
    numerator / denominator
}

proptest! {
    #[test]
    fn test_wei_conversion_is_exact_floor(dollars in arb_dollars(), price in arb_price()) {
        let wei = dollars_to_wei(dollars, price).unwrap();
        prop_assert_eq!(wei, U256::from(reference_wei(dollars, price)));

        // floor: wei * p <= d * 10^18 < (wei + 1) * p, scaled to integers
        let price_scaled = U256::from(price.mantissa() as u128) * U256::exp10(dollars.scale() as usize);
        let target = U256::from(dollars.mantissa() as u128)
            * U256::exp10(18 + price.scale() as usize);
        prop_assert!(wei * price_scaled <= target);
        prop_assert!((wei + U256::one()) * price_scaled > target);
    }

    #[test]
    fn test_batch_value_independent_of_order(
        (original, shuffled) in prop::collection::vec(arb_pending(), 1..16)
            .prop_flat_map(|batch| (Just(batch.clone()), Just(batch).prop_shuffle()))
    ) {
        let gas_price = U256::from(8_000_000_000u64);
        let a = build_transaction(&original, gas_price, 1).unwrap().unwrap();
        let b = build_transaction(&shuffled, gas_price, 1).unwrap().unwrap();

        let expected = original
            .iter()
            .fold(0u128, |total, entry| total + entry.wei_amount.as_u128());
        prop_assert_eq!(a.value(), U256::from(expected));
        prop_assert_eq!(a.value(), b.value());

        for (i, entry) in shuffled.iter().enumerate() {
            prop_assert_eq!(b.label_hashes()[i], entry.label_hash);
            prop_assert_eq!(b.addresses()[i], entry.target_address);
            prop_assert_eq!(b.amounts()[i], entry.wei_amount);
        }
    }

    #[test]
    fn test_validation_is_idempotent(body in ".{0,64}") {
        let policy = ValidationPolicy::default();
        prop_assert_eq!(
            parse_registration_request(&body, &policy),
            parse_registration_request(&body, &policy)
        );
    }

    #[test]
    fn test_well_formed_requests_validate_the_same_way(
        label in "[a-z0-9-]{1,16}",
        address in "[0-9a-fA-F]{40}",
        cents in 0u32..=700,
    ) {
        let policy = ValidationPolicy::default();
        let body = format!(
            r#"{{"name":"{label}.myethvault.com","targetAddress":"0x{address}","dollarAmount":{}}}"#,
            Decimal::new(cents as i64, 2)
        );
        let first = parse_registration_request(&body, &policy);
        prop_assert_eq!(&first, &parse_registration_request(&body, &policy));
        prop_assert_eq!(first.is_ok(), cents <= 500);
    }
}

#[test]
fn test_cached_conversion_matches_direct_conversion() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    runtime.block_on(async {
        let price = Decimal::new(123_456, 2);
        let provider = Arc::new(MockPriceProvider::new(price));
        let prices = PriceCache::new(provider.clone(), Duration::from_secs(60));

        for cents in [0i64, 1, 99, 250, 333, 500] {
            let dollars = Decimal::new(cents, 2);
            assert_eq!(
                prices.dollars_to_wei(dollars).await.unwrap(),
                dollars_to_wei(dollars, price).unwrap()
            );
        }
        assert_eq!(provider.calls(), 1);
    });
}
