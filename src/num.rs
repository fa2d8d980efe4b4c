use alloy::primitives::{I256, U256};
use fastnum::{
    UD256, bint,
    decimal::{Context, Decimal, RoundingMode, UnsignedDecimal},
};

use crate::price::PythPrice;

/// Number of decimals of the protocol's fixed-point (`D18`) values.
pub const WAD_DECIMALS: u8 = 18;

/// One in `D18` fixed point.
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Fixed-point to decimal converter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Converter {
    decimals: i32,
}

impl Converter {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    /// Converter of `D18` values used across the protocol contracts.
    pub fn wad() -> Self {
        Self::new(WAD_DECIMALS)
    }

    pub fn from_signed<const N: usize>(&self, value: I256) -> Decimal<N> {
        let unscaled = bint::UInt::<N>::from_le_slice(value.unsigned_abs().as_le_slice())
            .expect("Converter: abs(I256) -> UInt::<N>");
        Decimal::<N>::from_parts(
            unscaled,
            -self.decimals,
            match value.sign() {
                alloy::primitives::Sign::Negative => fastnum::decimal::Sign::Minus,
                alloy::primitives::Sign::Positive => fastnum::decimal::Sign::Plus,
            },
            Context::default().with_rounding_mode(RoundingMode::Floor),
        )
    }

    pub fn to_unsigned<const N: usize>(&self, value: UnsignedDecimal<N>) -> U256 {
        let rescaled = value.rescale(self.decimals as i16);
        U256::from_le_slice(rescaled.digits().to_radix_le(256).as_slice())
    }
}

/// Worst acceptable fill price of a perps order: the oracle price moved by
/// `slippage_bps` against the order side and floored to a whole unit,
/// in `D18`.
pub fn acceptable_price(price: &PythPrice, is_long: bool, slippage_bps: u32) -> U256 {
    let factor = if is_long {
        10_000 + slippage_bps
    } else {
        10_000u32.saturating_sub(slippage_bps)
    };
    let adjusted =
        price.to_decimal().unsigned_abs() * UD256::from_u32(factor) / UD256::from_u32(10_000);
    Converter::wad().to_unsigned(adjusted.floor())
}
