use crate::errors::CurveError;
use crate::math::decimal;
use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::Zero;

fn check_lengths(a: usize, b: usize, what: &str) -> Result<(), CurveError> {
    if a != b {
        return Err(CurveError::CalculationError(format!(
            "{what}: length mismatch ({a} vs {b})"
        )));
    }
    Ok(())
}

fn round_down(values: Vec<BigDecimal>, decimals: &[u8]) -> Vec<BigDecimal> {
    values
        .into_iter()
        .zip(decimals)
        .map(|(v, d)| v.with_scale_round(i64::from(*d), RoundingMode::Down).normalized())
        .collect()
}

/// Largest deposit the wallet can make in the pool's reserve ratios.
///
/// The binding coin is the one with the smallest `balance / reserve`; every
/// other coin follows it in the reserve ratios, so no coin exceeds its
/// balance. Coins without reserves cannot bind and receive zero. An empty
/// pool has no ratios, so the wallet balances are returned as they are.
pub fn balanced_amounts(
    reserves: &[BigDecimal],
    wallet: &[BigDecimal],
    decimals: &[u8],
) -> Result<Vec<BigDecimal>, CurveError> {
    check_lengths(reserves.len(), wallet.len(), "balanced amounts")?;
    check_lengths(reserves.len(), decimals.len(), "balanced amounts")?;

    if decimal::sum(reserves).is_zero() {
        return Ok(round_down(wallet.to_vec(), decimals));
    }

    // b_i / r_i < b_k / r_k  <=>  b_i * r_k < b_k * r_i, reserves being positive
    let (binding, (balance, reserve)) = wallet
        .iter()
        .zip(reserves)
        .enumerate()
        .filter(|(_, (_, reserve))| !reserve.is_zero())
        .min_by(|(_, (b_i, r_i)), (_, (b_k, r_k))| (*b_i * *r_k).cmp(&(*b_k * *r_i)))
        .ok_or_else(|| CurveError::CalculationError("no coin with reserves".into()))?;

    let amounts = reserves
        .iter()
        .enumerate()
        .map(|(j, r)| {
            if j == binding {
                balance.clone()
            } else {
                balance * r / reserve
            }
        })
        .collect();
    Ok(round_down(amounts, decimals))
}

/// [`balanced_amounts`] in USD space, for crypto pools whose coins are not
/// worth the same. Converted back with `prices` and clamped to both the pool
/// and the wallet balance of each coin.
pub fn balanced_amounts_usd(
    reserves: &[BigDecimal],
    wallet: &[BigDecimal],
    prices: &[BigDecimal],
    decimals: &[u8],
) -> Result<Vec<BigDecimal>, CurveError> {
    check_lengths(reserves.len(), prices.len(), "balanced amounts")?;
    let to_usd = |values: &[BigDecimal]| -> Vec<BigDecimal> {
        values.iter().zip(prices).map(|(v, p)| v * p).collect()
    };
    let usd = balanced_amounts(&to_usd(reserves), &to_usd(wallet), &vec![36; reserves.len()])?;

    let amounts = usd
        .iter()
        .zip(prices)
        .zip(reserves.iter().zip(wallet))
        .map(|((value, price), (reserve, balance))| {
            let amount = decimal::ratio(value, price)?;
            Ok(amount.min(reserve.clone()).min(balance.clone()))
        })
        .collect::<Result<Vec<_>, CurveError>>()?;
    Ok(round_down(amounts, decimals))
}

/// Splits the total value of `amounts` across the coins in reserve ratios.
/// With `prices`, value is measured in USD; otherwise coins count 1:1.
pub fn same_value_balanced(
    amounts: &[BigDecimal],
    reserves: &[BigDecimal],
    prices: Option<&[BigDecimal]>,
) -> Result<Vec<BigDecimal>, CurveError> {
    check_lengths(amounts.len(), reserves.len(), "same-value balanced")?;
    let one = BigDecimal::from(1);
    let price = |i: usize| prices.and_then(|p| p.get(i)).unwrap_or(&one);

    let value: BigDecimal = amounts.iter().enumerate().map(|(i, a)| a * price(i)).sum();
    let reserve_values: Vec<BigDecimal> = reserves
        .iter()
        .enumerate()
        .map(|(i, r)| r * price(i))
        .collect();
    let reserve_total = decimal::sum(&reserve_values);
    if reserve_total.is_zero() {
        let n = BigDecimal::from(amounts.len() as u64);
        return (0..amounts.len())
            .map(|i| decimal::ratio(&(&value / &n), price(i)))
            .collect();
    }
    reserve_values
        .iter()
        .enumerate()
        .map(|(i, rv)| decimal::ratio(&(&value * rv / &reserve_total), price(i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn decs(values: &[&str]) -> Vec<BigDecimal> {
        values.iter().map(|v| BigDecimal::from_str(v).unwrap()).collect()
    }

    #[test]
    fn scarcest_balance_binds() {
        let out = balanced_amounts(
            &decs(&["100", "100", "100"]),
            &decs(&["1000", "500", "10"]),
            &[18, 6, 6],
        )
        .unwrap();
        assert_eq!(out, decs(&["10", "10", "10"]));
    }

    #[test]
    fn follows_reserve_ratios_and_rounds_down() {
        let reserves = decs(&["300", "100", "200"]);
        let wallet = decs(&["1000", "1000", "1"]);
        let out = balanced_amounts(&reserves, &wallet, &[2, 2, 2]).unwrap();
        assert_eq!(out, decs(&["1.5", "0.5", "1"]));
        for (o, w) in out.iter().zip(&wallet) {
            assert!(o <= w);
        }

        let out = balanced_amounts(&decs(&["3", "1"]), &decs(&["1", "1"]), &[1, 1]).unwrap();
        // 1 * 1/3 = 0.333.. truncated to one decimal
        assert_eq!(out, decs(&["1", "0.3"]));
    }

    #[test]
    fn empty_first_reserve_still_respects_the_wallet() {
        let wallet = decs(&["5", "1000", "10"]);
        let out = balanced_amounts(&decs(&["0", "100", "100"]), &wallet, &[6, 6, 6]).unwrap();
        assert_eq!(out, decs(&["0", "10", "10"]));
        for (o, w) in out.iter().zip(&wallet) {
            assert!(o <= w);
        }
    }

    #[test]
    fn empty_coin_cannot_anchor() {
        let out = balanced_amounts(&decs(&["100", "0"]), &decs(&["5", "0"]), &[6, 6]).unwrap();
        assert_eq!(out, decs(&["5", "0"]));
    }

    #[test]
    fn usd_space_is_clamped() {
        // 1 ETH at 2000 vs 2000 USDC: wallet holds 0.5 ETH and 5000 USDC.
        let out = balanced_amounts_usd(
            &decs(&["10", "20000"]),
            &decs(&["0.5", "5000"]),
            &decs(&["2000", "1"]),
            &[18, 6],
        )
        .unwrap();
        assert_eq!(out, decs(&["0.5", "1000"]));
    }

    #[test]
    fn same_value_counterfactual() {
        let out = same_value_balanced(&decs(&["30", "0", "0"]), &decs(&["100", "100", "100"]), None)
            .unwrap();
        assert_eq!(out, decs(&["10", "10", "10"]));

        let out = same_value_balanced(
            &decs(&["1", "0"]),
            &decs(&["10", "20000"]),
            Some(&decs(&["2000", "1"])),
        )
        .unwrap();
        assert_eq!(out, decs(&["0.5", "1000"]));
    }
}
