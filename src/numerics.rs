//! Decimal-precision statistical primitives for the IRB Vasicek formula.
//!
//! The corp-finance-core workspace historically re-implemented these
//! approximations independently in several modules (options pricing,
//! economic capital, portfolio risk) rather than sharing one copy. This
//! module follows the same families of rational/Taylor approximations,
//! consolidated once since the IRB calculator is the only remaining
//! consumer.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Newton's-method square root. Diverges for negative input (panics via
/// `unreachable` since no caller ever passes one — variances and correlation
/// terms are non-negative by construction).
pub fn sqrt_decimal(x: Decimal) -> Decimal {
    if x <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if x == Decimal::ONE {
        return Decimal::ONE;
    }

    let mut guess = if x > dec!(100) {
        x / dec!(10)
    } else if x < dec!(0.01) {
        x * dec!(10)
    } else {
        x / dec!(2) + dec!(0.5)
    };

    for _ in 0..20 {
        if guess == Decimal::ZERO {
            break;
        }
        guess = (guess + x / guess) / dec!(2);
    }
    guess
}

/// Taylor series with range reduction (`e^x = (e^(x/2^n))^(2^n)`), since the
/// raw series converges slowly for `|x| > 2`.
pub fn exp_decimal(x: Decimal) -> Decimal {
    if x == Decimal::ZERO {
        return Decimal::ONE;
    }
    if x.abs() > dec!(2) {
        let half = exp_decimal(x / dec!(2));
        return half * half;
    }

    let mut term = Decimal::ONE;
    let mut sum = Decimal::ONE;
    for n in 1..=30u64 {
        term = term * x / Decimal::from(n);
        sum += term;
        if term.abs() < dec!(0.0000000000001) {
            break;
        }
    }
    sum
}

/// Natural log via Newton's method on `exp_decimal`: solves `exp(y) = x`.
pub fn ln_decimal(x: Decimal) -> Decimal {
    assert!(x > Decimal::ZERO, "ln_decimal requires a positive argument");
    if x == Decimal::ONE {
        return Decimal::ZERO;
    }

    // Seed with f64::ln, then refine in decimal precision.
    let x_f64: f64 = x.try_into().unwrap_or(1.0);
    let mut y = Decimal::try_from(x_f64.ln()).unwrap_or(Decimal::ZERO);

    for _ in 0..10 {
        let e = exp_decimal(y);
        if e == Decimal::ZERO {
            break;
        }
        y += (x - e) / e;
    }
    y
}

/// Standard normal PDF.
fn norm_pdf(x: Decimal) -> Decimal {
    const TWO_PI_SQRT: &str = "2.5066282746310002";
    let denom: Decimal = TWO_PI_SQRT.parse().unwrap();
    exp_decimal(-(x * x) / dec!(2)) / denom
}

/// Standard normal CDF `Φ(x)`, Abramowitz & Stegun 26.2.17 rational
/// approximation (max error ~7.5e-8).
pub fn norm_cdf(x: Decimal) -> Decimal {
    let b1 = dec!(0.319381530);
    let b2 = dec!(-0.356563782);
    let b3 = dec!(1.781477937);
    let b4 = dec!(-1.821255978);
    let b5 = dec!(1.330274429);
    let p = dec!(0.2316419);

    let ax = x.abs();
    let k = Decimal::ONE / (Decimal::ONE + p * ax);
    let poly = k * (b1 + k * (b2 + k * (b3 + k * (b4 + k * b5))));
    let cdf = Decimal::ONE - norm_pdf(ax) * poly;

    if x < Decimal::ZERO {
        Decimal::ONE - cdf
    } else {
        cdf
    }
}

/// Inverse standard normal CDF `Φ⁻¹(p)`, Acklam's algorithm (central-region
/// rational approximation plus Beasley-Springer-Moro tail correction).
pub fn norm_inv(p: Decimal) -> Decimal {
    if p <= Decimal::ZERO {
        return dec!(-10);
    }
    if p >= Decimal::ONE {
        return dec!(10);
    }

    let a1 = dec!(-39.69683028665376);
    let a2 = dec!(220.9460984245205);
    let a3 = dec!(-275.9285104469687);
    let a4 = dec!(138.3577518672690);
    let a5 = dec!(-30.66479806614716);
    let a6 = dec!(2.506628277459239);

    let b1 = dec!(-54.47609879822406);
    let b2 = dec!(161.5858368580409);
    let b3 = dec!(-155.6989798598866);
    let b4 = dec!(66.80131188771972);
    let b5 = dec!(-13.28068155288572);

    let c1 = dec!(-0.007784894002430293);
    let c2 = dec!(-0.3223964580411365);
    let c3 = dec!(-2.400758277161838);
    let c4 = dec!(-2.549732539343734);
    let c5 = dec!(4.374664141464968);
    let c6 = dec!(2.938163982698783);

    let d1 = dec!(0.007784695709041462);
    let d2 = dec!(0.3224671290700398);
    let d3 = dec!(2.445134137142996);
    let d4 = dec!(3.754408661907416);

    let p_low = dec!(0.02425);
    let p_high = Decimal::ONE - p_low;

    if p < p_low {
        let q = sqrt_decimal(dec!(-2) * ln_decimal(p));
        (((((c1 * q + c2) * q + c3) * q + c4) * q + c5) * q + c6)
            / ((((d1 * q + d2) * q + d3) * q + d4) * q + Decimal::ONE)
    } else if p <= p_high {
        let q = p - dec!(0.5);
        let r = q * q;
        (((((a1 * r + a2) * r + a3) * r + a4) * r + a5) * r + a6) * q
            / (((((b1 * r + b2) * r + b3) * r + b4) * r + b5) * r + Decimal::ONE)
    } else {
        let q = sqrt_decimal(dec!(-2) * ln_decimal(Decimal::ONE - p));
        -(((((c1 * q + c2) * q + c3) * q + c4) * q + c5) * q + c6)
            / ((((d1 * q + d2) * q + d3) * q + d4) * q + Decimal::ONE)
    }
}
