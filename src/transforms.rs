// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The transform catalog and chain search (spec section 4.5).
//!
//! Each `Transform` is a pure, total function `[BigInt] -> [BigInt]`; a chain
//! is an ordered composition applied left-to-right to a copy of the query
//! terms. Chains are enumerated up to a configured depth, filtered for
//! "noise" (constant collapses and the like), and de-duplicated both by exact
//! output and by best-per-sequence.

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single unary operation in the catalog (spec section 3).
///
/// Every variant is a total function: it may shrink or empty its input, but
/// it never panics. `Shift(0)` is excluded from catalogs at construction time
/// since it would be a no-op entry identical to omitting the transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum Transform {
    Scale(i64),
    Affine(i64, i64),
    Shift(i64),
    Diff(u32),
    PartialSum,
    CumProd,
    Abs,
    GcdNorm,
    Decimate(u32, u32),
    Reverse,
    EvenIdx,
    OddIdx,
    MovSum(u32),
    Popcount,
    DigitSum(u32),
    Mod(u32),
    XorIndex,
    RleEncode,
    RleDecode,
    Concat(u32),
    Binomial,
    Euler,
    Mobius,
    Log(u32),
    Exp(u32),
}

impl Transform {
    /// Per-variant complexity weight used in chain scoring (spec section 4.5).
    /// `Diff` uses the higher "`Diff^k`" weight once `order > 1`.
    pub fn weight(&self) -> f64 {
        match self {
            Transform::Scale(_) => 0.6,
            Transform::Affine(_, _) => 1.0,
            Transform::Shift(_) => 0.4,
            Transform::Diff(order) if *order > 1 => 1.6,
            Transform::Diff(_) => 1.2,
            Transform::PartialSum => 1.1,
            Transform::CumProd => 1.8,
            Transform::Abs => 0.2,
            Transform::GcdNorm => 0.3,
            Transform::Decimate(_, _) => 1.5,
            Transform::Reverse => 0.5,
            Transform::EvenIdx | Transform::OddIdx => 0.8,
            Transform::MovSum(_) => 1.0,
            Transform::Popcount => 1.2,
            Transform::DigitSum(_) => 1.0,
            Transform::Mod(_) => 0.9,
            Transform::XorIndex => 1.3,
            Transform::RleEncode => 1.1,
            Transform::RleDecode => 1.4,
            Transform::Concat(_) => 1.4,
            Transform::Binomial => 1.6,
            Transform::Euler => 1.0,
            Transform::Mobius => 1.7,
            Transform::Log(_) => 1.5,
            Transform::Exp(_) => 1.8,
        }
    }

    /// Does this transform belong to the "noisy op" group that requires a
    /// stricter output filter (spec section 4.5)?
    fn is_noisy(&self) -> bool {
        matches!(
            self,
            Transform::Popcount
                | Transform::XorIndex
                | Transform::RleEncode
                | Transform::RleDecode
                | Transform::DigitSum(_)
                | Transform::Decimate(_, _)
                | Transform::Mod(_)
                | Transform::Concat(_)
                | Transform::Log(_)
                | Transform::Exp(_)
        )
    }

    /// Apply this transform to `terms`, returning the transformed sequence.
    /// Total: never panics, returns `[]` on any structurally invalid input
    /// (too short, non-positive where required, overflow, etc).
    pub fn apply(&self, terms: &[BigInt]) -> Vec<BigInt> {
        match self {
            Transform::Scale(k) => {
                if *k == 0 || *k == 1 {
                    return Vec::new();
                }
                terms.iter().map(|t| t * k).collect()
            }
            Transform::Affine(k, b) => {
                if *k == 0 || *b == 0 {
                    return Vec::new();
                }
                terms.iter().map(|t| t * k + b).collect()
            }
            Transform::Shift(k) => shift(terms, *k),
            Transform::Diff(order) => diff_n(terms, *order),
            Transform::PartialSum => {
                let mut acc = BigInt::zero();
                terms
                    .iter()
                    .map(|t| {
                        acc += t;
                        acc.clone()
                    })
                    .collect()
            }
            Transform::CumProd => {
                let mut acc = BigInt::from(1);
                terms
                    .iter()
                    .map(|t| {
                        acc *= t;
                        acc.clone()
                    })
                    .collect()
            }
            Transform::Abs => terms.iter().map(|t| t.abs()).collect(),
            Transform::GcdNorm => {
                let g = crate::record::gcd_of_abs(terms);
                if g.is_zero() {
                    terms.to_vec()
                } else {
                    terms.iter().map(|t| t / &g).collect()
                }
            }
            Transform::Decimate(c, d) => decimate(terms, *c, *d),
            Transform::Reverse => terms.iter().rev().cloned().collect(),
            Transform::EvenIdx => terms.iter().step_by(2).cloned().collect(),
            Transform::OddIdx => terms.iter().skip(1).step_by(2).cloned().collect(),
            Transform::MovSum(w) => moving_sum(terms, *w),
            Transform::Popcount => terms.iter().map(popcount).collect(),
            Transform::DigitSum(base) => terms.iter().map(|t| digit_sum(t, *base)).collect(),
            Transform::Mod(m) => {
                if *m == 0 {
                    return Vec::new();
                }
                let modulus = BigInt::from(*m);
                terms.iter().map(|t| t.mod_floor(&modulus)).collect()
            }
            Transform::XorIndex => xor_index(terms),
            Transform::RleEncode => rle_encode(terms),
            Transform::RleDecode => rle_decode(terms),
            Transform::Concat(base) => concat(terms, *base),
            Transform::Binomial => binomial_transform(terms),
            Transform::Euler => euler_transform(terms),
            Transform::Mobius => mobius_transform(terms),
            Transform::Log(base) => log_transform(terms, *base),
            Transform::Exp(base) => exp_transform(terms, *base),
        }
    }
}

fn shift(terms: &[BigInt], k: i64) -> Vec<BigInt> {
    if k == 0 {
        return terms.to_vec();
    }
    if k > 0 {
        let k = k as usize;
        if k >= terms.len() {
            Vec::new()
        } else {
            terms[k..].to_vec()
        }
    } else {
        let k = (-k) as usize;
        if k >= terms.len() {
            Vec::new()
        } else {
            terms[..terms.len() - k].to_vec()
        }
    }
}

fn diff_n(terms: &[BigInt], order: u32) -> Vec<BigInt> {
    let mut cur = terms.to_vec();
    for _ in 0..order {
        if cur.len() < 2 {
            return Vec::new();
        }
        cur = cur.windows(2).map(|w| &w[1] - &w[0]).collect();
    }
    cur
}

fn decimate(terms: &[BigInt], c: u32, d: u32) -> Vec<BigInt> {
    if c == 0 {
        return Vec::new();
    }
    let c = c as usize;
    let d = d as usize;
    if d >= terms.len() {
        return Vec::new();
    }
    terms[d..].iter().step_by(c).cloned().collect()
}

fn moving_sum(terms: &[BigInt], w: u32) -> Vec<BigInt> {
    if w == 0 {
        return Vec::new();
    }
    let w = w as usize;
    if terms.len() < w {
        return Vec::new();
    }
    terms.windows(w).map(|win| win.iter().sum()).collect()
}

fn popcount(t: &BigInt) -> BigInt {
    let (_, bytes) = t.abs().to_bytes_be();
    let count: u32 = bytes.iter().map(|b| b.count_ones()).sum();
    BigInt::from(count)
}

fn digit_sum(t: &BigInt, base: u32) -> BigInt {
    if base < 2 {
        return BigInt::zero();
    }
    let mut n = t.abs();
    let b = BigInt::from(base);
    let mut sum = BigInt::zero();
    if n.is_zero() {
        return sum;
    }
    while !n.is_zero() {
        let (q, r) = n.div_mod_floor(&b);
        sum += r;
        n = q;
    }
    sum
}

fn xor_index(terms: &[BigInt]) -> Vec<BigInt> {
    terms
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let idx = BigInt::from(i as u64);
            bigint_xor(t, &idx)
        })
        .collect()
}

/// Bitwise XOR on the two's-complement-free magnitude; both operands are
/// treated as nonnegative (index is always `>= 0`; a negative term's sign is
/// preserved separately since XOR over signed magnitude has no single
/// canonical meaning for this transform).
fn bigint_xor(a: &BigInt, b: &BigInt) -> BigInt {
    let sign = a.sign();
    let (_, a_bytes) = a.abs().to_bytes_be();
    let (_, b_bytes) = b.abs().to_bytes_be();
    let len = a_bytes.len().max(b_bytes.len());
    let mut out = vec![0u8; len];
    for i in 0..len {
        let av = a_bytes.get(a_bytes.len().wrapping_sub(len - i)).copied().unwrap_or(0);
        let bv = b_bytes.get(b_bytes.len().wrapping_sub(len - i)).copied().unwrap_or(0);
        out[i] = av ^ bv;
    }
    let magnitude = BigInt::from_bytes_be(Sign::Plus, &out);
    if sign == Sign::Minus {
        -magnitude
    } else {
        magnitude
    }
}

fn rle_encode(terms: &[BigInt]) -> Vec<BigInt> {
    if terms.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut i = 0;
    while i < terms.len() {
        let mut run = 1u64;
        while i + (run as usize) < terms.len() && terms[i + run as usize] == terms[i] {
            run += 1;
        }
        out.push(BigInt::from(run));
        out.push(terms[i].clone());
        i += run as usize;
    }
    out
}

fn rle_decode(terms: &[BigInt]) -> Vec<BigInt> {
    if terms.len() % 2 != 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for pair in terms.chunks(2) {
        let count = match pair[0].to_u64() {
            Some(c) if c > 0 && c <= 10_000 => c,
            _ => return Vec::new(),
        };
        for _ in 0..count {
            out.push(pair[1].clone());
        }
    }
    out
}

fn concat(terms: &[BigInt], base: u32) -> Vec<BigInt> {
    if base < 2 {
        return Vec::new();
    }
    terms
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let n = BigInt::from((i + 1) as u64);
            let sign = t.sign();
            let n_digits = to_digits(&n, base);
            let v_digits = to_digits(&t.abs(), base);
            let combined = format!("{n_digits}{v_digits}");
            let value = BigInt::parse_bytes(combined.as_bytes(), base).unwrap_or_else(BigInt::zero);
            if sign == Sign::Minus {
                -value
            } else {
                value
            }
        })
        .collect()
}

fn to_digits(v: &BigInt, base: u32) -> String {
    if v.is_zero() {
        return "0".to_string();
    }
    let mut n = v.clone();
    let b = BigInt::from(base);
    let mut digits = Vec::new();
    while !n.is_zero() {
        let (q, r) = n.div_mod_floor(&b);
        let d = r.to_u32().unwrap_or(0);
        digits.push(std::char::from_digit(d, base.max(2).min(36)).unwrap_or('0'));
        n = q;
    }
    digits.iter().rev().collect()
}

fn binomial_transform(terms: &[BigInt]) -> Vec<BigInt> {
    let n = terms.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let mut sum = BigInt::zero();
        let mut c = BigInt::from(1);
        for k in 0..=i {
            sum += &c * &terms[k];
            c = &c * (i - k) / (k + 1);
        }
        out.push(sum);
    }
    out
}

/// `bₙ = Σ_{d|n} d·a_d` for `n >= 1`, `b₀ = a₀`. As implemented by the
/// original tool, not the classical generating-function Euler transform.
fn euler_transform(terms: &[BigInt]) -> Vec<BigInt> {
    if terms.is_empty() {
        return Vec::new();
    }
    let n = terms.len();
    let mut out = vec![terms[0].clone()];
    for k in 1..n {
        let idx = k + 1; // 1-based n
        let mut sum = BigInt::zero();
        for d in 1..=idx {
            if idx % d == 0 && d <= terms.len() {
                sum += BigInt::from(d as u64) * &terms[d - 1];
            }
        }
        out.push(sum);
    }
    out
}

/// `bₙ = Σ_{d|n} μ(n/d)·a_{d-1}` for `n >= 2`, `b₀ = a₀`. Preserves the
/// original's `seq[d-1]` off-by-one against the 1-based `n` exactly.
fn mobius_transform(terms: &[BigInt]) -> Vec<BigInt> {
    if terms.is_empty() {
        return Vec::new();
    }
    let n = terms.len();
    let mut out = vec![terms[0].clone()];
    for k in 1..n {
        let idx = k + 1; // 1-based n
        let mut sum = BigInt::zero();
        for d in 1..=idx {
            if idx % d == 0 {
                let mu = mobius_mu(idx / d);
                if mu != 0 && d >= 1 && d <= terms.len() {
                    sum += BigInt::from(mu) * &terms[d - 1];
                }
            }
        }
        out.push(sum);
    }
    out
}

fn mobius_mu(mut n: usize) -> i64 {
    if n == 1 {
        return 1;
    }
    let mut primes = 0u32;
    let mut p = 2usize;
    while p * p <= n {
        if n % p == 0 {
            n /= p;
            if n % p == 0 {
                return 0;
            }
            primes += 1;
        }
        p += 1;
    }
    if n > 1 {
        primes += 1;
    }
    if primes % 2 == 0 {
        1
    } else {
        -1
    }
}

fn log_transform(terms: &[BigInt], base: u32) -> Vec<BigInt> {
    if base <= 1 {
        return Vec::new();
    }
    let ln_base = (base as f64).ln();
    let mut out = Vec::with_capacity(terms.len());
    for t in terms {
        if t.sign() != Sign::Plus {
            return Vec::new();
        }
        let Some(v) = t.to_f64() else { return Vec::new() };
        if v <= 0.0 || !v.is_finite() {
            return Vec::new();
        }
        out.push(BigInt::from((v.ln() / ln_base).round() as i64));
    }
    out
}

const EXP_MAGNITUDE_BOUND: f64 = 1e12;

fn exp_transform(terms: &[BigInt], base: u32) -> Vec<BigInt> {
    if base <= 1 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(terms.len());
    for t in terms {
        let Some(v) = t.to_f64() else { return Vec::new() };
        let result = (base as f64).powf(v);
        if !result.is_finite() || result.abs() > EXP_MAGNITUDE_BOUND {
            return Vec::new();
        }
        out.push(BigInt::from(result.round() as i64));
    }
    out
}

/// A named, ordered sequence of transforms applied left-to-right.
pub type Chain = Vec<Transform>;

/// Describe a chain for human/JSON display, e.g. `"Scale(2) -> Diff(1)"`.
pub fn describe_chain(chain: &Chain) -> String {
    chain
        .iter()
        .map(|t| format!("{t:?}"))
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn chain_complexity(chain: &Chain) -> f64 {
    chain.iter().map(Transform::weight).sum()
}

/// Apply a chain left-to-right to `terms`; stops and returns `[]` the moment
/// any step produces an empty intermediate list (spec section 4.5).
pub fn apply_chain(chain: &Chain, terms: &[BigInt]) -> Vec<BigInt> {
    let mut cur = terms.to_vec();
    for t in chain {
        if cur.is_empty() {
            return Vec::new();
        }
        cur = t.apply(&cur);
    }
    cur
}

/// Enumerate every ordered tuple of catalog transforms of length `1..=max_depth`.
pub fn enumerate_chains(catalog: &[Transform], max_depth: u32) -> Vec<Chain> {
    let mut chains = Vec::new();
    let mut frontier: Vec<Chain> = vec![Vec::new()];
    for _ in 0..max_depth {
        let mut next = Vec::new();
        for prefix in &frontier {
            for t in catalog {
                let mut chain = prefix.clone();
                chain.push(t.clone());
                chains.push(chain.clone());
                next.push(chain);
            }
        }
        frontier = next;
    }
    chains
}

/// Does this transformed output pass the noise filters of spec section 4.5?
fn passes_noise_filter(chain: &Chain, output: &[BigInt], query_terms: &[BigInt], min_match_length: usize) -> bool {
    if output.len() < min_match_length {
        return false;
    }
    let is_constant = output.windows(2).all(|w| w[0] == w[1]);
    if is_constant {
        let query_constant = query_terms.windows(2).all(|w| w[0] == w[1]);
        let value_is_zero = output.first().map(|v| v.is_zero()).unwrap_or(true);
        if value_is_zero || !query_constant {
            return false;
        }
    }
    if chain.iter().any(Transform::is_noisy) {
        let distinct: HashSet<&BigInt> = output.iter().collect();
        if output.len() < min_match_length.max(6) || distinct.len() < 4 {
            return false;
        }
    }
    true
}

/// One transform-chain candidate that survived the noise filter: the chain,
/// its output, and the chain's complexity weight.
///
/// `output_length` is the length of the *transformed output*, not a match
/// length — callers combine a chain's `complexity` with the actual matched
/// length (from `matcher::Match::length`, once the output is run through
/// `match_exact`) to get the spec section 4.5 score
/// (`match.length / (1 + chain_complexity)`).
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub chain: Chain,
    pub output: Vec<BigInt>,
    pub complexity: f64,
    pub output_length: usize,
}

/// Run every chain of the catalog (up to `max_depth`) against `query_terms`,
/// filtering noise and de-duplicating by exact output tuple — "keep only the
/// first chain that produces a given output" (spec section 4.5).
pub fn search_chains(catalog: &[Transform], max_depth: u32, query_terms: &[BigInt], min_match_length: usize) -> Vec<TransformResult> {
    let mut seen_outputs: HashSet<Vec<BigInt>> = HashSet::new();
    let mut out = Vec::new();
    for chain in enumerate_chains(catalog, max_depth) {
        let output = apply_chain(&chain, query_terms);
        if output.is_empty() {
            continue;
        }
        if !passes_noise_filter(&chain, &output, query_terms, min_match_length) {
            continue;
        }
        if !seen_outputs.insert(output.clone()) {
            continue;
        }
        let complexity = chain_complexity(&chain);
        out.push(TransformResult {
            output_length: output.len(),
            chain,
            output,
            complexity,
        });
    }
    out
}

/// The built-in default catalog (spec section 4.5: "configurable by toggles
/// and parameter lists"), wired to a representative parameter set; callers
/// needing a narrower or wider catalog build their own `Vec<Transform>`.
pub fn default_catalog() -> Vec<Transform> {
    let mut catalog = Vec::new();
    for k in [-3, -2, 2, 3, 4, 5] {
        catalog.push(Transform::Scale(k));
    }
    for (k, b) in [(2, 1), (2, -1), (3, 1), (-1, 1)] {
        catalog.push(Transform::Affine(k, b));
    }
    for k in [-2, -1, 1, 2] {
        catalog.push(Transform::Shift(k));
    }
    catalog.push(Transform::Diff(1));
    catalog.push(Transform::Diff(2));
    catalog.push(Transform::PartialSum);
    catalog.push(Transform::CumProd);
    catalog.push(Transform::Abs);
    catalog.push(Transform::GcdNorm);
    for (c, d) in [(2, 0), (2, 1), (3, 0)] {
        catalog.push(Transform::Decimate(c, d));
    }
    catalog.push(Transform::Reverse);
    catalog.push(Transform::EvenIdx);
    catalog.push(Transform::OddIdx);
    for w in [2, 3] {
        catalog.push(Transform::MovSum(w));
    }
    catalog.push(Transform::Popcount);
    for base in [2, 10] {
        catalog.push(Transform::DigitSum(base));
    }
    for m in [2, 3, 10] {
        catalog.push(Transform::Mod(m));
    }
    catalog.push(Transform::XorIndex);
    catalog.push(Transform::RleEncode);
    catalog.push(Transform::RleDecode);
    for base in [2, 10] {
        catalog.push(Transform::Concat(base));
    }
    catalog.push(Transform::Binomial);
    catalog.push(Transform::Euler);
    catalog.push(Transform::Mobius);
    for base in [2, 10] {
        catalog.push(Transform::Log(base));
        catalog.push(Transform::Exp(base));
    }
    catalog
}
