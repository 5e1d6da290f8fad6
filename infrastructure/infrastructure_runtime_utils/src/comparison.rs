//! Comparison Module
//!
//! Provides term equality and the total term order.
//! Based on eq() and erts_cmp() from utils.c
//!
//! Terms of different order classes compare by class
//! (`number < atom < reference < fun < port < pid < tuple < map < nil < list < bitstring`).
//! Numbers compare by mathematical value across small, big and float
//! representations, so `eq(&Term::Small(1), &Term::Float(1.0))` holds.
//!
//! NaN floats sort above every other number and compare `Equal` to each
//! other, which keeps the order total. `eq` never treats a NaN as equal to
//! anything, itself included; that is the only place where `eq(a, b)` and
//! `cmp(a, b) == Equal` disagree.
//!
//! Both functions walk the terms with an explicit stack and stop at the first
//! difference. A tuple, fun environment or map being walked keeps one cursor
//! on the stack, so the stack grows with the depth of the terms and not their
//! width. Maps are walked through a key-sorted view of each side, which costs
//! one pointer per entry for the map being compared.

use std::cmp::Ordering;
use std::ptr;
use std::slice;

use entities_data_handling::bits::cmp_bits;
use entities_data_handling::term::{Atom, Number, Term};
use entities_utilities::BigNumber;

/// Floats whose magnitude is below this convert to and from `i64` exactly
const EXACT_F64_INT: u64 = 1 << 53;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// `eq`: NaN is unequal to everything
    Equality,
    /// `cmp`: NaN is a value above all numbers
    Order,
}

/// Compare two terms for equality
///
/// Based on `eq()` from utils.c. Numbers are equal when their values are,
/// whatever their representation; see the module docs for NaN.
///
/// # Examples
///
/// ```rust
/// use entities_data_handling::Term;
/// use infrastructure_runtime_utils::eq;
///
/// assert!(eq(&Term::Small(300), &Term::Float(300.0)));
/// assert!(!eq(&Term::Float(f64::NAN), &Term::Float(f64::NAN)));
/// ```
pub fn eq(a: &Term, b: &Term) -> bool {
    compare(a, b, Mode::Equality) == Ordering::Equal
}

/// Compare two terms in the total term order
///
/// Based on `erts_cmp()` from utils.c.
pub fn cmp(a: &Term, b: &Term) -> Ordering {
    compare(a, b, Mode::Order)
}

/// `a < b` in term order
pub fn cmp_lt(a: &Term, b: &Term) -> bool {
    cmp(a, b) == Ordering::Less
}

/// `a =< b` in term order
pub fn cmp_le(a: &Term, b: &Term) -> bool {
    cmp(a, b) != Ordering::Greater
}

/// `a == b` in term order
pub fn cmp_eq(a: &Term, b: &Term) -> bool {
    cmp(a, b) == Ordering::Equal
}

/// `a /= b` in term order
pub fn cmp_ne(a: &Term, b: &Term) -> bool {
    cmp(a, b) != Ordering::Equal
}

/// `a >= b` in term order
pub fn cmp_ge(a: &Term, b: &Term) -> bool {
    cmp(a, b) != Ordering::Less
}

/// `a > b` in term order
pub fn cmp_gt(a: &Term, b: &Term) -> bool {
    cmp(a, b) == Ordering::Greater
}

/// Work still to do, leftmost on top
enum Work<'a> {
    Pair(&'a Term, &'a Term),
    /// Remaining elements of two tuples or fun environments of equal length
    Elements(slice::Iter<'a, Term>, slice::Iter<'a, Term>),
    /// Two maps of equal size, sorted by key. Entries `0..len` compare the
    /// keys and `len..2 * len` the values.
    Map {
        pairs: Vec<(&'a (Term, Term), &'a (Term, Term))>,
        next: usize,
    },
}

fn compare(a: &Term, b: &Term, mode: Mode) -> Ordering {
    compare_on(a, b, mode, &mut Vec::new())
}

fn compare_on<'a>(a: &'a Term, b: &'a Term, mode: Mode, stack: &mut Vec<Work<'a>>) -> Ordering {
    stack.clear();
    stack.push(Work::Pair(a, b));

    while let Some(work) = stack.pop() {
        let (a, b) = match work {
            Work::Pair(a, b) => (a, b),
            Work::Elements(mut xs, mut ys) => match (xs.next(), ys.next()) {
                (Some(a), Some(b)) => {
                    if xs.len() > 0 {
                        stack.push(Work::Elements(xs, ys));
                    }
                    (a, b)
                }
                _ => continue,
            },
            Work::Map { pairs, next } => {
                let (a, b) = match pairs.get(next) {
                    Some(&(x, y)) => (&x.0, &y.0),
                    None => match pairs.get(next - pairs.len()) {
                        Some(&(x, y)) => (&x.1, &y.1),
                        None => continue,
                    },
                };
                if next + 1 < 2 * pairs.len() {
                    stack.push(Work::Map {
                        pairs,
                        next: next + 1,
                    });
                }
                (a, b)
            }
        };
        let ordering = compare_shallow(a, b, mode, stack);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Check if two terms are the same compound term
fn is_same(a: &Term, b: &Term) -> bool {
    matches!(
        a,
        Term::Tuple(_) | Term::Map(_) | Term::List { .. } | Term::Fun { .. } | Term::Binary { .. }
    ) && ptr::eq(a, b)
}

/// Compare what can be compared without descending; push the children
fn compare_shallow<'a>(
    a: &'a Term,
    b: &'a Term,
    mode: Mode,
    stack: &mut Vec<Work<'a>>,
) -> Ordering {
    if is_same(a, b) {
        return Ordering::Equal;
    }

    let class = a.order_class().cmp(&b.order_class());
    if class != Ordering::Equal {
        return class;
    }

    match (a, b) {
        (Term::Atom(a), Term::Atom(b)) => cmp_atoms(a, b),
        (Term::Nil, Term::Nil) => Ordering::Equal,
        (
            Term::Ref {
                node: an,
                ids: ai,
                creation: ac,
            },
            Term::Ref {
                node: bn,
                ids: bi,
                creation: bc,
            },
        ) => cmp_atoms(an, bn)
            .then(ac.cmp(bc))
            .then_with(|| ai.iter().rev().cmp(bi.iter().rev())),
        (
            Term::Fun {
                module: am,
                function: af,
                arity: aa,
                env: ae,
            },
            Term::Fun {
                module: bm,
                function: bf,
                arity: ba,
                env: be,
            },
        ) => {
            let header = cmp_atoms(am, bm)
                .then_with(|| cmp_atoms(af, bf))
                .then(aa.cmp(ba))
                .then(ae.len().cmp(&be.len()));
            if header == Ordering::Equal {
                push_elements(ae, be, stack);
            }
            header
        }
        (
            Term::Port {
                node: an,
                id: ai,
                creation: ac,
            },
            Term::Port {
                node: bn,
                id: bi,
                creation: bc,
            },
        ) => cmp_atoms(an, bn).then(ac.cmp(bc)).then(ai.cmp(bi)),
        (
            Term::Pid {
                node: an,
                id: ai,
                serial: asr,
                creation: ac,
            },
            Term::Pid {
                node: bn,
                id: bi,
                serial: bsr,
                creation: bc,
            },
        ) => cmp_atoms(an, bn)
            .then(ac.cmp(bc))
            .then(asr.cmp(bsr))
            .then(ai.cmp(bi)),
        (Term::Tuple(ae), Term::Tuple(be)) => {
            let arity = ae.len().cmp(&be.len());
            if arity == Ordering::Equal {
                push_elements(ae, be, stack);
            }
            arity
        }
        (Term::Map(ap), Term::Map(bp)) => {
            let size = ap.len().cmp(&bp.len());
            if size == Ordering::Equal {
                push_map(ap, bp, stack);
            }
            size
        }
        (Term::List { head: ah, tail: at }, Term::List { head: bh, tail: bt }) => {
            stack.push(Work::Pair(&**at, &**bt));
            stack.push(Work::Pair(&**ah, &**bh));
            Ordering::Equal
        }
        (
            Term::Binary {
                data: ad,
                bit_offset: ao,
                bit_size: asz,
            },
            Term::Binary {
                data: bd,
                bit_offset: bo,
                bit_size: bsz,
            },
        ) => cmp_bits(ad, *ao, bd, *bo, (*asz).min(*bsz)).then(asz.cmp(bsz)),
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => {
                if mode == Mode::Equality && (is_nan(x) || is_nan(y)) {
                    // Any non-equal answer; NaN is never equal.
                    Ordering::Less
                } else {
                    cmp_numbers(x, y)
                }
            }
            // Same class means both are numbers; this arm is unreachable.
            _ => Ordering::Equal,
        },
    }
}

fn push_elements<'a>(a: &'a [Term], b: &'a [Term], stack: &mut Vec<Work<'a>>) {
    if !a.is_empty() {
        stack.push(Work::Elements(a.iter(), b.iter()));
    }
}

/// Maps compare keys in term order first, then the values in key order.
fn push_map<'a>(a: &'a [(Term, Term)], b: &'a [(Term, Term)], stack: &mut Vec<Work<'a>>) {
    if a.is_empty() {
        return;
    }
    let pairs = sorted_pairs(a).into_iter().zip(sorted_pairs(b)).collect();
    stack.push(Work::Map { pairs, next: 0 });
}

fn sorted_pairs(pairs: &[(Term, Term)]) -> Vec<&(Term, Term)> {
    let mut sorted: Vec<&(Term, Term)> = pairs.iter().collect();
    sorted.sort_by(|x, y| cmp(&x.0, &y.0));
    sorted
}

fn cmp_atoms(a: &Atom, b: &Atom) -> Ordering {
    if a.ptr_eq(b) {
        Ordering::Equal
    } else {
        a.name().cmp(b.name())
    }
}

fn is_nan(number: Number<'_>) -> bool {
    matches!(number, Number::Float(value) if value.is_nan())
}

/// Compare numbers by value. NaN is above every other number and equal to NaN.
fn cmp_numbers(a: Number<'_>, b: Number<'_>) -> Ordering {
    match (a, b) {
        (Number::Small(x), Number::Small(y)) => x.cmp(&y),
        (Number::Big(x), Number::Big(y)) => x.cmp(y),
        (Number::Small(x), Number::Big(y)) => cmp_int_big(x, y),
        (Number::Big(x), Number::Small(y)) => cmp_int_big(y, x).reverse(),
        (Number::Float(x), Number::Float(y)) => match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        },
        (Number::Small(x), Number::Float(y)) => cmp_int_float(x, y),
        (Number::Float(x), Number::Small(y)) => cmp_int_float(y, x).reverse(),
        (Number::Big(x), Number::Float(y)) => x.partial_cmp_f64(y).unwrap_or(Ordering::Less),
        (Number::Float(x), Number::Big(y)) => {
            y.partial_cmp_f64(x).unwrap_or(Ordering::Less).reverse()
        }
    }
}

fn cmp_int_big(x: i64, y: &BigNumber) -> Ordering {
    match y.to_i64() {
        Some(y) => x.cmp(&y),
        None if y.is_negative() => Ordering::Greater,
        None => Ordering::Less,
    }
}

fn cmp_int_float(x: i64, y: f64) -> Ordering {
    if y.is_nan() {
        return Ordering::Less;
    }
    if x.unsigned_abs() < EXACT_F64_INT {
        return (x as f64).partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    BigNumber::from_i64(x)
        .partial_cmp_f64(y)
        .unwrap_or(Ordering::Less)
}
