//! CPU reference for multi-scalar multiplication over BLS12-381 G1.
//!
//! Computes `Σ scalar_i · point_i` with the Pippenger implementation of
//! `ark-ec`.
//!
//! ## Record layout
//! Points and scalars cross the host/GPU boundary as fixed-size byte records,
//! never as in-memory library types:
//!
//! | record           | size | contents                                          |
//! |------------------|------|---------------------------------------------------|
//! | [`PointRecord`]  | 96   | affine `x` then `y`, each a canonical 48-byte LE `Fq` |
//! | [`ScalarRecord`] | 32   | little-endian integer, reduced modulo `r`         |
//!
//! The point at infinity is encoded as 96 zero bytes. `(0, 0)` is not on the
//! curve, so the encoding is unambiguous.

use ark_bls12_381::{Fq, Fr, G1Affine, G1Projective};
use ark_ec::scalar_mul::variable_base::VariableBaseMSM;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::PrimeField;
use ark_serialize::CanonicalDeserialize;
use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;

use crate::engine::error::{OracleError, OracleResult};
use crate::engine::random::XorShift64;
use crate::engine::types::MsmParams;

/// Encoded size of one base-field element.
pub const FQ_BYTES: usize = 48;

/// Encoded size of one [`PointRecord`].
pub const POINT_BYTES: usize = 2 * FQ_BYTES;

/// Encoded size of one [`ScalarRecord`].
pub const SCALAR_BYTES: usize = 32;

/// Affine G1 point as stored in device buffers.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct PointRecord {
    /// `x` coordinate, canonical little-endian.
    pub x: [u8; FQ_BYTES],

    /// `y` coordinate, canonical little-endian.
    pub y: [u8; FQ_BYTES],
}

impl PointRecord {
    /// The point at infinity.
    pub const INFINITY: Self = Self {
        x: [0; FQ_BYTES],
        y: [0; FQ_BYTES],
    };

    /// Encodes an affine point.
    pub fn from_affine(point: &G1Affine) -> Self {
        if point.is_zero() {
            return Self::INFINITY;
        }
        Self {
            x: encode_fq(&point.x),
            y: encode_fq(&point.y),
        }
    }

    /// Decodes the record.
    ///
    /// Rejects coordinates `>= p`, points off the curve and points outside the
    /// prime-order subgroup. `index` only labels the error.
    pub fn to_affine(&self, index: usize) -> OracleResult<G1Affine> {
        if self.is_infinity() {
            return Ok(G1Affine::identity());
        }

        let invalid = |reason| OracleError::InvalidPoint { index, reason };
        let x = decode_fq(&self.x).ok_or_else(|| invalid("x is not a canonical field element"))?;
        let y = decode_fq(&self.y).ok_or_else(|| invalid("y is not a canonical field element"))?;

        let point = G1Affine::new_unchecked(x, y);
        if !point.is_on_curve() {
            return Err(invalid("not on the curve"));
        }
        if !point.is_in_correct_subgroup_assuming_on_curve() {
            return Err(invalid("not in the prime-order subgroup"));
        }
        Ok(point)
    }

    /// Returns `true` for the all-zero encoding.
    pub fn is_infinity(&self) -> bool {
        *self == Self::INFINITY
    }
}

/// Scalar as stored in device buffers.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct ScalarRecord {
    /// Little-endian integer bytes.
    pub bytes: [u8; SCALAR_BYTES],
}

impl ScalarRecord {
    /// Encodes a scalar-field element canonically.
    pub fn from_scalar(scalar: &Fr) -> Self {
        let mut bytes = [0u8; SCALAR_BYTES];
        let limbs = scalar.into_bigint().0;
        for (chunk, limb) in bytes.chunks_exact_mut(8).zip(limbs) {
            chunk.copy_from_slice(&limb.to_le_bytes());
        }
        Self { bytes }
    }

    /// Interprets the bytes as an integer modulo `r`.
    pub fn to_scalar(&self) -> Fr {
        Fr::from_le_bytes_mod_order(&self.bytes)
    }
}

fn encode_fq(value: &Fq) -> [u8; FQ_BYTES] {
    let mut out = [0u8; FQ_BYTES];
    let limbs = value.into_bigint().0;
    for (chunk, limb) in out.chunks_exact_mut(8).zip(limbs) {
        chunk.copy_from_slice(&limb.to_le_bytes());
    }
    out
}

fn decode_fq(bytes: &[u8; FQ_BYTES]) -> Option<Fq> {
    // Canonical deserialization rejects values >= p.
    Fq::deserialize_compressed(&bytes[..]).ok()
}

/// Views a byte buffer as point records.
pub fn points_from_bytes(bytes: &[u8]) -> OracleResult<&[PointRecord]> {
    records_from_bytes("point", bytes)
}

/// Views a byte buffer as scalar records.
pub fn scalars_from_bytes(bytes: &[u8]) -> OracleResult<&[ScalarRecord]> {
    records_from_bytes("scalar", bytes)
}

fn records_from_bytes<'a, T: Pod>(record: &'static str, bytes: &'a [u8]) -> OracleResult<&'a [T]> {
    let size = std::mem::size_of::<T>();
    if bytes.len() % size != 0 {
        return Err(OracleError::RecordLength { record, len: bytes.len(), size });
    }
    // Records are byte arrays (align 1), so the cast cannot fail on alignment.
    bytemuck::try_cast_slice(bytes).map_err(|_| OracleError::RecordLength {
        record,
        len: bytes.len(),
        size,
    })
}

/// Multi-scalar multiplication of the first `params.points` pairs.
///
/// ## Returns
/// The sum as one affine [`PointRecord`]; an empty sum is the point at
/// infinity.
///
/// ## Errors
/// * [`OracleError::ShapeMismatch`] - fewer records than `params.points`.
/// * [`OracleError::InvalidPoint`] - a point record fails to decode.
pub fn msm(points: &[PointRecord], scalars: &[ScalarRecord], params: &MsmParams) -> OracleResult<PointRecord> {
    let count = params.points as usize;
    if points.len() < count {
        return Err(OracleError::ShapeMismatch {
            buffer: "points",
            expected: count,
            actual: points.len(),
        });
    }
    if scalars.len() < count {
        return Err(OracleError::ShapeMismatch {
            buffer: "scalars",
            expected: count,
            actual: scalars.len(),
        });
    }

    let bases = points[..count]
        .par_iter()
        .enumerate()
        .map(|(i, p)| p.to_affine(i))
        .collect::<OracleResult<Vec<G1Affine>>>()?;
    let exps: Vec<Fr> = scalars[..count].par_iter().map(ScalarRecord::to_scalar).collect();

    let sum = G1Projective::msm(&bases, &exps).map_err(|shorter| OracleError::ShapeMismatch {
        buffer: "scalars",
        expected: count,
        actual: shorter,
    })?;

    Ok(PointRecord::from_affine(&sum.into_affine()))
}

/// Generates `count` pairs `(s_i · G, s_i)` with `s_i` uniform modulo `r`.
///
/// Each pair draws from its own forked stream, so the output depends only on
/// the generator state and `count`, not on the thread pool.
pub fn generate_inputs(rng: &mut XorShift64, count: usize) -> (Vec<PointRecord>, Vec<ScalarRecord>) {
    let base = rng.clone();
    rng.next_u64();

    let scalars: Vec<Fr> = (0..count)
        .into_par_iter()
        .map(|i| {
            let mut bytes = [0u8; SCALAR_BYTES];
            base.fork(i as u64).fill_bytes(&mut bytes);
            Fr::from_le_bytes_mod_order(&bytes)
        })
        .collect();

    let generator = G1Affine::generator();
    let projective: Vec<G1Projective> = scalars.par_iter().map(|s| generator * *s).collect();
    let affine = G1Projective::normalize_batch(&projective);

    let points = affine.par_iter().map(PointRecord::from_affine).collect();
    let scalars = scalars.par_iter().map(ScalarRecord::from_scalar).collect();
    (points, scalars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{One, Zero};

    #[test]
    fn record_sizes() {
        assert_eq!(std::mem::size_of::<PointRecord>(), POINT_BYTES);
        assert_eq!(std::mem::size_of::<ScalarRecord>(), SCALAR_BYTES);
    }

    #[test]
    fn generator_survives_encoding() {
        let g = G1Affine::generator();
        let record = PointRecord::from_affine(&g);
        assert!(!record.is_infinity());
        assert_eq!(record.to_affine(0).unwrap(), g);
    }

    #[test]
    fn infinity_is_all_zero() {
        let record = PointRecord::from_affine(&G1Affine::identity());
        assert_eq!(record, PointRecord::INFINITY);
        assert!(record.to_affine(0).unwrap().is_zero());
    }

    #[test]
    fn off_curve_point_is_rejected() {
        let mut record = PointRecord::from_affine(&G1Affine::generator());
        record.y[0] ^= 1;
        let err = record.to_affine(7).unwrap_err();
        assert_eq!(err, OracleError::InvalidPoint { index: 7, reason: "not on the curve" });
    }

    #[test]
    fn non_canonical_coordinate_is_rejected() {
        let mut record = PointRecord::from_affine(&G1Affine::generator());
        record.x = [0xff; FQ_BYTES];
        let err = record.to_affine(1).unwrap_err();
        assert!(matches!(err, OracleError::InvalidPoint { index: 1, .. }));
    }

    #[test]
    fn scalar_reduces_modulo_order() {
        let record = ScalarRecord { bytes: [0xff; SCALAR_BYTES] };
        let reduced = record.to_scalar();
        assert_eq!(ScalarRecord::from_scalar(&reduced).to_scalar(), reduced);
        assert_eq!(ScalarRecord::from_scalar(&Fr::one()).bytes[0], 1);
    }

    #[test]
    fn single_point_times_one_is_the_point() {
        let mut rng = XorShift64::new(11);
        let (points, _) = generate_inputs(&mut rng, 1);
        let one = [ScalarRecord::from_scalar(&Fr::one())];

        let result = msm(&points, &one, &MsmParams { points: 1 }).unwrap();
        assert_eq!(result, points[0]);
    }

    #[test]
    fn matches_naive_sum() {
        let mut rng = XorShift64::new(3);
        let (points, scalars) = generate_inputs(&mut rng, 16);

        let mut expected = G1Projective::zero();
        for (p, s) in points.iter().zip(&scalars) {
            expected += p.to_affine(0).unwrap() * s.to_scalar();
        }

        let result = msm(&points, &scalars, &MsmParams { points: 16 }).unwrap();
        assert_eq!(result, PointRecord::from_affine(&expected.into_affine()));
    }

    #[test]
    fn zero_points_sum_to_infinity() {
        let result = msm(&[], &[], &MsmParams { points: 0 }).unwrap();
        assert!(result.is_infinity());
    }

    #[test]
    fn only_the_requested_prefix_is_consumed() {
        let mut rng = XorShift64::new(5);
        let (points, scalars) = generate_inputs(&mut rng, 4);
        let prefix = msm(&points[..2], &scalars[..2], &MsmParams { points: 2 }).unwrap();
        let full = msm(&points, &scalars, &MsmParams { points: 2 }).unwrap();
        assert_eq!(prefix, full);
    }

    #[test]
    fn short_input_is_rejected() {
        let err = msm(&[], &[], &MsmParams { points: 1 }).unwrap_err();
        assert!(matches!(err, OracleError::ShapeMismatch { buffer: "points", .. }));
    }

    #[test]
    fn generation_is_deterministic() {
        let (p1, s1) = generate_inputs(&mut XorShift64::new(9), 8);
        let (p2, s2) = generate_inputs(&mut XorShift64::new(9), 8);
        assert_eq!(p1, p2);
        assert_eq!(s1, s2);
    }

    #[test]
    fn byte_views_check_record_length() {
        let bytes = vec![0u8; POINT_BYTES * 2];
        assert_eq!(points_from_bytes(&bytes).unwrap().len(), 2);
        assert!(matches!(
            scalars_from_bytes(&bytes[..33]),
            Err(OracleError::RecordLength { record: "scalar", len: 33, size: 32 })
        ));
    }
}
