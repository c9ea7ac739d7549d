//! Output comparison and benchmark reports.
//!
//! Comparison never fails: a disagreement between the CPU reference and the
//! GPU candidate is a result ([`Verdict::Fail`]), not an error.

use std::fmt;
use std::time::Duration;

/// Outcome of one benchmark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The GPU output agrees with the reference.
    Pass,

    /// The GPU output disagrees with the reference.
    Fail,

    /// The GPU kernel is not a trusted implementation; its agreement with the
    /// reference is reported but not judged.
    Unverified,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Pass => "PASSED",
            Verdict::Fail => "FAILED",
            Verdict::Unverified => "UNVERIFIED",
        })
    }
}

/// First element at which two outputs disagree.
///
/// Values are widened to `f64`, which represents every `f32` and every byte
/// exactly. A missing value (outputs of different length) is `NaN`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mismatch {
    /// Element index.
    pub index: usize,

    /// Reference (CPU) value.
    pub reference: f64,

    /// Candidate (GPU) value.
    pub candidate: f64,
}

/// Summary of an element-wise comparison.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Comparison {
    /// Number of element pairs compared.
    pub compared: usize,

    /// Number of pairs outside tolerance (plus any length difference).
    pub mismatches: usize,

    /// First disagreement, if any.
    pub first: Option<Mismatch>,

    /// Largest absolute difference seen among compared pairs.
    pub max_abs_diff: f64,
}

impl Comparison {
    /// Returns `true` if every element agreed and the lengths matched.
    pub fn is_match(&self) -> bool {
        self.mismatches == 0
    }

    fn record(&mut self, index: usize, reference: f64, candidate: f64, ok: bool) {
        self.compared += 1;
        let diff = (reference - candidate).abs();
        if diff > self.max_abs_diff {
            self.max_abs_diff = diff;
        }
        if !ok {
            self.miss(index, reference, candidate);
        }
    }

    fn miss(&mut self, index: usize, reference: f64, candidate: f64) {
        self.mismatches += 1;
        if self.first.is_none() {
            self.first = Some(Mismatch { index, reference, candidate });
        }
    }

    fn finish_lengths(mut self, reference: usize, candidate: usize) -> Self {
        if reference != candidate {
            let index = reference.min(candidate);
            self.miss(index, f64::NAN, f64::NAN);
            self.mismatches += reference.max(candidate) - index - 1;
        }
        self
    }
}

/// Compares two `f32` outputs element by element.
///
/// A pair agrees when `|reference - candidate| <= tolerance`. `NaN` on either
/// side never agrees.
pub fn compare_f32(reference: &[f32], candidate: &[f32], tolerance: f32) -> Comparison {
    let tolerance = f64::from(tolerance);
    let mut cmp = Comparison::default();
    for (i, (&r, &c)) in reference.iter().zip(candidate).enumerate() {
        let (r, c) = (f64::from(r), f64::from(c));
        cmp.record(i, r, c, (r - c).abs() <= tolerance);
    }
    cmp.finish_lengths(reference.len(), candidate.len())
}

/// Compares two byte outputs exactly.
pub fn compare_bytes(reference: &[u8], candidate: &[u8]) -> Comparison {
    let mut cmp = Comparison::default();
    for (i, (&r, &c)) in reference.iter().zip(candidate).enumerate() {
        cmp.record(i, f64::from(r), f64::from(c), r == c);
    }
    cmp.finish_lengths(reference.len(), candidate.len())
}

/// Result of one benchmark run.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchReport {
    /// Benchmark name.
    pub name: &'static str,

    /// Wall-clock time of the CPU reference.
    pub cpu: Duration,

    /// Submission-to-idle time of the GPU dispatch.
    pub gpu: Duration,

    /// Outcome.
    pub verdict: Verdict,

    /// Element-wise comparison the verdict was derived from.
    pub comparison: Comparison,
}

impl BenchReport {
    /// CPU time divided by GPU time.
    pub fn speedup(&self) -> f64 {
        let gpu = self.gpu.as_secs_f64();
        if gpu == 0.0 {
            return f64::INFINITY;
        }
        self.cpu.as_secs_f64() / gpu
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} CPU time: {:.3} ms", self.name, self.cpu.as_secs_f64() * 1e3)?;
        writeln!(f, "{} GPU time: {:.3} ms", self.name, self.gpu.as_secs_f64() * 1e3)?;
        if let Some(m) = &self.comparison.first {
            writeln!(
                f,
                "{} mismatch at {}: CPU={} GPU={} ({} of {} differ)",
                self.name, m.index, m.reference, m.candidate, self.comparison.mismatches, self.comparison.compared
            )?;
        }
        write!(f, "{} verification: {}", self.name, self.verdict)
    }
}
