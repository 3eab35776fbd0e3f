//! Character-level alignment between a reference translation and a learner's answer.
//!
//! Every non-matching run is classified as:
//!   - `Missing`: present in the reference, absent from the candidate
//!   - `Extra`:   present in the candidate, absent from the reference
//!   - `Wrong`:   substituted at the same position
//!
//! The same convention holds on every path (lookahead, exhausted suffix, edit distance).
//! Comparison ignores letter case. `Edit` ranges are byte offsets into the original
//! strings; the `DiffResult` views sent to the front end count UTF-16 code units,
//! which is how JavaScript indexes the same text.

use std::ops::Range;

use serde::Serialize;

/// Above this many DP cells we fall back to the lookahead scan.
const MAX_DP_CELLS: usize = 1_000_000;

/// Resync window of the lookahead scan.
const LOOKAHEAD: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
  Missing,
  Extra,
  Wrong,
}

/// Which of the two compared strings a `DiffResult` is displayed against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
  Reference,
  Candidate,
}

/// One classified run with its byte range on both strings.
/// `Missing` has an empty candidate range (the insertion point), `Extra` an empty reference range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
  pub kind: SpanKind,
  pub reference: Range<usize>,
  pub candidate: Range<usize>,
}

/// Span on a displayed string, in UTF-16 code units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AlignmentSpan {
  pub start: usize,
  pub end: usize,
  #[serde(rename = "type")]
  pub kind: SpanKind,
}

/// Spans projected onto one side. Invariant: every span has `start < end <= text.encode_utf16().count()`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiffResult {
  pub text: String,
  #[serde(rename = "diffs")]
  pub spans: Vec<AlignmentSpan>,
}

impl DiffResult {
  #[allow(dead_code)]
  /// Text covered by each span, in order.
  pub fn fragments(&self) -> Vec<(&str, SpanKind)> {
    self.spans.iter()
      .map(|s| (&self.text[byte_offset(&self.text, s.start)..byte_offset(&self.text, s.end)], s.kind))
      .collect()
  }
}

/// Byte offset of the char starting at UTF-16 offset `unit` (or the end of `text`).
#[allow(dead_code)]
fn byte_offset(text: &str, unit: usize) -> usize {
  let mut units = 0;
  for (i, ch) in text.char_indices() {
    if units >= unit {
      return i;
    }
    units += ch.len_utf16();
  }
  text.len()
}

/// Converts increasing byte offsets into UTF-16 offsets in one forward pass.
struct Utf16Cursor<'a> {
  text: &'a str,
  byte: usize,
  unit: usize,
}

impl<'a> Utf16Cursor<'a> {
  fn new(text: &'a str) -> Self {
    Self { text, byte: 0, unit: 0 }
  }

  fn advance_to(&mut self, byte: usize) -> usize {
    self.unit += self.text[self.byte..byte].encode_utf16().count();
    self.byte = byte;
    self.unit
  }
}

#[derive(Clone, Debug)]
pub struct Alignment {
  reference: String,
  candidate: String,
  edits: Vec<Edit>,
}

#[allow(dead_code)]
impl Alignment {
  pub fn reference(&self) -> &str { &self.reference }
  pub fn candidate(&self) -> &str { &self.candidate }
  pub fn edits(&self) -> &[Edit] { &self.edits }

  /// Number of edits; 0 means the strings are equal ignoring case.
  /// Counts every `Missing`, `Extra` and `Wrong` run once, so it can exceed the span
  /// count of a single view.
  pub fn distance(&self) -> usize { self.edits.len() }

  /// Number of characters touched by the edits, counted on the longer side of each edit.
  pub fn edited_chars(&self) -> usize {
    self.edits.iter()
      .map(|e| {
        let r = self.reference[e.reference.clone()].chars().count();
        let c = self.candidate[e.candidate.clone()].chars().count();
        r.max(c)
      })
      .sum()
  }

  pub fn view(&self, side: Side) -> DiffResult {
    let text = match side {
      Side::Reference => &self.reference,
      Side::Candidate => &self.candidate,
    };
    let mut cursor = Utf16Cursor::new(text);
    let spans = self.edits.iter()
      .filter_map(|e| {
        let r = match side {
          Side::Reference => &e.reference,
          Side::Candidate => &e.candidate,
        };
        (r.start < r.end).then(|| AlignmentSpan {
          start: cursor.advance_to(r.start),
          end: cursor.advance_to(r.end),
          kind: e.kind,
        })
      })
      .collect();
    DiffResult { text: text.clone(), spans }
  }

  /// Apply the edits to the candidate. Equals the reference up to letter case,
  /// since matched characters are taken from the candidate.
  pub fn reconstruct_reference(&self) -> String {
    let mut out = String::with_capacity(self.reference.len());
    let mut cursor = 0;
    for e in &self.edits {
      out.push_str(&self.candidate[cursor..e.candidate.start]);
      match e.kind {
        SpanKind::Missing | SpanKind::Wrong => out.push_str(&self.reference[e.reference.clone()]),
        SpanKind::Extra => {}
      }
      cursor = e.candidate.end;
    }
    out.push_str(&self.candidate[cursor..]);
    out
  }
}

/// One acceptable translation scored against the learner's answer.
#[derive(Clone, Debug, Serialize)]
pub struct RankedCandidate {
  #[serde(rename = "translation")]
  pub candidate_text: String,
  /// Spans painted on the acceptable translation.
  #[serde(rename = "diffs")]
  pub diff: DiffResult,
  /// Spans painted on the learner's answer.
  #[serde(rename = "userDiffs")]
  pub user_diff: DiffResult,
  /// Edits in the alignment: `Missing` spans show up only in `diffs`, `Extra` only in
  /// `userDiffs`, and `Wrong` in both.
  pub distance: usize,
  #[serde(skip)]
  pub edited_chars: usize,
}

/// Align `candidate` against `reference`.
///
/// Uses a minimum edit distance alignment; inputs too large for the DP table go
/// through the bounded lookahead scan instead.
pub fn align(reference: &str, candidate: &str) -> Alignment {
  let r = Indexed::new(reference);
  let c = Indexed::new(candidate);
  let cells = (r.len() + 1).saturating_mul(c.len() + 1);
  let ops = if cells <= MAX_DP_CELLS {
    edit_distance_ops(&r.chars, &c.chars)
  } else {
    scan_ops(&r.chars, &c.chars)
  };
  collapse(reference, candidate, &r, &c, &ops)
}

/// Greedy forward scan with a two-character resync window.
/// Linear time, but runs longer than the window degrade into several `Wrong` spans.
#[allow(dead_code)]
pub fn scan_align(reference: &str, candidate: &str) -> Alignment {
  let r = Indexed::new(reference);
  let c = Indexed::new(candidate);
  let ops = scan_ops(&r.chars, &c.chars);
  collapse(reference, candidate, &r, &c, &ops)
}

/// Rank `references` (canonical first, then alternates) by distance to `candidate`.
/// Stable: equal distances keep input order, so the canonical wins ties.
pub fn rank_by_closeness<S: AsRef<str>>(candidate: &str, references: &[S]) -> Vec<RankedCandidate> {
  let mut ranked: Vec<RankedCandidate> = references.iter()
    .map(|reference| {
      let alignment = align(reference.as_ref(), candidate);
      RankedCandidate {
        candidate_text: reference.as_ref().to_string(),
        diff: alignment.view(Side::Reference),
        user_diff: alignment.view(Side::Candidate),
        distance: alignment.distance(),
        edited_chars: alignment.edited_chars(),
      }
    })
    .collect();
  ranked.sort_by_key(|r| r.distance);
  ranked
}

/// Case-insensitive full-string equality against any accepted text.
pub fn is_exact_match<'a, I>(candidate: &str, accepted: I) -> bool
where
  I: IntoIterator<Item = &'a str>,
{
  let wanted = candidate.to_lowercase();
  accepted.into_iter().any(|t| t.to_lowercase() == wanted)
}

// -------- internals --------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
  Match,
  Wrong,
  Missing,
  Extra,
}

/// Chars of a string plus the byte offset of each (and one past the end).
struct Indexed {
  chars: Vec<char>,
  offsets: Vec<usize>,
}

impl Indexed {
  fn new(s: &str) -> Self {
    let mut chars = Vec::with_capacity(s.len());
    let mut offsets = Vec::with_capacity(s.len() + 1);
    for (i, ch) in s.char_indices() {
      offsets.push(i);
      chars.push(ch);
    }
    offsets.push(s.len());
    Self { chars, offsets }
  }

  fn len(&self) -> usize { self.chars.len() }
}

fn same(a: char, b: char) -> bool {
  a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Wagner–Fischer over suffixes, then a forward traceback so gaps land after
/// the longest common prefix. Preference on ties: match, wrong, missing, extra.
fn edit_distance_ops(r: &[char], c: &[char]) -> Vec<Op> {
  let (n, m) = (r.len(), c.len());
  let w = m + 1;
  // cost[i * w + j] = distance(r[i..], c[j..])
  let mut cost = vec![0u32; (n + 1) * w];
  for i in (0..=n).rev() {
    for j in (0..=m).rev() {
      cost[i * w + j] = if i == n {
        (m - j) as u32
      } else if j == m {
        (n - i) as u32
      } else if same(r[i], c[j]) {
        cost[(i + 1) * w + j + 1]
      } else {
        1 + cost[(i + 1) * w + j + 1]
          .min(cost[(i + 1) * w + j])
          .min(cost[i * w + j + 1])
      };
    }
  }

  let mut ops = Vec::with_capacity(n.max(m));
  let (mut i, mut j) = (0, 0);
  while i < n || j < m {
    let op = if i == n {
      Op::Extra
    } else if j == m {
      Op::Missing
    } else if same(r[i], c[j]) {
      Op::Match
    } else {
      let here = cost[i * w + j];
      if here == cost[(i + 1) * w + j + 1] + 1 {
        Op::Wrong
      } else if here == cost[(i + 1) * w + j] + 1 {
        Op::Missing
      } else {
        Op::Extra
      }
    };
    match op {
      Op::Match | Op::Wrong => { i += 1; j += 1; }
      Op::Missing => i += 1,
      Op::Extra => j += 1,
    }
    ops.push(op);
  }
  ops
}

fn scan_ops(r: &[char], c: &[char]) -> Vec<Op> {
  let mut ops = Vec::with_capacity(r.len().max(c.len()));
  let (mut i, mut j) = (0, 0);
  while i < r.len() && j < c.len() {
    if same(r[i], c[j]) {
      ops.push(Op::Match);
      i += 1;
      j += 1;
      continue;
    }

    let mut resynced = false;
    for k in 1..=LOOKAHEAD {
      if i + k < r.len() && same(r[i + k], c[j]) {
        ops.extend(std::iter::repeat(Op::Missing).take(k));
        i += k;
        resynced = true;
        break;
      }
      if j + k < c.len() && same(c[j + k], r[i]) {
        ops.extend(std::iter::repeat(Op::Extra).take(k));
        j += k;
        resynced = true;
        break;
      }
    }
    if !resynced {
      ops.push(Op::Wrong);
      i += 1;
      j += 1;
    }
  }
  // Exhausted side: whatever is left on the other one is a single suffix span.
  ops.extend(std::iter::repeat(Op::Missing).take(r.len() - i));
  ops.extend(std::iter::repeat(Op::Extra).take(c.len() - j));
  ops
}

/// Turn per-char ops into byte-range edits, merging adjacent runs of the same kind.
fn collapse(reference: &str, candidate: &str, r: &Indexed, c: &Indexed, ops: &[Op]) -> Alignment {
  let mut edits: Vec<Edit> = Vec::new();
  let (mut i, mut j) = (0, 0);
  for op in ops {
    let (di, dj, kind) = match op {
      Op::Match => (1, 1, None),
      Op::Wrong => (1, 1, Some(SpanKind::Wrong)),
      Op::Missing => (1, 0, Some(SpanKind::Missing)),
      Op::Extra => (0, 1, Some(SpanKind::Extra)),
    };
    if let Some(kind) = kind {
      let rr = r.offsets[i]..r.offsets[i + di];
      let cr = c.offsets[j]..c.offsets[j + dj];
      match edits.last_mut() {
        Some(last) if last.kind == kind && last.reference.end == rr.start && last.candidate.end == cr.start => {
          last.reference.end = rr.end;
          last.candidate.end = cr.end;
        }
        _ => edits.push(Edit { kind, reference: rr, candidate: cr }),
      }
    }
    i += di;
    j += dj;
  }

  Alignment {
    reference: reference.to_string(),
    candidate: candidate.to_string(),
    edits,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assert_round_trip(a: &Alignment) {
    assert_eq!(
      a.reconstruct_reference().to_lowercase(),
      a.reference().to_lowercase(),
      "edits {:?} do not rebuild {:?} from {:?}", a.edits(), a.reference(), a.candidate()
    );
  }

  fn assert_views_valid(a: &Alignment) {
    for side in [Side::Reference, Side::Candidate] {
      let v = a.view(side);
      let mut last_end = 0;
      for s in &v.spans {
        assert!(s.start < s.end && s.end <= v.text.encode_utf16().count(), "bad span {:?} on {:?}", s, v.text);
        assert!(s.start >= last_end, "overlapping spans on {:?}", v.text);
        last_end = s.end;
      }
    }
  }

  #[test]
  fn identical_strings_have_no_spans() {
    for s in ["", "a", "Desayuno todas las mañanas", "Él es médico"] {
      assert_eq!(align(s, s).distance(), 0);
      assert_eq!(scan_align(s, s).distance(), 0);
    }
  }

  #[test]
  fn comparison_ignores_case() {
    let a = align("ABC", "abc");
    assert_eq!(a.distance(), 0);
    assert_eq!(align("ÉL ES MÉDICO", "él es médico").distance(), 0);
  }

  #[test]
  fn empty_reference_makes_whole_candidate_extra() {
    let a = align("", "hola");
    assert_eq!(a.edits(), &[Edit { kind: SpanKind::Extra, reference: 0..0, candidate: 0..4 }]);
    let v = a.view(Side::Candidate);
    assert_eq!(v.fragments(), vec![("hola", SpanKind::Extra)]);
    assert!(a.view(Side::Reference).spans.is_empty());
  }

  #[test]
  fn empty_candidate_makes_whole_reference_missing() {
    let a = align("hola", "");
    assert_eq!(a.edits(), &[Edit { kind: SpanKind::Missing, reference: 0..4, candidate: 0..0 }]);
    assert_eq!(a.view(Side::Reference).fragments(), vec![("hola", SpanKind::Missing)]);
    let s = scan_align("hola", "");
    assert_eq!(s.edits(), a.edits());
  }

  #[test]
  fn single_substitution_is_one_wrong_span() {
    let a = align("Ella trabaja en un hospital", "Ella trabaja en un hospitol");
    assert_eq!(a.distance(), 1);
    assert_eq!(a.edits()[0].kind, SpanKind::Wrong);
    assert_eq!(a.view(Side::Reference).fragments(), vec![("a", SpanKind::Wrong)]);
    assert_eq!(a.view(Side::Candidate).fragments(), vec![("o", SpanKind::Wrong)]);
    assert_eq!(a.edits()[0].reference, 25..26);
    assert_round_trip(&a);
  }

  #[test]
  fn dropped_word_is_one_missing_span() {
    let a = align("La sopa está muy caliente", "La sopa está caliente");
    assert_eq!(a.distance(), 1);
    assert_eq!(a.view(Side::Reference).fragments(), vec![("muy ", SpanKind::Missing)]);
    assert!(a.view(Side::Candidate).spans.is_empty());
    assert_round_trip(&a);
  }

  #[test]
  fn added_word_is_one_extra_span() {
    let a = align("La sopa está caliente", "La sopa está muy caliente");
    assert_eq!(a.distance(), 1);
    assert_eq!(a.view(Side::Candidate).fragments(), vec![("muy ", SpanKind::Extra)]);
    assert!(a.view(Side::Reference).spans.is_empty());
    assert_round_trip(&a);
  }

  #[test]
  fn offsets_respect_multibyte_chars() {
    let a = align("Él es médico", "El es medico");
    assert_eq!(a.distance(), 2);
    let v = a.view(Side::Reference);
    assert_eq!(v.fragments(), vec![("É", SpanKind::Wrong), ("é", SpanKind::Wrong)]);
    let u = a.view(Side::Candidate);
    assert_eq!(u.fragments(), vec![("E", SpanKind::Wrong), ("e", SpanKind::Wrong)]);
    assert_round_trip(&a);
  }

  #[test]
  fn view_offsets_count_utf16_units() {
    let v = align("La sopa está muy caliente", "La sopa está caliente").view(Side::Reference);
    assert_eq!(v.spans, vec![AlignmentSpan { start: 13, end: 17, kind: SpanKind::Missing }]);
    let units: Vec<u16> = v.text.encode_utf16().collect();
    assert_eq!(String::from_utf16(&units[13..17]).unwrap(), "muy ");

    // Astral chars take two units.
    let v = align("😀 sí café", "😀 si café").view(Side::Candidate);
    assert_eq!(v.spans, vec![AlignmentSpan { start: 4, end: 5, kind: SpanKind::Wrong }]);
    assert_eq!(v.fragments(), vec![("i", SpanKind::Wrong)]);
  }

  #[test]
  fn original_casing_is_preserved_in_views() {
    let a = align("desayuno", "DESAYUNA");
    let u = a.view(Side::Candidate);
    assert_eq!(u.text, "DESAYUNA");
    assert_eq!(u.fragments(), vec![("A", SpanKind::Wrong)]);
  }

  #[test]
  fn mixed_edits_round_trip() {
    let pairs = [
      ("Desayuno todas las mañanas", "Como el desayuno todas las mañanas"),
      ("Tomo el desayuno todas las mañanas", "desayuno toda la mañana"),
      ("Él es médico", "Es un doctor"),
      ("abc", "xyz"),
      ("", ""),
      ("a", "bbbbbb"),
    ];
    for (r, c) in pairs {
      let a = align(r, c);
      assert_round_trip(&a);
      assert_views_valid(&a);
      let s = scan_align(r, c);
      assert_round_trip(&s);
      assert_views_valid(&s);
    }
  }

  #[test]
  fn scan_resyncs_within_window() {
    let a = scan_align("abc", "ac");
    assert_eq!(a.view(Side::Reference).fragments(), vec![("b", SpanKind::Missing)]);
    let b = scan_align("ac", "abc");
    assert_eq!(b.view(Side::Candidate).fragments(), vec![("b", SpanKind::Extra)]);
    let c = scan_align("abcd", "ad");
    assert_eq!(c.view(Side::Reference).fragments(), vec![("bc", SpanKind::Missing)]);
  }

  #[test]
  fn scan_splits_runs_longer_than_window() {
    // Four dropped chars exceed the window, so the scan reports wrong characters
    // where the edit distance alignment finds one missing run.
    let scan = scan_align("La sopa está muy caliente", "La sopa está caliente");
    assert!(scan.distance() >= 1);
    assert!(scan.edits().iter().any(|e| e.kind == SpanKind::Wrong));
    assert_round_trip(&scan);
    assert_eq!(align("La sopa está muy caliente", "La sopa está caliente").distance(), 1);
  }

  #[test]
  fn ranking_is_sorted_and_stable() {
    let refs = ["Él es médico", "Es médico", "Él es doctor"];
    let ranked = rank_by_closeness("Él es medico", &refs);
    assert_eq!(ranked.len(), 3);
    assert!(ranked.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert_eq!(ranked[0].candidate_text, "Él es médico");
    assert_eq!(ranked[0].distance, 1);

    // Two references equally far from the answer keep their input order.
    let ranked = rank_by_closeness("xyz", &["abc", "def"]);
    assert_eq!(ranked[0].distance, ranked[1].distance);
    assert_eq!(ranked[0].candidate_text, "abc");
    assert_eq!(ranked[1].candidate_text, "def");
  }

  #[test]
  fn distance_counts_edits_across_both_views() {
    let ranked = rank_by_closeness("Yo como el desayuno toda las mañanas", &["Desayuno todas las mañanas"]);
    let best = &ranked[0];
    let wrong = best.diff.spans.iter().filter(|s| s.kind == SpanKind::Wrong).count();
    assert_eq!(best.distance, best.diff.spans.len() + best.user_diff.spans.len() - wrong);
    assert!(best.user_diff.spans.iter().any(|s| s.kind == SpanKind::Extra));
  }

  #[test]
  fn oversized_inputs_fall_back_to_scan() {
    let filler = "abcdefghij".repeat(55);
    let reference = format!("{filler}muy {filler}");
    let candidate = format!("{filler}{filler}");
    assert!((reference.chars().count() + 1) * (candidate.chars().count() + 1) > MAX_DP_CELLS);

    let a = align(&reference, &candidate);
    assert_eq!(a.edits(), scan_align(&reference, &candidate).edits());
    // The edit distance alignment would report a single missing run here.
    assert!(a.edits().iter().any(|e| e.kind == SpanKind::Wrong));
    assert_views_valid(&a);
    assert_round_trip(&a);
  }

  #[test]
  fn ranking_empty_reference_list_is_empty() {
    let refs: [&str; 0] = [];
    assert!(rank_by_closeness("hola", &refs).is_empty());
  }

  #[test]
  fn exact_match_is_case_insensitive() {
    let accepted = ["Desayuno todas las mañanas", "Como el desayuno todas las mañanas"];
    assert!(is_exact_match("desayuno todas las mañanas", accepted));
    assert!(is_exact_match("COMO EL DESAYUNO TODAS LAS MAÑANAS", accepted));
    assert!(!is_exact_match("desayuno todas las mañana", accepted));
  }

  #[test]
  fn edited_chars_counts_longer_side() {
    let a = align("La sopa está muy caliente", "La sopa está caliente");
    assert_eq!(a.edited_chars(), 4);
    assert_eq!(align("abc", "xbc").edited_chars(), 1);
  }

  #[test]
  fn spans_serialize_with_type_tag() {
    let v = align("hospital", "hospitol").view(Side::Reference);
    let json = serde_json::to_value(&v).unwrap();
    assert_eq!(json["text"], "hospital");
    assert_eq!(json["diffs"][0]["type"], "wrong");
    assert_eq!(json["diffs"][0]["start"], 6);
    assert_eq!(json["diffs"][0]["end"], 7);
  }
}
