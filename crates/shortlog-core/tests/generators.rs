use proptest::prelude::*;

/// Candidate markers: `@` followed by one to three letters.
pub fn arb_candidates() -> impl Strategy<Value = Vec<String>> + Clone {
    prop::collection::vec("@[a-c]{1,3}", 1..4)
}

/// A log built from plain text, terminators and candidate occurrences.
pub fn arb_log(candidates: Vec<String>) -> impl Strategy<Value = Vec<u8>> {
    let piece = prop_oneof![
        4 => "[a-z .@]{0,12}".prop_map(String::into_bytes),
        2 => Just(b"\n".to_vec()),
        1 => Just(b"\r\n".to_vec()),
        2 => prop::sample::select(candidates).prop_map(String::into_bytes),
    ];
    prop::collection::vec(piece, 0..500).prop_map(|pieces| pieces.concat())
}

/// Candidates plus a log that uses them.
pub fn arb_marked_log() -> impl Strategy<Value = (Vec<String>, Vec<u8>)> {
    arb_candidates().prop_flat_map(|candidates| (Just(candidates.clone()), arb_log(candidates)))
}

/// Preamble locator for `@`-prefixed markers.
pub fn at_sign(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?.iter().position(|&b| b == b'@').map(|i| i + from)
}

/// Whole-buffer reference for the scanner: the latest marker beginning at or
/// before the target and the bytes from the target through the terminator.
pub fn reference_scan(
    log: &[u8],
    candidates: &[String],
    tail_bytes: u64,
    eol: &[u8],
) -> Option<(Option<String>, Vec<u8>)> {
    let target = usize::try_from((log.len() as u64).saturating_sub(tail_bytes)).ok()?;
    let rest = &log[target..];
    let eol_at = rest.windows(eol.len()).position(|w| w == eol)?;
    let line = rest[..eol_at + eol.len()].to_vec();

    let mut ordered: Vec<&String> = candidates.iter().filter(|c| !c.is_empty()).collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    ordered.dedup();

    let marker = (0..=target.min(log.len().saturating_sub(1)))
        .rev()
        .filter(|&pos| pos <= target && log.get(pos) == Some(&b'@'))
        .find_map(|pos| {
            ordered
                .iter()
                .find(|c| log.len() - pos > c.len() && &log[pos..pos + c.len()] == c.as_bytes())
                .map(|c| (*c).clone())
        });

    Some((marker, line))
}
