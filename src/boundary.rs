//! Embedded-script boundary detection for host markup.
//!
//! Balanced literal tag matching: each `<script ...>` pairs with the nearest
//! following `</script>`. No nesting, no attribute parsing, no awareness of
//! comments or CDATA in the host language. An opening tag without a
//! matching close produces no region.

use memchr::memchr;

use crate::types::ScriptRegion;

/// All script regions in `text`, in document order.
#[must_use]
pub fn find_regions(text: &str) -> Vec<ScriptRegion> {
    let bytes = text.as_bytes();
    let mut regions = Vec::new();
    let mut pos = 0;

    while let Some(open) = find_tag(bytes, pos, b"script") {
        let Some(gt) = memchr(b'>', &bytes[open..]) else {
            break;
        };
        let start = open + gt + 1;
        let Some(close) = find_tag(bytes, start, b"/script") else {
            break;
        };
        let Some(close_gt) = memchr(b'>', &bytes[close..]) else {
            break;
        };
        regions.push(ScriptRegion { start, end: close });
        pos = close + close_gt + 1;
    }

    regions
}

/// Is `offset` inside (or on the edge of) any script region?
#[must_use]
pub fn is_inside(text: &str, offset: usize) -> bool {
    region_at(text, offset).is_some()
}

/// The region containing `offset`, if any.
#[must_use]
pub fn region_at(text: &str, offset: usize) -> Option<ScriptRegion> {
    find_regions(text).into_iter().find(|r| r.contains(offset))
}

/// Offset of the next `<name` at or after `from` whose name ends at a tag
/// boundary. Tag names compare ASCII case-insensitively.
fn find_tag(bytes: &[u8], from: usize, name: &[u8]) -> Option<usize> {
    memchr::memchr_iter(b'<', &bytes[from..])
        .map(|i| from + i)
        .find(|&lt| {
            let name_end = lt + 1 + name.len();
            bytes
                .get(lt + 1..name_end)
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
                && bytes
                    .get(name_end)
                    .is_some_and(|&b| b == b'>' || b == b'/' || b.is_ascii_whitespace())
        })
}
