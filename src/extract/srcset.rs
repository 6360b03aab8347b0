use std::ops::Range;

/// Byte ranges of the URL part of every candidate in a `srcset` value
///
/// Candidates are separated by commas; each candidate is a URL followed by
/// optional descriptors (`2x`, `480w`). A URL may itself contain commas as
/// long as it is not followed by whitespace, so `w_100,h_100` style CDN paths
/// survive. Empty candidates are skipped.
pub fn srcset_candidates(value: &str) -> Vec<Range<usize>> {
    let bytes = value.as_bytes();
    let mut candidates = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut end = i;
        let ends_candidate = bytes[end - 1] == b',';
        while end > start && bytes[end - 1] == b',' {
            end -= 1;
        }
        if end > start {
            candidates.push(start..end);
        }

        if !ends_candidate {
            // descriptors
            while i < bytes.len() && bytes[i] != b',' {
                i += 1;
            }
        }
    }

    candidates
}
