use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};

/// Incremental bytes-to-text decoder for a streamed response body.
///
/// Multi-byte sequences split across chunk boundaries are held back until the
/// next chunk completes them. Malformed input is replaced with U+FFFD.
pub struct TextStreamDecoder {
    decoder: Decoder,
    encoding: &'static Encoding,
    had_errors: bool,
    finished: bool,
}

impl TextStreamDecoder {
    /// Decoder for the charset named in a `Content-Type` header, UTF-8 otherwise.
    /// A byte order mark at the start of the body takes precedence.
    pub fn for_content_type(content_type: Option<&str>) -> Self {
        let encoding = content_type
            .and_then(extract_charset)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        Self::new(encoding)
    }

    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder(),
            encoding,
            had_errors: false,
            finished: false,
        }
    }

    pub fn encoding_label(&self) -> &'static str {
        self.encoding.name()
    }

    /// True once any malformed sequence has been replaced.
    pub fn had_errors(&self) -> bool {
        self.had_errors
    }

    pub fn decode_chunk(&mut self, bytes: &[u8]) -> String {
        self.decode(bytes, false)
    }

    /// Flushes any held-back partial sequence. Later calls return nothing.
    pub fn finish(&mut self) -> String {
        self.decode(&[], true)
    }

    fn decode(&mut self, bytes: &[u8], last: bool) -> String {
        let mut out = String::new();
        if self.finished {
            return out;
        }
        let mut input = bytes;
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(input.len())
                .unwrap_or_else(|| input.len().saturating_mul(3).saturating_add(16));
            out.reserve(needed);
            let (result, read, had_errors) = self.decoder.decode_to_string(input, &mut out, last);
            self.had_errors |= had_errors;
            input = &input[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
        if last {
            self.finished = true;
        }
        out
    }
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            if name.trim().eq_ignore_ascii_case("charset") {
                Some(value.trim_matches([' ', '"', '\''].as_ref()))
            } else {
                None
            }
        })
        .next()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::{extract_charset, TextStreamDecoder};

    #[test]
    fn multibyte_sequence_split_across_chunks() {
        // "분석" is six bytes in UTF-8; split inside the first character.
        let bytes = "분석".as_bytes();
        let mut decoder = TextStreamDecoder::for_content_type(Some("text/event-stream"));
        let first = decoder.decode_chunk(&bytes[..2]);
        let second = decoder.decode_chunk(&bytes[2..4]);
        let third = decoder.decode_chunk(&bytes[4..]);
        assert_eq!(first, "");
        assert_eq!(format!("{first}{second}{third}"), "분석");
        assert_eq!(decoder.finish(), "");
        assert!(!decoder.had_errors());
    }

    #[test]
    fn truncated_sequence_is_replaced_on_finish() {
        let bytes = "é".as_bytes();
        let mut decoder = TextStreamDecoder::for_content_type(None);
        assert_eq!(decoder.decode_chunk(&bytes[..1]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert!(decoder.had_errors());
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn charset_from_content_type_is_honoured() {
        let mut decoder =
            TextStreamDecoder::for_content_type(Some("text/event-stream; Charset=\"EUC-KR\""));
        assert_eq!(decoder.encoding_label(), "EUC-KR");
        // "가" in EUC-KR.
        assert_eq!(decoder.decode_chunk(&[0xB0, 0xA1]), "가");
    }

    #[test]
    fn unknown_charset_falls_back_to_utf8() {
        let decoder = TextStreamDecoder::for_content_type(Some("text/plain; charset=bogus"));
        assert_eq!(decoder.encoding_label(), "UTF-8");
    }

    #[test]
    fn byte_order_mark_is_stripped() {
        let mut decoder = TextStreamDecoder::for_content_type(None);
        let text = decoder.decode_chunk(b"\xEF\xBB\xBFdata:x");
        assert_eq!(text, "data:x");
    }

    #[test]
    fn extract_charset_ignores_other_parameters() {
        assert_eq!(
            extract_charset("text/event-stream; boundary=x; charset=utf-8"),
            Some("utf-8".to_string())
        );
        assert_eq!(extract_charset("text/event-stream"), None);
    }
}
