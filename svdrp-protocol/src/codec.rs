//! Line framing, status-line decoding and reply aggregation.
//!
//! Every reply line looks like:
//! ```text
//! +------+--------+------------------------+
//! | Code | Marker |        Message         |
//! | 250  | '-'/' '|  text up to line end   |
//! +------+--------+------------------------+
//! | 3    | 1      |  rest of the line      |
//! ```
//! A `-` marker means more lines of the same reply follow.

use bytes::{Bytes, BytesMut};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::debug;

use crate::error::{Result, SvdrpError};
use crate::types::{Response, StatusLine};

/// Decode one reply line into a [`StatusLine`].
///
/// Trailing `\r`/`\n` are stripped first.
pub fn decode_status_line(line: &str) -> Result<StatusLine> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);

    let digits = line.as_bytes().get(..3);
    let code = match digits {
        Some(d) if d.iter().all(u8::is_ascii_digit) => {
            u16::from(d[0] - b'0') * 100 + u16::from(d[1] - b'0') * 10 + u16::from(d[2] - b'0')
        }
        _ => {
            return Err(SvdrpError::MalformedResponse(format!(
                "no status code in line {:?}",
                line
            )))
        }
    };

    // The first three bytes are ASCII, so index 3 is a char boundary.
    let mut rest = line[3..].chars();
    let is_continuation = rest.next() == Some('-');

    Ok(StatusLine {
        code,
        is_continuation,
        message: rest.as_str().to_string(),
    })
}

/// Turn an error status into the matching [`SvdrpError`].
pub fn check_status(status: StatusLine) -> Result<StatusLine> {
    match SvdrpError::from_status(status.code, &status.message) {
        Some(err) => Err(err),
        None => Ok(status),
    }
}

/// Collects continuation lines until the final line of a reply.
#[derive(Debug, Default)]
pub struct ResponseAggregator {
    lines: Vec<String>,
}

impl ResponseAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next decoded line.
    ///
    /// Returns the completed reply once a non-continuation line arrives. An
    /// error status discards everything collected so far.
    pub fn push(&mut self, status: StatusLine) -> Result<Option<Response>> {
        let status = match check_status(status) {
            Ok(s) => s,
            Err(e) => {
                self.lines.clear();
                return Err(e);
            }
        };

        self.lines.push(status.message);
        if status.is_continuation {
            return Ok(None);
        }

        Ok(Some(Response {
            code: status.code,
            lines: std::mem::take(&mut self.lines),
        }))
    }

    /// Number of lines collected for the reply in progress.
    pub fn pending(&self) -> usize {
        self.lines.len()
    }
}

/// Look up an encoding by its label, falling back to UTF-8.
pub fn lookup_encoding(label: &str) -> &'static Encoding {
    Encoding::for_label(label.trim().as_bytes()).unwrap_or_else(|| {
        debug!("Unknown encoding label {:?}, using UTF-8", label);
        UTF_8
    })
}

/// Decode raw line bytes with the session encoding.
///
/// EPG data broadcast by some providers is not valid in the announced
/// encoding; the charset of such lines is guessed from the bytes. If the
/// guess does not decode cleanly either, Windows-1252 is used, which maps
/// every byte.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> String {
    if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
        return text.into_owned();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, true);
    debug!(
        "Line is not valid {}, detected {}",
        encoding.name(),
        guess.name()
    );

    match guess.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => text.into_owned(),
        None => WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
    }
}

/// Split one complete line off the front of `buf`.
///
/// Returns `None` while no `\n` has been received yet.
pub fn decode_line(buf: &mut BytesMut, encoding: &'static Encoding) -> Option<String> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    let raw = buf.split_to(pos + 1);

    let mut end = raw.len() - 1;
    if end > 0 && raw[end - 1] == b'\r' {
        end -= 1;
    }
    Some(decode_text(&raw[..end], encoding))
}

/// Encode a command line for sending.
pub fn encode_command(command: &str, encoding: &'static Encoding) -> Bytes {
    let (encoded, _, _) = encoding.encode(command);
    let mut out = BytesMut::with_capacity(encoded.len() + 1);
    out.extend_from_slice(&encoded);
    out.extend_from_slice(b"\n");
    out.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerErrorKind;

    fn feed(lines: &[&str]) -> Result<Option<Response>> {
        let mut agg = ResponseAggregator::new();
        let mut last = None;
        for line in lines {
            last = agg.push(decode_status_line(line)?)?;
        }
        Ok(last)
    }

    #[test]
    fn test_decode_status_line() {
        let status = decode_status_line("250-1 Das Erste\r\n").unwrap();
        assert_eq!(status.code, 250);
        assert!(status.is_continuation);
        assert_eq!(status.message, "1 Das Erste");

        let status = decode_status_line("250 End of list").unwrap();
        assert!(!status.is_continuation);
        assert_eq!(status.message, "End of list");
    }

    #[test]
    fn test_decode_status_line_code_only() {
        let status = decode_status_line("354").unwrap();
        assert_eq!(status.code, 354);
        assert!(!status.is_continuation);
        assert_eq!(status.message, "");
    }

    #[test]
    fn test_decode_status_line_malformed() {
        for line in ["", "25", "abc hello", "2x0 nope", "+25 nope"] {
            assert!(
                matches!(decode_status_line(line), Err(SvdrpError::MalformedResponse(_))),
                "{:?}",
                line
            );
        }
    }

    #[test]
    fn test_list_terminates_on_final_line() {
        let response = feed(&["211-one", "211-two", "211 three"]).unwrap().unwrap();
        assert_eq!(response.code, 211);
        assert_eq!(response.lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_single_line_reply() {
        let response = feed(&["250 Channel \"1\" moved to \"5\""]).unwrap().unwrap();
        assert_eq!(response.code, 250);
        assert_eq!(response.lines.len(), 1);
    }

    #[test]
    fn test_error_inside_list_discards_partial() {
        let mut agg = ResponseAggregator::new();
        assert!(agg.push(decode_status_line("250-one").unwrap()).unwrap().is_none());
        assert_eq!(agg.pending(), 1);

        let err = agg
            .push(decode_status_line("550 Channel not found").unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            SvdrpError::Server {
                kind: ServerErrorKind::ActionNotTaken,
                code: 550,
                message: "Channel not found".to_string(),
            }
        );
        assert_eq!(agg.pending(), 0);
    }

    #[test]
    fn test_action_aborted_is_error() {
        let err = feed(&["451 Error while reading"]).unwrap_err();
        assert!(matches!(
            err,
            SvdrpError::Server { kind: ServerErrorKind::ActionAborted, code: 451, .. }
        ));
    }

    #[test]
    fn test_decode_line_framing() {
        let mut buf = BytesMut::from(&b"220 vdr\r\n250-a\n250 b"[..]);
        assert_eq!(decode_line(&mut buf, UTF_8).as_deref(), Some("220 vdr"));
        assert_eq!(decode_line(&mut buf, UTF_8).as_deref(), Some("250-a"));
        assert_eq!(decode_line(&mut buf, UTF_8), None);
        assert_eq!(&buf[..], b"250 b");
    }

    #[test]
    fn test_decode_invalid_utf8_falls_back() {
        let mut buf = BytesMut::from(&b"215-T Caf\xe9\n"[..]);
        let line = decode_line(&mut buf, UTF_8).unwrap();
        assert!(line.starts_with("215-T Caf"));
        assert_eq!(line.chars().count(), 10);
    }

    #[test]
    fn test_invalid_line_charset_is_detected() {
        let (latin1, _, _) = WINDOWS_1252
            .encode("D Die Familie Müller fährt über die Brücke nach Köln. Größere Straßen sind gesperrt.");
        assert!(std::str::from_utf8(&latin1).is_err());
        assert_eq!(
            decode_text(&latin1, UTF_8),
            "D Die Familie Müller fährt über die Brücke nach Köln. Größere Straßen sind gesperrt."
        );

        let (cyrillic, _, _) = encoding_rs::WINDOWS_1251
            .encode("T Новости дня: погода и спорт в прямом эфире, а также репортажи из регионов");
        assert_eq!(
            decode_text(&cyrillic, UTF_8),
            "T Новости дня: погода и спорт в прямом эфире, а также репортажи из регионов"
        );
    }

    #[test]
    fn test_declared_latin9() {
        let enc = lookup_encoding("ISO-8859-15");
        // 0xA4 is the euro sign in Latin-9
        assert_eq!(decode_text(b"\xa4", enc), "€");
        assert_eq!(&encode_command("T 5€", enc)[..], b"T 5\xa4\n");
    }

    #[test]
    fn test_unknown_encoding_label() {
        assert_eq!(lookup_encoding("no-such-charset"), UTF_8);
    }
}
