use crate::error::DecodeError;

/// Longest line accepted before ingestion gives up (64 KiB).
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Incremental newline splitter for a stream's raw byte chunks.
///
/// Chunks may break lines anywhere; bytes are held until a `\n` arrives.
/// A trailing `\r` is dropped and invalid UTF-8 is replaced lossily.
/// Bytes without a newline are never published.
#[derive(Debug)]
pub struct LineDecoder {
    pending: Vec<u8>,
    // Start of the first unconsumed line in `pending`.
    read: usize,
    // Bytes before this offset are known to hold no `\n`.
    scanned: usize,
    max_line_bytes: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl LineDecoder {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            read: 0,
            scanned: 0,
            max_line_bytes,
        }
    }

    /// Queue a chunk of raw bytes for decoding.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.read > 0 {
            self.pending.drain(..self.read);
            self.scanned -= self.read;
            self.read = 0;
        }
        self.pending.extend_from_slice(chunk);
    }

    /// Pop the next complete line, if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::LineTooLong`] when a line (terminated or not)
    /// grows past the configured limit.
    pub fn next_line(&mut self) -> Result<Option<String>, DecodeError> {
        let newline = self.pending[self.scanned..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| self.scanned + offset);

        let Some(pos) = newline else {
            self.scanned = self.pending.len();
            if self.pending.len() - self.read > self.max_line_bytes {
                return Err(self.too_long());
            }
            return Ok(None);
        };

        let mut line = &self.pending[self.read..pos];
        if let [rest @ .., b'\r'] = line {
            line = rest;
        }
        if line.len() > self.max_line_bytes {
            return Err(self.too_long());
        }

        let text = String::from_utf8_lossy(line).into_owned();
        self.read = pos + 1;
        self.scanned = self.read;
        Ok(Some(text))
    }

    /// Bytes buffered for the current unterminated line.
    pub fn pending_len(&self) -> usize {
        self.pending.len() - self.read
    }

    fn too_long(&self) -> DecodeError {
        DecodeError::LineTooLong {
            max: self.max_line_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(decoder: &mut LineDecoder) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = decoder.next_line().unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn joins_lines_split_across_chunks() {
        let mut decoder = LineDecoder::default();
        decoder.push(b"hel");
        assert!(drain(&mut decoder).is_empty());
        decoder.push(b"lo\nwor");
        assert_eq!(drain(&mut decoder), vec!["hello"]);
        decoder.push(b"ld\n");
        assert_eq!(drain(&mut decoder), vec!["world"]);
    }

    #[test]
    fn strips_carriage_returns() {
        let mut decoder = LineDecoder::default();
        decoder.push(b"one\r\ntwo\r\n");
        assert_eq!(drain(&mut decoder), vec!["one", "two"]);
    }

    #[test]
    fn keeps_empty_lines() {
        // Filtering blank lines is the history's job, not the decoder's.
        let mut decoder = LineDecoder::default();
        decoder.push(b"a\n\nb\n");
        assert_eq!(drain(&mut decoder), vec!["a", "", "b"]);
    }

    #[test]
    fn replaces_invalid_utf8() {
        let mut decoder = LineDecoder::default();
        decoder.push(b"bad \xff byte\n");
        assert_eq!(drain(&mut decoder), vec!["bad \u{fffd} byte"]);
    }

    #[test]
    fn unterminated_line_too_long() {
        let mut decoder = LineDecoder::new(8);
        decoder.push(b"0123456789");
        assert_eq!(
            decoder.next_line(),
            Err(DecodeError::LineTooLong { max: 8 })
        );
    }

    #[test]
    fn terminated_line_too_long() {
        let mut decoder = LineDecoder::new(4);
        decoder.push(b"ok\ntoo long\n");
        assert_eq!(decoder.next_line(), Ok(Some("ok".to_string())));
        assert_eq!(
            decoder.next_line(),
            Err(DecodeError::LineTooLong { max: 4 })
        );
    }

    #[test]
    fn holds_unterminated_tail() {
        let mut decoder = LineDecoder::default();
        decoder.push(b"done\ntail\r");
        assert_eq!(drain(&mut decoder), vec!["done"]);
        assert_eq!(decoder.pending_len(), 5);

        decoder.push(b"\n");
        assert_eq!(drain(&mut decoder), vec!["tail"]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn line_grown_over_many_pushes() {
        let mut decoder = LineDecoder::new(1024);
        for _ in 0..100 {
            decoder.push(b"ab");
            assert_eq!(decoder.next_line(), Ok(None));
        }
        decoder.push(b"\nnext");
        assert_eq!(drain(&mut decoder), vec!["ab".repeat(100)]);
        assert_eq!(decoder.pending_len(), 4);
    }

    #[test]
    fn large_chunk_decodes_in_linear_time() {
        let lines = 400_000;
        let mut chunk = Vec::with_capacity(lines * 12);
        for i in 0..lines {
            chunk.extend_from_slice(format!("line {:06}\n", i).as_bytes());
        }

        let started = std::time::Instant::now();
        let mut decoder = LineDecoder::default();
        decoder.push(&chunk);
        let decoded = drain(&mut decoder);

        assert_eq!(decoded.len(), lines);
        assert_eq!(decoded[lines - 1], "line 399999");
        assert!(
            started.elapsed() < std::time::Duration::from_secs(5),
            "decoding took {:?}",
            started.elapsed()
        );
    }
}
