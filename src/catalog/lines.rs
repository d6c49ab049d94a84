//! Line recovery: rebuild rows whose text was split by an embedded line break.

/// What the assembler made of the physical lines seen so far.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assembled {
    /// A row with exactly the header's field count. `line` is where it started.
    Row {
        fields: Vec<String>,
        line: usize,
        recovered: bool,
    },
    /// A single physical line with more fields than the header.
    Overlong { fields: Vec<String>, line: usize },
    /// A short fragment that could not be completed.
    Abandoned { line: usize, text: String },
    /// Whitespace-only line outside a pending fragment.
    Blank { line: usize },
}

fn field_count(s: &str) -> usize {
    s.split('\t').count()
}

fn split_fields(s: &str) -> Vec<String> {
    s.split('\t').map(|v| v.trim().to_string()).collect()
}

/// Feeds physical lines, yields rows. A short line is held and joined (with one space, where
/// the break was) to the following lines until the count matches; if a join would overshoot,
/// the held fragment is abandoned and the new line is considered on its own.
pub struct LineAssembler {
    width: usize,
    pending: Option<(String, usize)>,
}

impl LineAssembler {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            pending: None,
        }
    }

    pub fn push(&mut self, line_no: usize, line: &str) -> Vec<Assembled> {
        let line = line.trim_end_matches('\r');
        let mut out = Vec::new();

        if let Some((held, start)) = self.pending.take() {
            let joined = format!("{held} {line}");
            let n = field_count(&joined);
            if n == self.width {
                out.push(Assembled::Row {
                    fields: split_fields(&joined),
                    line: start,
                    recovered: true,
                });
                return out;
            }
            if n < self.width {
                self.pending = Some((joined, start));
                return out;
            }
            out.push(Assembled::Abandoned {
                line: start,
                text: held,
            });
        }

        if line.trim().is_empty() {
            out.push(Assembled::Blank { line: line_no });
            return out;
        }
        let n = field_count(line);
        if n == self.width {
            out.push(Assembled::Row {
                fields: split_fields(line),
                line: line_no,
                recovered: false,
            });
        } else if n < self.width {
            self.pending = Some((line.to_string(), line_no));
        } else {
            out.push(Assembled::Overlong {
                fields: split_fields(line),
                line: line_no,
            });
        }
        out
    }

    /// End of input: a held fragment can no longer be completed.
    pub fn finish(&mut self) -> Option<Assembled> {
        self.pending
            .take()
            .map(|(text, line)| Assembled::Abandoned { line, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_line_is_joined_with_a_space() {
        let mut a = LineAssembler::new(3);
        assert!(a.push(2, "a\tfirst half").is_empty());
        let out = a.push(3, "second half\tc");
        assert_eq!(
            out,
            vec![Assembled::Row {
                fields: vec!["a".into(), "first half second half".into(), "c".into()],
                line: 2,
                recovered: true,
            }]
        );
        assert!(a.finish().is_none());
    }

    #[test]
    fn test_overshoot_abandons_fragment_and_keeps_new_line() {
        let mut a = LineAssembler::new(3);
        assert!(a.push(2, "a\tb").is_empty());
        let out = a.push(3, "x\ty\tz");
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Assembled::Abandoned { line: 2, .. }));
        assert!(matches!(out[1], Assembled::Row { line: 3, recovered: false, .. }));
    }

    #[test]
    fn test_empty_fields_are_kept() {
        let mut a = LineAssembler::new(4);
        let out = a.push(2, "a\t\t\td");
        assert_eq!(
            out,
            vec![Assembled::Row {
                fields: vec!["a".into(), "".into(), "".into(), "d".into()],
                line: 2,
                recovered: false,
            }]
        );
    }

    #[test]
    fn test_fragment_at_eof_is_abandoned() {
        let mut a = LineAssembler::new(3);
        a.push(2, "only\tpart");
        assert_eq!(
            a.finish(),
            Some(Assembled::Abandoned {
                line: 2,
                text: "only\tpart".into()
            })
        );
    }
}
