//! Indentation-aware text builder for generated source.

const INDENT: &str = "    ";

#[derive(Debug, Default)]
pub struct CodeWriter {
    indent: usize,
    output: String,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// One line at the current indentation. Empty input writes a bare newline.
    pub fn line<S: AsRef<str>>(&mut self, text: S) -> &mut Self {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.output.push_str(INDENT);
            }
            self.output.push_str(text);
        }
        self.output.push('\n');
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.output.push('\n');
        self
    }

    /// Several lines, each re-indented.
    pub fn lines<S: AsRef<str>>(&mut self, text: S) -> &mut Self {
        for line in text.as_ref().lines() {
            self.line(line);
        }
        self
    }

    /// `header {`, the body one level deeper, then the closing `}` (plus
    /// `trailer`, e.g. `;` or `,`).
    pub fn block_with<H: AsRef<str>>(
        &mut self,
        header: H,
        trailer: &str,
        body: impl FnOnce(&mut CodeWriter),
    ) -> &mut Self {
        self.line(format!("{} {{", header.as_ref()));
        self.indent += 1;
        body(self);
        self.indent -= 1;
        self.line(format!("}}{}", trailer))
    }

    pub fn block<H: AsRef<str>>(&mut self, header: H, body: impl FnOnce(&mut CodeWriter)) -> &mut Self {
        self.block_with(header, "", body)
    }

    pub fn finish(self) -> String {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_blocks() {
        let mut w = CodeWriter::new();
        w.block("impl A", |w| {
            w.block("fn f()", |w| {
                w.line("x();");
            });
            w.blank();
            w.block_with("match y", ";", |w| {
                w.line("_ => {}");
            });
        });
        assert_eq!(
            w.finish(),
            "impl A {\n    fn f() {\n        x();\n    }\n\n    match y {\n        _ => {}\n    };\n}\n"
        );
    }

    #[test]
    fn lines_reindent() {
        let mut w = CodeWriter::new();
        w.block("mod m", |w| {
            w.lines("a\n\nb");
        });
        assert_eq!(w.finish(), "mod m {\n    a\n\n    b\n}\n");
    }
}
